use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{Result, WikiGraphError};

/// Installs a stderr `tracing` subscriber filtered by `level`
/// (any `EnvFilter` directive, e.g. `info` or `wikigraph=debug`).
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level).map_err(|_| WikiGraphError::Invalid("invalid log filter"))?,
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| WikiGraphError::Invalid("logging already initialized"))
}
