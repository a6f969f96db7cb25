#![forbid(unsafe_code)]

//! Command-line support: dump adapters and logging setup.

/// Dump readers and the import driver.
pub mod import;

/// Tracing subscriber installation.
pub mod logging;
