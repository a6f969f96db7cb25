#![forbid(unsafe_code)]
//! Identifiers and the error type shared by every layer of the store.

use std::fmt;

use serde::Serialize;

/// Dense node identifier in `[0, node_count)`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the identifier as a slice index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        NodeId(value)
    }
}

impl From<NodeId> for u32 {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

/// Errors surfaced by the encoder, the reader, and the admin tooling.
#[derive(thiserror::Error, Debug)]
pub enum WikiGraphError {
    /// Underlying file system failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not a valid graph store (bad magic, version, header, footer or index).
    #[error("invalid graph store: {0}")]
    Format(String),
    /// A block that passed open-time validation failed to decode.
    #[error("corrupt block at offset {offset}: {reason}")]
    Corruption {
        /// File offset of the damaged block.
        offset: u64,
        /// What went wrong while decoding it.
        reason: String,
    },
    /// Node identifier outside `[0, node_count)`.
    #[error("node {node} out of range (node count {node_count})")]
    OutOfRange {
        /// The rejected identifier as supplied by the caller.
        node: i64,
        /// Number of nodes in the store.
        node_count: u32,
    },
    /// A link target could not be resolved while converting in strict mode.
    #[error("unresolved link target {target:?} from {source_title:?}")]
    Resolution {
        /// Title of the page holding the link.
        source_title: String,
        /// Title the link points at.
        target: String,
    },
    /// Title lookup miss.
    #[error("unknown title {0:?}")]
    UnknownTitle(String),
    /// An input record that the converter skips and tallies.
    #[error("malformed input record at line {line}: {reason}")]
    MalformedRecord {
        /// 1-based line number in the input stream.
        line: u64,
        /// Why the record was rejected.
        reason: String,
    },
    /// Invalid argument supplied by the caller.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}

impl WikiGraphError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        WikiGraphError::Format(reason.into())
    }

    pub(crate) fn corruption(offset: u64, reason: impl fmt::Display) -> Self {
        WikiGraphError::Corruption {
            offset,
            reason: reason.to_string(),
        }
    }

    /// Returns true for errors scoped to a single block, after which the
    /// reader remains usable.
    pub fn is_corruption(&self) -> bool {
        matches!(self, WikiGraphError::Corruption { .. })
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, WikiGraphError>;
