//! Compressed, memory-mapped storage for wiki link graphs.
//!
//! [`convert`] turns a stream of `(title, links)` records into a compact
//! graph file plus a title side file; [`GraphReader`] maps the graph file
//! and answers neighbor and title queries by decompressing one block at a
//! time.

#![warn(missing_docs)]

pub mod admin;
pub mod cli;
pub mod primitives;
pub mod storage;
pub mod types;

pub use storage::{
    convert, ConvertOptions, ConvertSummary, GraphReader, LinkRecord, UnresolvedTargets,
    DEFAULT_BLOCK_SIZE,
};
pub use types::{NodeId, Result, WikiGraphError};
