//! On-disk graph format: encoder, reader, and their building blocks.
//!
//! A graph file is a fixed header, a run of compressed edge blocks, a block
//! index, and a footer pointing at the index. Node titles live in a separate
//! tab-separated side file.

/// Edge block payloads.
pub mod block;

/// File header and footer.
pub mod header;

/// Block index and its binary-search lookup.
pub mod index;

/// Title side-table.
pub mod titles;

mod options;
mod reader;
mod writer;

/// Encoder configuration.
pub use options::{ConvertOptions, UnresolvedTargets, DEFAULT_BLOCK_SIZE};

/// Query handle over a converted graph.
pub use reader::GraphReader;

/// Encoder entry point and its input/output types.
pub use writer::{convert, ConvertSummary, LinkRecord};
