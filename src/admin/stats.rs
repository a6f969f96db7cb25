use std::path::Path;

use serde::Serialize;

use crate::storage::header::FOOTER_LEN;
use crate::storage::GraphReader;
use crate::types::Result;

/// File layout summary. Built from block size prefixes only.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    /// Graph file path.
    pub path: String,
    /// Graph file size.
    pub file_bytes: u64,
    /// Number of nodes.
    pub node_count: u32,
    /// Number of blocks.
    pub block_count: u64,
    /// Offset of the index section.
    pub index_offset: u64,
    /// Size of the index section.
    pub index_bytes: u64,
    /// Sum of compressed block sizes (excluding size prefixes).
    pub compressed_bytes: u64,
    /// Smallest compressed block.
    pub min_block_bytes: u64,
    /// Largest compressed block.
    pub max_block_bytes: u64,
    /// Largest number of nodes in a block.
    pub max_block_nodes: u32,
    /// Entries in the title map.
    pub titles: u64,
}

/// Opens the store and summarizes its layout.
pub fn stats(graph_path: impl AsRef<Path>, map_path: impl AsRef<Path>) -> Result<StatsReport> {
    let reader = GraphReader::open(graph_path, map_path)?;
    stats_reader(&reader)
}

/// Summarizes an already opened store.
pub fn stats_reader(reader: &GraphReader) -> Result<StatsReport> {
    let mut compressed_bytes = 0u64;
    let mut min_block_bytes = u64::MAX;
    let mut max_block_bytes = 0u64;
    let mut max_block_nodes = 0u32;
    for span in reader.index().spans() {
        let len = reader.compressed_block(&span)?.len() as u64;
        compressed_bytes += len;
        min_block_bytes = min_block_bytes.min(len);
        max_block_bytes = max_block_bytes.max(len);
        max_block_nodes = max_block_nodes.max(span.node_count());
    }
    if reader.block_count() == 0 {
        min_block_bytes = 0;
    }
    let file_bytes = reader.file_len();
    Ok(StatsReport {
        path: reader.path().display().to_string(),
        file_bytes,
        node_count: reader.node_count(),
        block_count: reader.block_count() as u64,
        index_offset: reader.index_offset(),
        index_bytes: file_bytes - FOOTER_LEN as u64 - reader.index_offset(),
        compressed_bytes,
        min_block_bytes,
        max_block_bytes,
        max_block_nodes,
        titles: reader.titles().len() as u64,
    })
}
