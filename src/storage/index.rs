//! Block index: one `(first_node_id, file_offset)` entry per block, sorted by
//! first node id.
//!
//! Lookup finds the greatest entry whose first node id is `<=` the query. The
//! answer is a candidate block; the caller still walks the block to reach the
//! node because per-node streams inside a block are variable length.

use std::ops::Range;

use crate::primitives::bytes::buf::Cursor;
use crate::storage::header::HEADER_LEN;
use crate::types::{NodeId, Result, WikiGraphError};

/// Encoded size of one [`IndexEntry`]: u32 node id + u64 offset.
pub const INDEX_ENTRY_LEN: usize = 12;

/// One block's index record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IndexEntry {
    /// First node stored in the block.
    pub first_node: NodeId,
    /// File offset of the block's size prefix.
    pub offset: u64,
}

impl IndexEntry {
    /// Serializes the entry.
    pub fn encode(&self) -> [u8; INDEX_ENTRY_LEN] {
        let mut buf = [0u8; INDEX_ENTRY_LEN];
        buf[..4].copy_from_slice(&self.first_node.0.to_le_bytes());
        buf[4..].copy_from_slice(&self.offset.to_le_bytes());
        buf
    }
}

/// A resolved block: its position in the index, node range, and offset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BlockSpan {
    /// Position of the block in the index.
    pub ordinal: usize,
    /// First node id in the block.
    pub first_node: NodeId,
    /// One past the last node id in the block.
    pub end_node: NodeId,
    /// File offset of the block's size prefix.
    pub offset: u64,
}

impl BlockSpan {
    /// Number of nodes stored in the block.
    pub fn node_count(&self) -> u32 {
        self.end_node.0 - self.first_node.0
    }

    /// Node id range covered by the block.
    pub fn nodes(&self) -> Range<u32> {
        self.first_node.0..self.end_node.0
    }
}

/// The materialized index.
#[derive(Clone, Debug)]
pub struct BlockIndex {
    entries: Vec<IndexEntry>,
    node_count: u32,
}

impl BlockIndex {
    /// Builds an index from entries, checking ordering and bounds.
    ///
    /// `block_end` is the offset where the block region stops (the index
    /// offset); every block must start before it.
    pub fn new(entries: Vec<IndexEntry>, node_count: u32, block_end: u64) -> Result<Self> {
        match entries.first() {
            None if node_count > 0 => {
                return Err(WikiGraphError::Format(format!(
                    "index is empty but header declares {node_count} nodes"
                )))
            }
            Some(_) if node_count == 0 => {
                return Err(WikiGraphError::format(
                    "index has entries but header declares no nodes",
                ))
            }
            Some(first) if first.first_node.0 != 0 => {
                return Err(WikiGraphError::format("first block does not start at node 0"))
            }
            _ => {}
        }
        for pair in entries.windows(2) {
            if pair[1].first_node <= pair[0].first_node {
                return Err(WikiGraphError::Format(format!(
                    "index node ids not strictly ascending at node {}",
                    pair[1].first_node
                )));
            }
            if pair[1].offset <= pair[0].offset {
                return Err(WikiGraphError::Format(format!(
                    "index offsets not strictly ascending at offset {}",
                    pair[1].offset
                )));
            }
        }
        for entry in &entries {
            if entry.first_node.0 >= node_count {
                return Err(WikiGraphError::Format(format!(
                    "index entry names node {} beyond node count {node_count}",
                    entry.first_node
                )));
            }
            if entry.offset < HEADER_LEN as u64 || entry.offset >= block_end {
                return Err(WikiGraphError::Format(format!(
                    "block offset {} outside block region",
                    entry.offset
                )));
            }
        }
        Ok(Self {
            entries,
            node_count,
        })
    }

    /// Parses the index section `bytes`.
    pub fn decode(bytes: &[u8], node_count: u32, block_end: u64) -> Result<Self> {
        if bytes.len() % INDEX_ENTRY_LEN != 0 {
            return Err(WikiGraphError::Format(format!(
                "index section of {} bytes is not a whole number of entries",
                bytes.len()
            )));
        }
        let mut cur = Cursor::new(bytes);
        let mut entries = Vec::with_capacity(bytes.len() / INDEX_ENTRY_LEN);
        while cur.remaining() > 0 {
            let first_node = cur
                .read_u32_le()
                .ok_or_else(|| WikiGraphError::format("index entry truncated"))?;
            let offset = cur
                .read_u64_le()
                .ok_or_else(|| WikiGraphError::format("index entry truncated"))?;
            entries.push(IndexEntry {
                first_node: NodeId(first_node),
                offset,
            });
        }
        Self::new(entries, node_count, block_end)
    }

    /// Finds the block that holds `node`.
    pub fn find_block(&self, node: NodeId) -> Result<BlockSpan> {
        let out_of_range = || WikiGraphError::OutOfRange {
            node: i64::from(node.0),
            node_count: self.node_count,
        };
        if node.0 >= self.node_count {
            return Err(out_of_range());
        }
        let pos = self.entries.partition_point(|entry| entry.first_node <= node);
        if pos == 0 {
            return Err(out_of_range());
        }
        Ok(self.span(pos - 1))
    }

    /// Span of the block at `ordinal`.
    ///
    /// # Panics
    /// Panics if `ordinal >= self.len()`.
    pub fn span(&self, ordinal: usize) -> BlockSpan {
        let entry = self.entries[ordinal];
        let end_node = self
            .entries
            .get(ordinal + 1)
            .map_or(NodeId(self.node_count), |next| next.first_node);
        BlockSpan {
            ordinal,
            first_node: entry.first_node,
            end_node,
            offset: entry.offset,
        }
    }

    /// Iterates over every block span in order.
    pub fn spans(&self) -> impl Iterator<Item = BlockSpan> + '_ {
        (0..self.entries.len()).map(|ordinal| self.span(ordinal))
    }

    /// The raw entries.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the store holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Node count the index was validated against.
    pub fn node_count(&self) -> u32 {
        self.node_count
    }
}
