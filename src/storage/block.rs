//! Edge blocks.
//!
//! A block holds the adjacency lists of a contiguous node range. Each node
//! contributes `varint(count)` followed by `count` delta varints; the
//! concatenation is compressed as one unit and stored as
//! `u32 compressed_len | compressed bytes`.

use std::io::{self, Write};

use crate::primitives::bytes::{delta, var, CodecError};
use crate::primitives::compress;
use crate::types::{NodeId, Result, WikiGraphError};

/// Length of the size prefix in front of every block.
pub const BLOCK_PREFIX_LEN: usize = 4;

/// Accumulates per-node streams for one block.
#[derive(Debug)]
pub struct BlockBuilder {
    first_node: NodeId,
    nodes: u32,
    edges: u64,
    payload: Vec<u8>,
}

impl BlockBuilder {
    /// Starts a block whose first node is `first_node`.
    pub fn new(first_node: NodeId) -> Self {
        Self {
            first_node,
            nodes: 0,
            edges: 0,
            payload: Vec::new(),
        }
    }

    /// Appends the next node's ascending neighbor list.
    pub fn push(&mut self, neighbors: &[u32]) -> std::result::Result<(), CodecError> {
        let mark = self.payload.len();
        var::encode_u64(neighbors.len() as u64, &mut self.payload);
        if let Err(err) = delta::encode_deltas_into(neighbors, &mut self.payload) {
            self.payload.truncate(mark);
            return Err(err);
        }
        self.nodes += 1;
        self.edges += neighbors.len() as u64;
        Ok(())
    }

    /// Number of nodes pushed so far.
    pub fn nodes(&self) -> u32 {
        self.nodes
    }

    /// Returns true when no node has been pushed.
    pub fn is_empty(&self) -> bool {
        self.nodes == 0
    }

    /// Compresses the accumulated payload.
    pub fn finish(self) -> io::Result<EncodedBlock> {
        let compressed = compress::compress(&self.payload)?;
        Ok(EncodedBlock {
            first_node: self.first_node,
            nodes: self.nodes,
            edges: self.edges,
            raw_len: self.payload.len(),
            compressed,
        })
    }
}

/// A compressed block ready to be written.
#[derive(Debug)]
pub struct EncodedBlock {
    /// First node in the block.
    pub first_node: NodeId,
    /// Number of nodes in the block.
    pub nodes: u32,
    /// Number of edges across all nodes in the block.
    pub edges: u64,
    /// Uncompressed payload length.
    pub raw_len: usize,
    /// Compressed payload.
    pub compressed: Vec<u8>,
}

impl EncodedBlock {
    /// Writes the size prefix and payload, returning the bytes written.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<u64> {
        let len = u32::try_from(self.compressed.len())
            .map_err(|_| WikiGraphError::Invalid("compressed block exceeds u32::MAX bytes"))?;
        out.write_all(&len.to_le_bytes())?;
        out.write_all(&self.compressed)?;
        Ok((BLOCK_PREFIX_LEN + self.compressed.len()) as u64)
    }
}

/// Returns the compressed bytes of the block at `offset`, borrowed from
/// `data`. The block must end at or before `block_end`.
pub fn compressed_slice(data: &[u8], offset: u64, block_end: u64) -> Result<&[u8]> {
    let start = usize::try_from(offset)
        .map_err(|_| WikiGraphError::corruption(offset, "offset exceeds address space"))?;
    let limit = usize::try_from(block_end.min(data.len() as u64))
        .map_err(|_| WikiGraphError::corruption(offset, "block region exceeds address space"))?;
    let body = start + BLOCK_PREFIX_LEN;
    let prefix = data
        .get(start..body)
        .filter(|_| body <= limit)
        .ok_or_else(|| WikiGraphError::corruption(offset, "size prefix overruns block region"))?;
    let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
    let end = body
        .checked_add(len)
        .filter(|&end| end <= limit)
        .ok_or_else(|| {
            WikiGraphError::corruption(offset, format!("compressed length {len} overruns block region"))
        })?;
    Ok(&data[body..end])
}

/// Decodes the neighbors of the node at position `local` within a
/// decompressed block payload.
///
/// Earlier nodes are skipped by reading their counts and stepping over their
/// varints without summing them.
pub fn decode_node(payload: &[u8], local: u32) -> std::result::Result<Vec<u32>, CodecError> {
    let mut off = 0;
    for _ in 0..local {
        let count = var::decode_u64(payload, &mut off)?;
        skip_count(payload, &mut off, count)?;
    }
    let count = var::decode_u64(payload, &mut off)?;
    let count = usize::try_from(count).map_err(|_| CodecError::ValueRange(count))?;
    // Each delta takes at least one byte.
    let mut out = Vec::with_capacity(count.min(payload.len().saturating_sub(off)));
    delta::decode_deltas_into(payload, &mut off, count, &mut out)?;
    Ok(out)
}

/// Decodes every node stream in a payload expected to hold `nodes` nodes,
/// calling `visit(local, neighbors)` for each. Fails if the payload holds
/// fewer streams or has bytes left over.
pub fn for_each_node<F>(
    payload: &[u8],
    nodes: u32,
    mut visit: F,
) -> std::result::Result<(), CodecError>
where
    F: FnMut(u32, &[u32]),
{
    let mut off = 0;
    let mut scratch = Vec::new();
    for local in 0..nodes {
        let count = var::decode_u64(payload, &mut off)?;
        let count = usize::try_from(count).map_err(|_| CodecError::ValueRange(count))?;
        scratch.clear();
        delta::decode_deltas_into(payload, &mut off, count, &mut scratch)?;
        visit(local, &scratch);
    }
    if off != payload.len() {
        return Err(CodecError::TrailingBytes(payload.len() - off));
    }
    Ok(())
}

fn skip_count(payload: &[u8], off: &mut usize, count: u64) -> std::result::Result<(), CodecError> {
    let count = usize::try_from(count).map_err(|_| CodecError::ValueRange(count))?;
    // A count larger than the remaining bytes cannot be satisfied.
    if count > payload.len().saturating_sub(*off) {
        return Err(CodecError::Truncated(payload.len().saturating_sub(*off)));
    }
    delta::skip_deltas(payload, off, count)
}
