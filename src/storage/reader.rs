//! Graph reader.
//!
//! Opens the graph file through a read-only memory map, validates the header,
//! footer, and index once, and answers neighbor queries by decompressing the
//! owning block into a per-call buffer. Nothing is mutated after `open`, so a
//! single reader can be shared between threads.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::{debug, info};

use crate::primitives::compress;
use crate::primitives::io::map_readonly;
use crate::storage::block;
use crate::storage::header::{decode_footer, FileHeader, FOOTER_LEN, HEADER_LEN};
use crate::storage::index::{BlockIndex, BlockSpan};
use crate::storage::titles::TitleMap;
use crate::types::{NodeId, Result, WikiGraphError};

/// Decompressed blocks are rarely smaller than this multiple of their
/// compressed size.
const DECOMPRESS_HINT_FACTOR: usize = 3;

/// Read-only handle on a converted graph and its title map.
#[derive(Debug)]
pub struct GraphReader {
    path: PathBuf,
    map: Mmap,
    header: FileHeader,
    index_offset: u64,
    index: BlockIndex,
    titles: TitleMap,
}

impl GraphReader {
    /// Opens `graph_path` and loads `map_path`.
    ///
    /// Fails without returning a partial reader if either file is missing or
    /// the graph file does not validate.
    pub fn open(graph_path: impl AsRef<Path>, map_path: impl AsRef<Path>) -> Result<Self> {
        let path = graph_path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        if len < (HEADER_LEN + FOOTER_LEN) as u64 {
            return Err(WikiGraphError::Format(format!(
                "file of {len} bytes is shorter than header and footer"
            )));
        }
        let map = map_readonly(&file)?;
        let header = FileHeader::decode(&map)?;
        let index_offset = decode_footer(&map)?;
        let index_end = map.len() as u64 - FOOTER_LEN as u64;
        if index_offset < HEADER_LEN as u64 || index_offset > index_end {
            return Err(WikiGraphError::Format(format!(
                "index offset {index_offset} outside [{HEADER_LEN}, {index_end}]"
            )));
        }
        let index = BlockIndex::decode(
            &map[index_offset as usize..index_end as usize],
            header.node_count,
            index_offset,
        )?;
        let titles = TitleMap::load(map_path.as_ref(), header.node_count)?;
        info!(
            path = %path.display(),
            nodes = header.node_count,
            blocks = index.len(),
            bytes = len,
            "reader.open"
        );
        Ok(Self {
            path,
            map,
            header,
            index_offset,
            index,
            titles,
        })
    }

    /// Validates a caller-supplied integer as a node id.
    pub fn node(&self, raw: i64) -> Result<NodeId> {
        u32::try_from(raw)
            .ok()
            .filter(|&id| id < self.header.node_count)
            .map(NodeId)
            .ok_or(WikiGraphError::OutOfRange {
                node: raw,
                node_count: self.header.node_count,
            })
    }

    /// Returns the ascending neighbor ids of `node`.
    pub fn get_neighbors(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let span = self.index.find_block(node)?;
        let payload = self.block_payload(&span)?;
        let ids = block::decode_node(&payload, node.0 - span.first_node.0)
            .map_err(|err| WikiGraphError::corruption(span.offset, err))?;
        debug!(
            node = node.0,
            block = span.ordinal,
            neighbors = ids.len(),
            "reader.neighbors"
        );
        Ok(ids.into_iter().map(NodeId).collect())
    }

    /// Returns the title of `node`.
    pub fn get_title(&self, node: NodeId) -> Result<&str> {
        if node.0 >= self.header.node_count {
            return Err(WikiGraphError::OutOfRange {
                node: i64::from(node.0),
                node_count: self.header.node_count,
            });
        }
        self.titles
            .title(node)
            .ok_or_else(|| WikiGraphError::Format(format!("no title for node {node}")))
    }

    /// Returns the node id of `title`.
    pub fn resolve_title(&self, title: &str) -> Result<NodeId> {
        self.titles
            .resolve(title)
            .ok_or_else(|| WikiGraphError::UnknownTitle(title.to_owned()))
    }

    /// Decompresses the block described by `span`.
    pub fn block_payload(&self, span: &BlockSpan) -> Result<Vec<u8>> {
        let compressed = self.compressed_block(span)?;
        compress::decompress(compressed, compressed.len() * DECOMPRESS_HINT_FACTOR)
            .map_err(|err| WikiGraphError::corruption(span.offset, err))
    }

    /// Borrows the compressed bytes of a block straight from the map.
    pub fn compressed_block(&self, span: &BlockSpan) -> Result<&[u8]> {
        block::compressed_slice(&self.map, span.offset, self.index_offset)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> u32 {
        self.header.node_count
    }

    /// Number of blocks.
    pub fn block_count(&self) -> usize {
        self.index.len()
    }

    /// The materialized block index.
    pub fn index(&self) -> &BlockIndex {
        &self.index
    }

    /// Offset of the index section.
    pub fn index_offset(&self) -> u64 {
        self.index_offset
    }

    /// The loaded title map.
    pub fn titles(&self) -> &TitleMap {
        &self.titles
    }

    /// Size of the graph file in bytes.
    pub fn file_len(&self) -> u64 {
        self.map.len() as u64
    }

    /// Path of the graph file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the mapping and the in-memory tables.
    pub fn close(self) {
        debug!(path = %self.path.display(), "reader.close");
    }
}
