//! Graph encoder.
//!
//! Consumes `(title, [target titles])` records, assigns dense node ids, and
//! writes the graph file and the title map. Both files are staged under
//! temporary names and only renamed into place once both are complete.

use std::io::{BufWriter, Write};
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::primitives::compress;
use crate::primitives::io::{commit_all, StagedFile};
use crate::storage::block::{self, BlockBuilder, EncodedBlock};
use crate::storage::header::{encode_footer, FileHeader, HEADER_LEN};
use crate::storage::index::IndexEntry;
use crate::storage::options::{ConvertOptions, UnresolvedTargets};
use crate::storage::titles::write_title_map;
use crate::types::{NodeId, Result, WikiGraphError};

/// One page and the titles it links to.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LinkRecord {
    /// Title of the linking page.
    pub title: String,
    /// Titles of the linked pages, in any order.
    pub targets: Vec<String>,
}

impl LinkRecord {
    /// Creates a record from anything string-like.
    pub fn new<T, I, S>(title: T, targets: I) -> Self
    where
        T: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Counters reported by [`convert`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ConvertSummary {
    /// Distinct nodes written.
    pub node_count: u32,
    /// Blocks written.
    pub block_count: u64,
    /// Edges written after de-duplication.
    pub edge_count: u64,
    /// Records accepted from the input.
    pub records_read: u64,
    /// Records skipped as malformed.
    pub malformed_records: u64,
    /// Records whose title had already been seen as a source and were merged.
    pub merged_records: u64,
    /// Links dropped because their target was unknown.
    pub unresolved_links: u64,
    /// Target titles registered as new nodes.
    pub inserted_targets: u64,
    /// Links dropped because the target title was empty or multi-line.
    pub invalid_links: u64,
    /// Repeated links removed from adjacency lists.
    pub duplicate_links: u64,
    /// Links from a page to itself (kept).
    pub self_loops: u64,
    /// Size of the graph file.
    pub graph_bytes: u64,
    /// Size of the title map file.
    pub map_bytes: u64,
}

/// Converts `input` into a graph file at `graph_path` and a title map at
/// `map_path`.
///
/// Items that are `Err(WikiGraphError::MalformedRecord { .. })` are counted
/// and skipped; any other error aborts the conversion. On failure neither
/// output path is touched.
pub fn convert<I>(
    input: I,
    graph_path: impl AsRef<Path>,
    map_path: impl AsRef<Path>,
    options: &ConvertOptions,
) -> Result<ConvertSummary>
where
    I: IntoIterator<Item = Result<LinkRecord>>,
{
    options.validate()?;
    let graph_path = graph_path.as_ref();
    let map_path = map_path.as_ref();
    if graph_path == map_path {
        return Err(WikiGraphError::Invalid(
            "graph and title map paths must differ",
        ));
    }
    let mut summary = ConvertSummary::default();

    let (nodes, pending) = collect_records(input, options.unresolved, &mut summary)?;
    let adjacency = resolve_links(&nodes, pending, options.unresolved, &mut summary)?;
    summary.node_count = nodes.len_u32();

    let mut graph_file = StagedFile::create(graph_path)?;
    let (graph_bytes, blocks) = {
        let mut out = BufWriter::new(graph_file.file_mut());
        let result = write_graph(&mut out, &adjacency, options)?;
        out.flush()?;
        result
    };
    summary.graph_bytes = graph_bytes;
    summary.block_count = blocks;

    let mut map_file = StagedFile::create(map_path)?;
    {
        let mut out = BufWriter::new(map_file.file_mut());
        summary.map_bytes = write_title_map(&mut out, &nodes.titles)?;
        out.flush()?;
    }

    commit_all(vec![graph_file, map_file])?;

    info!(
        graph = %graph_path.display(),
        map = %map_path.display(),
        nodes = summary.node_count,
        blocks = summary.block_count,
        edges = summary.edge_count,
        malformed = summary.malformed_records,
        unresolved = summary.unresolved_links,
        graph_bytes = summary.graph_bytes,
        "convert.completed"
    );
    Ok(summary)
}

/// Dense title interner: ids are handed out in first-seen order.
#[derive(Default)]
struct NodeTable {
    ids: FxHashMap<String, NodeId>,
    titles: Vec<String>,
    // Whether the title has been seen as a record's own title.
    is_source: Vec<bool>,
}

impl NodeTable {
    fn intern(&mut self, title: &str) -> Result<(NodeId, bool)> {
        if let Some(&id) = self.ids.get(title) {
            return Ok((id, false));
        }
        let id = u32::try_from(self.titles.len())
            .map_err(|_| WikiGraphError::Invalid("more than u32::MAX distinct titles"))?;
        self.ids.insert(title.to_owned(), NodeId(id));
        self.titles.push(title.to_owned());
        self.is_source.push(false);
        Ok((NodeId(id), true))
    }

    /// Marks `node` as a source, returning false if it already was one.
    fn mark_source(&mut self, node: NodeId) -> bool {
        !std::mem::replace(&mut self.is_source[node.index()], true)
    }

    fn get(&self, title: &str) -> Option<NodeId> {
        self.ids.get(title).copied()
    }

    fn len_u32(&self) -> u32 {
        // intern() never hands out more than u32::MAX ids.
        self.titles.len() as u32
    }
}

struct PendingRecord {
    node: NodeId,
    targets: Vec<String>,
}

fn valid_title(title: &str) -> bool {
    !title.is_empty() && !title.contains(|c| c == '\n' || c == '\r')
}

/// First pass: ids for every source title (and, when inserting, for targets
/// in the order they are read).
fn collect_records<I>(
    input: I,
    policy: UnresolvedTargets,
    summary: &mut ConvertSummary,
) -> Result<(NodeTable, Vec<PendingRecord>)>
where
    I: IntoIterator<Item = Result<LinkRecord>>,
{
    let mut nodes = NodeTable::default();
    let mut pending = Vec::new();
    for (idx, item) in input.into_iter().enumerate() {
        let record = match item {
            Ok(record) => record,
            Err(WikiGraphError::MalformedRecord { line, reason }) => {
                warn!(line, %reason, "convert.malformed_record");
                summary.malformed_records += 1;
                continue;
            }
            Err(err) => return Err(err),
        };
        if !valid_title(&record.title) {
            warn!(
                record = idx + 1,
                title = %record.title.escape_debug(),
                "convert.malformed_record.bad_title"
            );
            summary.malformed_records += 1;
            continue;
        }
        summary.records_read += 1;
        let (node, _) = nodes.intern(&record.title)?;
        if !nodes.mark_source(node) {
            summary.merged_records += 1;
        }
        let mut targets = Vec::with_capacity(record.targets.len());
        for target in record.targets {
            if !valid_title(&target) {
                summary.invalid_links += 1;
                continue;
            }
            if policy == UnresolvedTargets::Insert {
                nodes.intern(&target)?;
            }
            targets.push(target);
        }
        pending.push(PendingRecord { node, targets });
    }
    Ok((nodes, pending))
}

/// Second pass: titles to ids, then sorted, de-duplicated lists.
fn resolve_links(
    nodes: &NodeTable,
    pending: Vec<PendingRecord>,
    policy: UnresolvedTargets,
    summary: &mut ConvertSummary,
) -> Result<Vec<Vec<u32>>> {
    let mut adjacency: Vec<Vec<u32>> = vec![Vec::new(); nodes.titles.len()];
    for record in pending {
        let list = &mut adjacency[record.node.index()];
        for target in record.targets {
            match nodes.get(&target) {
                Some(id) => list.push(id.0),
                None => match policy {
                    UnresolvedTargets::Fail => {
                        return Err(WikiGraphError::Resolution {
                            source_title: nodes.titles[record.node.index()].clone(),
                            target,
                        })
                    }
                    UnresolvedTargets::Skip | UnresolvedTargets::Insert => {
                        debug!(source = record.node.0, %target, "convert.unresolved_link");
                        summary.unresolved_links += 1;
                    }
                },
            }
        }
    }
    summary.inserted_targets = nodes.is_source.iter().filter(|&&source| !source).count() as u64;
    for (id, list) in adjacency.iter_mut().enumerate() {
        list.sort_unstable();
        let before = list.len();
        list.dedup();
        summary.duplicate_links += (before - list.len()) as u64;
        if list.binary_search(&(id as u32)).is_ok() {
            summary.self_loops += 1;
        }
        summary.edge_count += list.len() as u64;
    }
    Ok(adjacency)
}

/// Writes header, blocks, index, and footer. Returns `(bytes, blocks)`.
fn write_graph<W: Write>(
    out: &mut W,
    adjacency: &[Vec<u32>],
    options: &ConvertOptions,
) -> Result<(u64, u64)> {
    let node_count = u32::try_from(adjacency.len())
        .map_err(|_| WikiGraphError::Invalid("more than u32::MAX nodes"))?;
    out.write_all(&FileHeader::new(node_count).encode())?;
    let mut offset = HEADER_LEN as u64;
    let mut index = Vec::with_capacity(adjacency.len().div_ceil(options.block_size as usize));

    let mut next_node = 0u32;
    for chunk in adjacency.chunks(options.block_size as usize) {
        let first_node = NodeId(next_node);
        next_node += chunk.len() as u32;
        let mut builder = BlockBuilder::new(first_node);
        for list in chunk {
            builder
                .push(list)
                .map_err(|err| WikiGraphError::corruption(offset, err))?;
        }
        let encoded = builder.finish()?;
        if options.verify_blocks {
            verify_encoded(&encoded, chunk, offset)?;
        }
        debug!(
            first_node = first_node.0,
            nodes = encoded.nodes,
            edges = encoded.edges,
            raw_len = encoded.raw_len,
            compressed_len = encoded.compressed.len(),
            offset,
            "convert.block"
        );
        index.push(IndexEntry { first_node, offset });
        offset += encoded.write_to(out)?;
    }

    let index_offset = offset;
    for entry in &index {
        let bytes = entry.encode();
        out.write_all(&bytes)?;
        offset += bytes.len() as u64;
    }
    let footer = encode_footer(index_offset);
    out.write_all(&footer)?;
    offset += footer.len() as u64;
    Ok((offset, index.len() as u64))
}

/// Decodes a freshly encoded block and compares it against its source lists.
fn verify_encoded(encoded: &EncodedBlock, lists: &[Vec<u32>], offset: u64) -> Result<()> {
    let raw = compress::decompress(&encoded.compressed, encoded.raw_len)
        .map_err(|err| WikiGraphError::corruption(offset, err))?;
    let mut mismatch = None;
    block::for_each_node(&raw, encoded.nodes, |local, ids| {
        if mismatch.is_none() && lists[local as usize] != ids {
            mismatch = Some(local);
        }
    })
    .map_err(|err| WikiGraphError::corruption(offset, err))?;
    match mismatch {
        Some(local) => Err(WikiGraphError::corruption(
            offset,
            format!(
                "round-trip mismatch for node {}",
                encoded.first_node.0 + local
            ),
        )),
        None => Ok(()),
    }
}
