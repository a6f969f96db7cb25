//! Title side-table: `node_id<TAB>title` per line, UTF-8, newline terminated.
//!
//! Loaded into two owned maps built from the same lines; nothing in the
//! loader relies on the file being sorted.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::types::{NodeId, Result, WikiGraphError};

/// Bidirectional node id / title lookup.
#[derive(Debug, Default)]
pub struct TitleMap {
    titles: Vec<String>,
    ids: FxHashMap<String, NodeId>,
}

impl TitleMap {
    /// Loads the map file for a store with `node_count` nodes.
    pub fn load(path: impl AsRef<Path>, node_count: u32) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::parse(BufReader::new(file), node_count)
    }

    /// Parses map lines. Every id in `[0, node_count)` must appear exactly
    /// once and titles must be unique.
    ///
    /// Nothing is sized from `node_count` up front: it comes from the graph
    /// header and is only trusted once the map has as many entries.
    pub fn parse<R: BufRead>(reader: R, node_count: u32) -> Result<Self> {
        let mut by_id: FxHashMap<u32, String> = FxHashMap::default();
        let mut ids = FxHashMap::default();
        for (idx, line) in reader.lines().enumerate() {
            let lineno = idx + 1;
            let line = line.map_err(|err| match err.kind() {
                io::ErrorKind::InvalidData => {
                    WikiGraphError::Format(format!("title map line {lineno} is not UTF-8"))
                }
                _ => WikiGraphError::Io(err),
            })?;
            if line.is_empty() {
                continue;
            }
            let (raw_id, title) = line.split_once('\t').ok_or_else(|| {
                WikiGraphError::Format(format!("title map line {lineno} has no tab"))
            })?;
            let id: u32 = raw_id.parse().map_err(|_| {
                WikiGraphError::Format(format!("title map line {lineno} has bad id {raw_id:?}"))
            })?;
            if id >= node_count {
                return Err(WikiGraphError::Format(format!(
                    "title map line {lineno}: id {id} beyond node count {node_count}"
                )));
            }
            if by_id.contains_key(&id) {
                return Err(WikiGraphError::Format(format!(
                    "title map line {lineno}: duplicate id {id}"
                )));
            }
            if ids.insert(title.to_owned(), NodeId(id)).is_some() {
                return Err(WikiGraphError::Format(format!(
                    "title map line {lineno}: duplicate title {title:?}"
                )));
            }
            by_id.insert(id, title.to_owned());
        }
        // Ids are distinct and below node_count, so equal counts mean full coverage.
        if by_id.len() as u64 != u64::from(node_count) {
            return Err(WikiGraphError::Format(format!(
                "title map has {} entries but the graph declares {node_count} nodes",
                by_id.len()
            )));
        }
        let titles = (0..node_count)
            .map(|id| {
                by_id.remove(&id).ok_or_else(|| {
                    WikiGraphError::Format(format!("title map has no entry for node {id}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { titles, ids })
    }

    /// Title of `node`, if known.
    pub fn title(&self, node: NodeId) -> Option<&str> {
        self.titles.get(node.index()).map(String::as_str)
    }

    /// Node id of `title`, if known.
    pub fn resolve(&self, title: &str) -> Option<NodeId> {
        self.ids.get(title).copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    /// Returns true if the map holds no titles.
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// Writes `titles` in id order, returning the bytes written.
pub fn write_title_map<W: Write>(out: &mut W, titles: &[String]) -> io::Result<u64> {
    let mut written = 0u64;
    for (id, title) in titles.iter().enumerate() {
        let line = format!("{id}\t{title}\n");
        out.write_all(line.as_bytes())?;
        written += line.len() as u64;
    }
    Ok(written)
}
