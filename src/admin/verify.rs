use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::storage::block;
use crate::storage::index::BlockSpan;
use crate::storage::GraphReader;
use crate::types::Result;

const MAX_FINDINGS: usize = 32;

/// Specifies the depth of verification checks to perform.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyLevel {
    /// Header, footer, index, and title map only (what `open` validates).
    Fast,
    /// Additionally decompresses and decodes every block.
    Full,
}

/// Indicates the severity level of a verification finding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifySeverity {
    /// Informational message about the verification process.
    Info,
    /// Damage that makes part of the graph unreadable.
    Error,
}

/// Represents a single issue discovered during verification.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyFinding {
    /// The severity level of this finding.
    pub severity: VerifySeverity,
    /// Human-readable description of the issue.
    pub message: String,
}

/// Statistics collected during the verification process.
#[derive(Clone, Debug, Default, Serialize)]
pub struct VerifyCounts {
    /// Blocks examined.
    pub blocks_checked: u64,
    /// Blocks that failed to decode or held invalid lists.
    pub corrupt_blocks: u64,
    /// Node streams decoded.
    pub nodes_decoded: u64,
    /// Neighbor ids decoded.
    pub edges_decoded: u64,
    /// Entries in the title map.
    pub titles: u64,
}

/// Complete report of a verification operation.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyReport {
    /// The verification level that was performed.
    pub level: VerifyLevel,
    /// Whether verification passed without finding any errors.
    pub success: bool,
    /// Issues discovered, capped at 32 entries.
    pub findings: Vec<VerifyFinding>,
    /// Statistics about the data examined.
    pub counts: VerifyCounts,
}

/// Opens the store and verifies it.
///
/// Structural problems that prevent opening are returned as errors; damage
/// inside individual blocks is reported as findings.
pub fn verify(
    graph_path: impl AsRef<Path>,
    map_path: impl AsRef<Path>,
    level: VerifyLevel,
) -> Result<VerifyReport> {
    let reader = GraphReader::open(graph_path, map_path)?;
    Ok(verify_reader(&reader, level))
}

/// Verifies an already opened store.
pub fn verify_reader(reader: &GraphReader, level: VerifyLevel) -> VerifyReport {
    let mut findings = Vec::new();
    let mut counts = VerifyCounts {
        titles: reader.titles().len() as u64,
        ..VerifyCounts::default()
    };
    let mut errors = 0u64;

    if level == VerifyLevel::Full {
        for span in reader.index().spans() {
            counts.blocks_checked += 1;
            if let Err(message) = check_block(reader, &span, &mut counts) {
                counts.corrupt_blocks += 1;
                errors += 1;
                warn!(offset = span.offset, %message, "admin.verify.corrupt_block");
                push_finding(&mut findings, VerifySeverity::Error, message);
            }
        }
    }
    if findings.len() == MAX_FINDINGS && errors > MAX_FINDINGS as u64 {
        findings.push(VerifyFinding {
            severity: VerifySeverity::Info,
            message: format!("{} further findings omitted", errors - MAX_FINDINGS as u64),
        });
    }

    info!(
        path = %reader.path().display(),
        level = ?level,
        blocks = counts.blocks_checked,
        corrupt = counts.corrupt_blocks,
        edges = counts.edges_decoded,
        "admin.verify.completed"
    );
    VerifyReport {
        level,
        success: errors == 0,
        findings,
        counts,
    }
}

fn check_block(
    reader: &GraphReader,
    span: &BlockSpan,
    counts: &mut VerifyCounts,
) -> std::result::Result<(), String> {
    let payload = reader.block_payload(span).map_err(|err| err.to_string())?;
    let node_count = reader.node_count();
    let mut problem = None;
    let mut nodes = 0u64;
    let mut edges = 0u64;
    block::for_each_node(&payload, span.node_count(), |local, ids| {
        nodes += 1;
        edges += ids.len() as u64;
        if problem.is_some() {
            return;
        }
        let node = span.first_node.0 + local;
        if ids.windows(2).any(|pair| pair[0] >= pair[1]) {
            problem = Some(format!("node {node}: neighbors not strictly ascending"));
        } else if let Some(&bad) = ids.iter().find(|&&id| id >= node_count) {
            problem = Some(format!("node {node}: neighbor {bad} beyond node count"));
        }
    })
    .map_err(|err| format!("block at offset {}: {err}", span.offset))?;
    counts.nodes_decoded += nodes;
    counts.edges_decoded += edges;
    match problem {
        Some(message) => Err(format!("block at offset {}: {message}", span.offset)),
        None => Ok(()),
    }
}

fn push_finding(findings: &mut Vec<VerifyFinding>, severity: VerifySeverity, message: String) {
    if findings.len() < MAX_FINDINGS {
        findings.push(VerifyFinding { severity, message });
    }
}
