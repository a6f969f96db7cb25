#![forbid(unsafe_code)]

//! Maintenance utilities for converted graphs.
//!
//! Verification walks every block looking for damage; statistics summarize
//! the file layout without decompressing anything.

mod stats;
mod verify;

/// Layout statistics.
pub use stats::{stats, stats_reader, StatsReport};

/// Integrity verification.
pub use verify::{
    verify, verify_reader, VerifyCounts, VerifyFinding, VerifyLevel, VerifyReport, VerifySeverity,
};
