use serde::{Deserialize, Serialize};

use crate::types::{Result, WikiGraphError};

/// Default number of nodes per compressed block.
pub const DEFAULT_BLOCK_SIZE: u32 = 64;

/// What the converter does with a link whose target title is not a known page.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedTargets {
    /// Drop the link and count it.
    #[default]
    Skip,
    /// Abort the conversion with a resolution error.
    Fail,
    /// Register the target as a new node without outgoing links.
    Insert,
}

/// Configuration options supplied to [`super::convert`].
#[derive(Clone, Debug)]
pub struct ConvertOptions {
    /// Nodes per compressed block.
    pub block_size: u32,
    /// Policy for unresolved link targets.
    pub unresolved: UnresolvedTargets,
    /// Whether every block is decoded and compared after encoding.
    pub verify_blocks: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            unresolved: UnresolvedTargets::Skip,
            verify_blocks: false,
        }
    }
}

impl ConvertOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of nodes per block.
    pub fn block_size(mut self, nodes: u32) -> Self {
        self.block_size = nodes;
        self
    }

    /// Fails on unresolved targets when `strict`, skips them otherwise.
    pub fn strict_resolution(mut self, strict: bool) -> Self {
        self.unresolved = if strict {
            UnresolvedTargets::Fail
        } else {
            UnresolvedTargets::Skip
        };
        self
    }

    /// Sets the unresolved-target policy.
    pub fn unresolved(mut self, policy: UnresolvedTargets) -> Self {
        self.unresolved = policy;
        self
    }

    /// Enables or disables post-encode block verification.
    pub fn verify_blocks(mut self, enabled: bool) -> Self {
        self.verify_blocks = enabled;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(WikiGraphError::Invalid("block size must be at least 1"));
        }
        Ok(())
    }
}
