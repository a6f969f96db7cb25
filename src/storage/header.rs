//! Fixed-size file header and trailing footer.
//!
//! ```text
//! 0..8    magic  "WLINKNET"
//! 8..12   version      u32 LE
//! 12..16  node count   u32 LE
//! ...     edge blocks, index
//! EOF-8   index offset u64 LE
//! ```

use crate::primitives::bytes::buf::Cursor;
use crate::types::{Result, WikiGraphError};

/// Format identifier at offset 0.
pub const MAGIC: &[u8; 8] = b"WLINKNET";
/// The only format version this crate reads and writes.
pub const FORMAT_VERSION: u32 = 1;
/// Header length; the first block starts here.
pub const HEADER_LEN: usize = 16;
/// Footer length.
pub const FOOTER_LEN: usize = 8;

/// Parsed file header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FileHeader {
    /// Format version.
    pub version: u32,
    /// Number of distinct nodes.
    pub node_count: u32,
}

impl FileHeader {
    /// Creates a header for the current format version.
    pub fn new(node_count: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            node_count,
        }
    }

    /// Serializes the header.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[..8].copy_from_slice(MAGIC);
        buf[8..12].copy_from_slice(&self.version.to_le_bytes());
        buf[12..16].copy_from_slice(&self.node_count.to_le_bytes());
        buf
    }

    /// Parses and validates the header at the start of `data`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(data);
        let magic = cur
            .take(MAGIC.len())
            .ok_or_else(|| WikiGraphError::format("file shorter than header"))?;
        if magic != MAGIC {
            return Err(WikiGraphError::format("bad magic"));
        }
        let version = cur
            .read_u32_le()
            .ok_or_else(|| WikiGraphError::format("header truncated at version"))?;
        if version != FORMAT_VERSION {
            return Err(WikiGraphError::Format(format!(
                "unsupported format version {version}"
            )));
        }
        let node_count = cur
            .read_u32_le()
            .ok_or_else(|| WikiGraphError::format("header truncated at node count"))?;
        Ok(Self {
            version,
            node_count,
        })
    }
}

/// Serializes the footer.
pub fn encode_footer(index_offset: u64) -> [u8; FOOTER_LEN] {
    index_offset.to_le_bytes()
}

/// Reads the index offset from the last [`FOOTER_LEN`] bytes of `data`.
pub fn decode_footer(data: &[u8]) -> Result<u64> {
    let start = data
        .len()
        .checked_sub(FOOTER_LEN)
        .ok_or_else(|| WikiGraphError::format("file shorter than footer"))?;
    Cursor::new(&data[start..])
        .read_u64_le()
        .ok_or_else(|| WikiGraphError::format("footer truncated"))
}
