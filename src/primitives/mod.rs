//! Low-level primitives for building the storage engine.
//!
//! Includes byte codecs, block compression, and file plumbing.

/// Varint and delta codecs plus a little-endian cursor.
pub mod bytes;

/// Per-block compression.
pub mod compress;

/// Staged output files and read-only memory maps.
pub mod io;
