#![forbid(unsafe_code)]
//! Whole-block compression.
//!
//! Blocks are stored as zlib streams (DEFLATE plus an Adler-32 trailer). A
//! payload only decodes if the stream ends exactly at the end of the input and
//! the checksum matches, so a damaged block fails here instead of decoding
//! into garbage.

use std::io::{self, Write};

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

/// Compresses a block payload.
pub fn compress(raw: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(raw.len() / 2 + 16),
        Compression::default(),
    );
    encoder.write_all(raw)?;
    encoder.finish()
}

/// Decompresses a block payload, pre-sizing the output with `size_hint`.
pub fn decompress(compressed: &[u8], size_hint: usize) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size_hint);
    decompress_into(compressed, &mut out)?;
    Ok(out)
}

/// Decompresses into a caller-owned buffer, replacing its contents.
pub fn decompress_into(compressed: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
    out.clear();
    let mut inflater = Decompress::new(true);
    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(64));
        }
        let consumed = inflater.total_in() as usize;
        let produced = out.len();
        let status = inflater
            .decompress_vec(&compressed[consumed..], out, FlushDecompress::Finish)
            .map_err(|err| invalid(err.to_string()))?;
        if status == Status::StreamEnd {
            break;
        }
        let stalled = inflater.total_in() as usize == consumed && out.len() == produced;
        let input_done = inflater.total_in() as usize == compressed.len();
        if stalled || (input_done && out.len() < out.capacity()) {
            return Err(invalid("compressed stream is truncated"));
        }
    }
    let trailing = compressed.len() - inflater.total_in() as usize;
    if trailing != 0 {
        return Err(invalid(format!("{trailing} bytes after end of compressed stream")));
    }
    Ok(())
}

fn invalid(reason: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.into())
}
