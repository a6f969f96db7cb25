#![forbid(unsafe_code)]
//! Varint, delta, and little-endian cursor utilities shared by the block and
//! index layers.

use thiserror::Error;

/// Decode failure inside a varint or delta stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum CodecError {
    /// The stream ended in the middle of a varint.
    #[error("varint truncated at byte {0}")]
    Truncated(usize),
    /// A varint carried more than 64 bits of payload.
    #[error("varint exceeds 64 bits")]
    Overflow,
    /// A decoded node id does not fit in 32 bits.
    #[error("decoded value {0} exceeds u32 range")]
    ValueRange(u64),
    /// Input to the delta encoder was not sorted ascending.
    #[error("sequence is not ascending at position {0}")]
    NotAscending(usize),
    /// Bytes remained after the expected number of deltas.
    #[error("{0} trailing bytes after expected deltas")]
    TrailingBytes(usize),
}

pub mod var {
    //! Unsigned base-128 varints, low-order group first.

    use super::CodecError;

    const MAX_VARINT_LEN: usize = 10;

    /// Encodes a u64 as an unsigned varint.
    pub fn encode_u64(mut v: u64, out: &mut Vec<u8>) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    /// Number of bytes [`encode_u64`] emits for `v`.
    pub fn encoded_len(v: u64) -> usize {
        let bits = 64 - v.leading_zeros() as usize;
        bits.max(1).div_ceil(7)
    }

    /// Decodes a u64 varint from `src` starting at `*off`, advancing the offset.
    pub fn decode_u64(src: &[u8], off: &mut usize) -> Result<u64, CodecError> {
        let mut result = 0u64;
        let mut shift = 0u32;
        for i in 0..MAX_VARINT_LEN {
            let byte = *src.get(*off).ok_or(CodecError::Truncated(i))?;
            *off += 1;
            let payload = u64::from(byte & 0x7f);
            if i == MAX_VARINT_LEN - 1 && payload > 1 {
                return Err(CodecError::Overflow);
            }
            result |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        Err(CodecError::Overflow)
    }

    /// Decodes a varint that must fit in 32 bits.
    pub fn decode_u32(src: &[u8], off: &mut usize) -> Result<u32, CodecError> {
        let value = decode_u64(src, off)?;
        u32::try_from(value).map_err(|_| CodecError::ValueRange(value))
    }

    /// Advances past one varint without assembling its value.
    pub fn skip(src: &[u8], off: &mut usize) -> Result<(), CodecError> {
        let rest = src.get(*off..).unwrap_or_default();
        match rest.iter().take(MAX_VARINT_LEN).position(|b| b & 0x80 == 0) {
            Some(pos) => {
                *off += pos + 1;
                Ok(())
            }
            None if rest.len() < MAX_VARINT_LEN => Err(CodecError::Truncated(rest.len())),
            None => Err(CodecError::Overflow),
        }
    }
}

pub mod delta {
    //! Ascending integer sequences stored as varint gaps.
    //!
    //! The first value is written as its distance from zero, each later value
    //! as its distance from the previous one.

    use super::{var, CodecError};

    /// Appends the delta encoding of `values` to `out`.
    ///
    /// `values` must be non-decreasing; an empty slice writes nothing.
    pub fn encode_deltas_into(values: &[u32], out: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut prev = 0u32;
        for (pos, &value) in values.iter().enumerate() {
            let gap = value
                .checked_sub(prev)
                .ok_or(CodecError::NotAscending(pos))?;
            var::encode_u64(u64::from(gap), out);
            prev = value;
        }
        Ok(())
    }

    /// Returns the delta encoding of `values`.
    pub fn encode_deltas(values: &[u32]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(values.len());
        encode_deltas_into(values, &mut out)?;
        Ok(out)
    }

    /// Decodes exactly `count` deltas from `src` and requires that they span
    /// the whole slice.
    pub fn decode_deltas(src: &[u8], count: usize) -> Result<Vec<u32>, CodecError> {
        let mut off = 0;
        // Each delta takes at least one byte.
        let mut out = Vec::with_capacity(count.min(src.len()));
        decode_deltas_into(src, &mut off, count, &mut out)?;
        if off != src.len() {
            return Err(CodecError::TrailingBytes(src.len() - off));
        }
        Ok(out)
    }

    /// Decodes `count` deltas starting at `*off`, pushing absolute values into `out`.
    pub fn decode_deltas_into(
        src: &[u8],
        off: &mut usize,
        count: usize,
        out: &mut Vec<u32>,
    ) -> Result<(), CodecError> {
        let mut acc = 0u64;
        for _ in 0..count {
            let gap = var::decode_u64(src, off)?;
            acc = acc.checked_add(gap).ok_or(CodecError::ValueRange(gap))?;
            let value = u32::try_from(acc).map_err(|_| CodecError::ValueRange(acc))?;
            out.push(value);
        }
        Ok(())
    }

    /// Advances past `count` deltas without decoding them.
    pub fn skip_deltas(src: &[u8], off: &mut usize, count: usize) -> Result<(), CodecError> {
        for _ in 0..count {
            var::skip(src, off)?;
        }
        Ok(())
    }
}

pub mod buf {
    //! A slice-backed cursor for parsing fixed-width little-endian fields.

    use core::fmt;

    /// A cursor for reading bytes from a slice with offset tracking.
    pub struct Cursor<'a> {
        /// The underlying byte slice.
        pub buf: &'a [u8],
        /// Current read offset.
        pub off: usize,
    }

    impl<'a> Cursor<'a> {
        /// Creates a new cursor starting at offset 0.
        pub fn new(buf: &'a [u8]) -> Self {
            Self { buf, off: 0 }
        }

        /// Takes the next `n` bytes, or `None` if fewer remain.
        pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
            let end = self.off.checked_add(n)?;
            let slice = self.buf.get(self.off..end)?;
            self.off = end;
            Some(slice)
        }

        /// Takes a fixed-size array.
        pub fn take_array<const N: usize>(&mut self) -> Option<[u8; N]> {
            self.take(N).and_then(|bytes| bytes.try_into().ok())
        }

        /// Reads a little-endian u32.
        pub fn read_u32_le(&mut self) -> Option<u32> {
            self.take_array().map(u32::from_le_bytes)
        }

        /// Reads a little-endian u64.
        pub fn read_u64_le(&mut self) -> Option<u64> {
            self.take_array().map(u64::from_le_bytes)
        }

        /// Returns the number of bytes remaining in the buffer.
        pub fn remaining(&self) -> usize {
            self.buf.len().saturating_sub(self.off)
        }
    }

    impl<'a> fmt::Debug for Cursor<'a> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Cursor")
                .field("off", &self.off)
                .field("remaining", &self.remaining())
                .finish()
        }
    }
}
