//! Big-endian byte cursors used by every codec.
//!
//! `OfpReader` walks a borrowed buffer and can carve length-bounded sub-readers
//! for nested structures; offsets in errors are always absolute within the
//! buffer the outermost reader was created over. `OfpWriter` appends to an
//! owned buffer and supports backfilling 16-bit length fields once the size of
//! a structure is known.

use std::io::{BufRead, Cursor};

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};

use crate::bits::pad_len;
use crate::error::{CodecError, Result};

/// Read side of the codec: a bounded, big-endian view over received bytes.
#[derive(Debug, Clone)]
pub struct OfpReader<'a> {
    bytes: Cursor<&'a [u8]>,
    base: usize,
    strict_padding: bool,
}

impl<'a> OfpReader<'a> {
    /// Create a reader over `buf`, positioned at its first byte.
    pub fn new(buf: &'a [u8]) -> OfpReader<'a> {
        OfpReader {
            bytes: Cursor::new(buf),
            base: 0,
            strict_padding: false,
        }
    }

    /// Require skipped padding bytes to be zero.
    pub fn strict_padding(mut self, strict: bool) -> OfpReader<'a> {
        self.strict_padding = strict;
        self
    }

    /// Bytes consumed so far by this reader.
    pub fn position(&self) -> usize {
        self.bytes.position() as usize
    }

    /// Absolute offset of the next byte within the outermost buffer.
    pub fn offset(&self) -> usize {
        self.base + self.position()
    }

    /// Bytes left before the end of this reader's window.
    pub fn remaining(&self) -> usize {
        self.bytes.get_ref().len().saturating_sub(self.position())
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(&self, needed: usize) -> CodecError {
        CodecError::TruncatedInput {
            offset: self.offset(),
            needed,
            remaining: self.remaining(),
        }
    }

    fn require(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            Err(self.truncated(needed))
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.require(1)?;
        self.bytes.read_u8().map_err(|_| self.truncated(1))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.require(2)?;
        self.bytes.read_u16::<BigEndian>().map_err(|_| self.truncated(2))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.require(4)?;
        self.bytes.read_u32::<BigEndian>().map_err(|_| self.truncated(4))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.require(8)?;
        self.bytes.read_u64::<BigEndian>().map_err(|_| self.truncated(8))
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.require(n)?;
        let start = self.position();
        let buf: &'a [u8] = *self.bytes.get_ref();
        self.bytes.consume(n);
        Ok(&buf[start..start + n])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut arr = [0; N];
        arr.copy_from_slice(self.read_bytes(N)?);
        Ok(arr)
    }

    /// Read a fixed-width, NUL-padded string field.
    ///
    /// The value is every byte before the first NUL, spaces included. Bytes
    /// that are not UTF-8 fail with `InvalidValue` carrying the first bad byte.
    pub fn read_fixed_string(&mut self, structure: &'static str, n: usize) -> Result<String> {
        let raw = self.read_bytes(n)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        std::str::from_utf8(&raw[..end])
            .map(str::to_owned)
            .map_err(|e| CodecError::InvalidValue {
                structure,
                value: u64::from(raw[e.valid_up_to()]),
            })
    }

    /// Look at a big-endian `u16` `offset` bytes ahead without consuming anything.
    pub fn peek_u16_at(&self, offset: usize) -> Result<u16> {
        self.require(offset + 2)?;
        let start = self.position() + offset;
        Ok(BigEndian::read_u16(&self.bytes.get_ref()[start..start + 2]))
    }

    /// Look at a big-endian `u32` `offset` bytes ahead without consuming anything.
    pub fn peek_u32_at(&self, offset: usize) -> Result<u32> {
        self.require(offset + 4)?;
        let start = self.position() + offset;
        Ok(BigEndian::read_u32(&self.bytes.get_ref()[start..start + 4]))
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.require(n)?;
        self.bytes.consume(n);
        Ok(())
    }

    /// Skip `n` reserved bytes, checking they are zero when padding is strict.
    pub fn skip_padding(&mut self, n: usize) -> Result<()> {
        let offset = self.offset();
        let pad = self.read_bytes(n)?;
        if self.strict_padding {
            if let Some(i) = pad.iter().position(|&b| b != 0) {
                return Err(CodecError::InvalidPadding { offset: offset + i });
            }
        }
        Ok(())
    }

    /// Skip the padding that rounds a structure of `len` bytes up to the alignment unit.
    pub fn skip_alignment(&mut self, len: usize) -> Result<()> {
        self.skip_padding(pad_len(len))
    }

    /// Carve the next `n` bytes into their own reader and advance past them.
    ///
    /// The child reports offsets relative to the same outermost buffer.
    pub fn sub_reader(&mut self, n: usize) -> Result<OfpReader<'a>> {
        let base = self.offset();
        let window = self.read_bytes(n)?;
        Ok(OfpReader {
            bytes: Cursor::new(window),
            base,
            strict_padding: self.strict_padding,
        })
    }

    /// Fail unless every byte of this reader's window has been consumed.
    pub fn finish(&self, structure: &'static str) -> Result<()> {
        if self.remaining() != 0 {
            return Err(CodecError::LengthMismatch {
                structure,
                declared: self.position() + self.remaining(),
                actual: self.position(),
            });
        }
        Ok(())
    }
}

/// Write side of the codec: an owned, growable big-endian buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfpWriter {
    bytes: Vec<u8>,
}

impl OfpWriter {
    pub fn new() -> OfpWriter {
        OfpWriter { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> OfpWriter {
        OfpWriter {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        let mut buf = [0; 2];
        BigEndian::write_u16(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
    }

    pub fn write_u32(&mut self, v: u32) {
        let mut buf = [0; 4];
        BigEndian::write_u32(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
    }

    pub fn write_u64(&mut self, v: u64) {
        let mut buf = [0; 8];
        BigEndian::write_u64(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
    }

    pub fn write_bytes(&mut self, buf: &[u8]) {
        self.bytes.extend_from_slice(buf);
    }

    pub fn write_zero(&mut self, n: usize) {
        self.bytes.resize(self.bytes.len() + n, 0);
    }

    /// Write `s` into a NUL-padded field of exactly `width` bytes.
    pub fn write_fixed_string(&mut self, structure: &'static str, s: &str, width: usize) -> Result<()> {
        let raw = s.as_bytes();
        if raw.len() > width {
            return Err(CodecError::LengthOverflow {
                structure,
                len: raw.len(),
            });
        }
        self.write_bytes(raw);
        self.write_zero(width - raw.len());
        Ok(())
    }

    /// Write a zero `u16` placeholder and return its position for `backfill_len`.
    pub fn reserve_u16(&mut self) -> usize {
        let pos = self.bytes.len();
        self.write_u16(0);
        pos
    }

    /// Overwrite the `u16` at `pos` with `v`.
    pub fn backfill_u16(&mut self, pos: usize, v: u16) {
        BigEndian::write_u16(&mut self.bytes[pos..pos + 2], v);
    }

    /// Backfill the length field at `pos` with the bytes written since `start`.
    pub fn backfill_len(&mut self, structure: &'static str, pos: usize, start: usize) -> Result<usize> {
        let len = self.bytes.len() - start;
        if len > u16::MAX as usize {
            return Err(CodecError::LengthOverflow { structure, len });
        }
        self.backfill_u16(pos, len as u16);
        Ok(len)
    }

    /// Zero-pad the structure that began at `start` up to the alignment unit.
    pub fn pad_to_alignment(&mut self, start: usize) {
        let n = pad_len(self.bytes.len() - start);
        self.write_zero(n);
    }
}
