//! # ByteCursor - Growable Buffer with a Single Offset
//!
//! `ByteCursor` is the substrate every encoder writes into and every decoder
//! reads from. It pairs a byte container with one offset that both reads and
//! writes advance.
//!
//! ## Two Modes, One Type
//!
//! | Backing | Constructed with | Operations |
//! |---------|------------------|------------|
//! | `Vec<u8>` | `ByteCursor::new()` | write + read (read back what was written) |
//! | `&'a [u8]` | `ByteCursor::wrap(bytes)` | read only, zero-copy slices tied to `'a` |
//!
//! ## Growth Strategy
//!
//! When a write needs more room than the buffer has, capacity grows to at
//! least twice the required size, so a sequence of appends costs amortized
//! O(1) per byte. Requesting a size that overflows `usize` is a caller bug and
//! panics, exactly like `Vec` does.
//!
//! ## Random Access
//!
//! Encoders reserve space with [`ByteCursor::alloc`] and fill it later with
//! [`ByteCursor::write_at`]; this is how the storage format back-patches value
//! pointers in the field directory after the values themselves are written.

use eyre::{bail, Result};

use crate::error::CodecError;

#[derive(Debug, Clone, Default)]
pub struct ByteCursor<B = Vec<u8>> {
    bytes: B,
    offset: usize,
}

impl ByteCursor<Vec<u8>> {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            offset: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            offset: 0,
        }
    }

    fn ensure_capacity(&mut self, required: usize) {
        if required <= self.bytes.capacity() {
            return;
        }
        let target = required.checked_mul(2).unwrap_or(required);
        self.bytes.reserve_exact(target - self.bytes.len());
    }

    /// Reserves `n` bytes at the current offset and returns where they start.
    pub fn alloc(&mut self, n: usize) -> usize {
        let start = self.offset;
        let end = match start.checked_add(n) {
            Some(end) => end,
            None => panic!("byte cursor size overflow: {} + {}", start, n),
        };
        self.ensure_capacity(end);
        if self.bytes.len() < end {
            self.bytes.resize(end, 0);
        }
        self.offset = end;
        start
    }

    pub fn write_u8(&mut self, value: u8) -> usize {
        let pos = self.alloc(1);
        self.bytes[pos] = value;
        self.offset
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> usize {
        let pos = self.alloc(data.len());
        self.bytes[pos..pos + data.len()].copy_from_slice(data);
        self.offset
    }

    /// Overwrites previously allocated bytes without moving the offset.
    pub fn write_at(&mut self, pos: usize, data: &[u8]) {
        self.bytes[pos..pos + data.len()].copy_from_slice(data);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }
}

impl<'a> ByteCursor<&'a [u8]> {
    /// Reads `n` bytes as a slice that outlives the cursor.
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        let start = self.read(n)?;
        let bytes: &'a [u8] = self.bytes;
        Ok(&bytes[start..start + n])
    }

    /// Returns the unread tail of the underlying buffer.
    pub fn rest(&self) -> &'a [u8] {
        let bytes: &'a [u8] = self.bytes;
        &bytes[self.offset.min(bytes.len())..]
    }
}

impl<B: AsRef<[u8]>> ByteCursor<B> {
    pub fn wrap(bytes: B) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    pub fn len(&self) -> usize {
        self.bytes.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.as_ref().is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.offset)
    }

    pub fn as_slice(&self) -> &[u8] {
        self.bytes.as_ref()
    }

    /// Advances the offset by `n` and returns where the bytes start.
    pub fn read(&mut self, n: usize) -> Result<usize> {
        let start = self.offset;
        match start.checked_add(n) {
            Some(end) if end <= self.len() => {
                self.offset = end;
                Ok(start)
            }
            _ => bail!(CodecError::corrupt(format!(
                "truncated buffer: need {} bytes at offset {}, have {}",
                n,
                start,
                self.remaining()
            ))),
        }
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let pos = self.read(1)?;
        Ok(self.bytes.as_ref()[pos])
    }

    pub fn peek_u8(&self) -> Result<u8> {
        match self.bytes.as_ref().get(self.offset) {
            Some(b) => Ok(*b),
            None => bail!(CodecError::corrupt(format!(
                "truncated buffer: nothing to read at offset {}",
                self.offset
            ))),
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        let start = self.read(n)?;
        Ok(&self.bytes.as_ref()[start..start + n])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let start = self.read(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes.as_ref()[start..start + N]);
        Ok(out)
    }

    /// Reads `n` bytes at `pos` without moving the offset.
    pub fn read_at(&self, pos: usize, n: usize) -> Result<&[u8]> {
        match pos.checked_add(n) {
            Some(end) if end <= self.len() => Ok(&self.bytes.as_ref()[pos..end]),
            _ => bail!(CodecError::corrupt(format!(
                "out-of-bounds read: {} bytes at offset {} of {}",
                n,
                pos,
                self.len()
            ))),
        }
    }
}
