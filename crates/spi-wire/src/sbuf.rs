// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Implement the growable transport buffer carried between SPI clients and services.
// Author: Lukas Bower

//! Growable little-endian transport buffer and its borrowing reader.

use alloc::vec::Vec;

use crate::types::CodecError;

/// Capacity used for replies that carry only a status word.
const DEFAULT_CAPACITY: usize = 256;

/// Growable byte buffer used as the request and reply payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportBuf {
    data: Vec<u8>,
}

impl TransportBuf {
    /// Create an empty buffer with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer able to hold `capacity` bytes without growing.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Wrap bytes received from the peer.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Borrow the encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the buffer, returning the encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Number of encoded bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop all encoded bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Append one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Append a little-endian `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a `u32` length prefix followed by `bytes`.
    pub fn write_buffer(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let len: u32 = bytes
            .len()
            .try_into()
            .map_err(|_| CodecError::LengthOverflow(bytes.len()))?;
        self.data.reserve(4 + bytes.len());
        self.write_u32(len);
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Append `bytes` verbatim, without a length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Start reading from the beginning of the buffer.
    #[must_use]
    pub fn reader(&self) -> SbufReader<'_> {
        SbufReader::new(&self.data)
    }
}

/// Cursor over an encoded buffer. Slices it hands out borrow the buffer,
/// so decoded payloads can be used without copying.
#[derive(Debug, Clone)]
pub struct SbufReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SbufReader<'a> {
    /// Create a reader over raw bytes.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len).ok_or(CodecError::Truncated)?;
        if end > self.buf.len() {
            return Err(CodecError::Truncated);
        }
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a length-prefixed buffer written by [`TransportBuf::write_buffer`].
    pub fn read_buffer(&mut self) -> Result<&'a [u8], CodecError> {
        let start = self.pos;
        let len = self.read_u32()? as usize;
        match self.take(len) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                self.pos = start;
                Err(err)
            }
        }
    }

    /// Read up to `len` raw bytes; returns fewer when the buffer runs short.
    pub fn read_up_to(&mut self, len: usize) -> &'a [u8] {
        let n = len.min(self.remaining());
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_carry_a_length_prefix() {
        let mut sbuf = TransportBuf::new();
        sbuf.write_u32(7);
        sbuf.write_buffer(&[0xde, 0xad]).expect("small buffer");
        sbuf.write_buffer(&[]).expect("empty buffer");
        assert_eq!(
            sbuf.as_bytes(),
            &[7, 0, 0, 0, 2, 0, 0, 0, 0xde, 0xad, 0, 0, 0, 0]
        );

        let mut reader = sbuf.reader();
        assert_eq!(reader.read_u32(), Ok(7));
        assert_eq!(reader.read_buffer(), Ok(&[0xde, 0xad][..]));
        assert_eq!(reader.read_buffer(), Ok(&[][..]));
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.read_u32(), Err(CodecError::Truncated));
    }

    #[test]
    fn truncated_buffer_does_not_advance() {
        let mut sbuf = TransportBuf::new();
        sbuf.write_u32(10);
        sbuf.write_raw(&[1, 2, 3]);
        let mut reader = sbuf.reader();
        assert_eq!(reader.read_buffer(), Err(CodecError::Truncated));
        assert_eq!(reader.remaining(), 7);
    }

    #[test]
    fn read_up_to_stops_at_end() {
        let sbuf = TransportBuf::from_bytes(alloc::vec![1, 2, 3]);
        let mut reader = sbuf.reader();
        assert_eq!(reader.read_up_to(2), &[1, 2]);
        assert_eq!(reader.read_up_to(5), &[3]);
        assert!(reader.read_up_to(1).is_empty());
    }
}
