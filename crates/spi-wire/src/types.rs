// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define SPI wire records, command codes and codec errors shared across components.
// Author: Lukas Bower
#![allow(clippy::module_name_repetitions)]

//! SPI wire data model shared by the encoder and decoder sides.

use alloc::vec::Vec;

/// Size in bytes of one encoded segment record.
pub const SEGMENT_RECORD_SIZE: usize = 16;

/// Size in bytes of one encoded configuration record.
pub const CFG_RECORD_SIZE: usize = 8;

/// Segment flag: a write payload follows inline in the request.
pub const SEGMENT_WRITE_PRESENT: u8 = 0x01;

/// Segment flag: the caller expects read data for this segment in the reply.
pub const SEGMENT_READ_PRESENT: u8 = 0x02;

const SEGMENT_KNOWN_FLAGS: u8 = SEGMENT_WRITE_PRESENT | SEGMENT_READ_PRESENT;

/// Possible errors produced while encoding or decoding SPI wire data.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// Input buffer ended before the requested field.
    #[error("truncated buffer")]
    Truncated,
    /// Encountered an unknown command code.
    #[error("unsupported command {0}")]
    Unsupported(u32),
    /// Declared length does not match the bytes present.
    #[error("length mismatch: declared {declared} actual {actual}")]
    LengthMismatch {
        /// Length declared by the peer.
        declared: u32,
        /// Actual byte length observed.
        actual: usize,
    },
    /// A buffer is too long to be described by a 32-bit length prefix.
    #[error("buffer length {0} exceeds the u32 prefix")]
    LengthOverflow(usize),
    /// A transfer carried no segments.
    #[error("empty segment array")]
    EmptySegmentArray,
    /// The segment array length is not a whole number of records.
    #[error("segment array of {0} bytes is not a multiple of the record size")]
    MisalignedSegmentArray(usize),
    /// A segment record carried flag bits this codec does not understand.
    #[error("invalid segment flags {0:#04x}")]
    InvalidSegmentFlags(u8),
    /// A segment record carried non-zero bytes in its reserved word.
    #[error("reserved segment word {0:#010x} is not zero")]
    ReservedNotZero(u32),
    /// A frame exceeded the negotiated maximum.
    #[error("frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge {
        /// Declared frame size.
        size: u32,
        /// Maximum accepted frame size.
        max: u32,
    },
}

/// Dispatch command codes. The numeric values are stable across the boundary.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Open a chip-select on the controller.
    Open = 0,
    /// Close a chip-select on the controller.
    Close = 1,
    /// Run a scatter/gather transfer.
    Transfer = 2,
    /// Replace the controller configuration.
    SetConfig = 3,
    /// Read back the controller configuration.
    GetConfig = 4,
}

impl Command {
    /// Raw wire value of the command.
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Command {
    type Error = CodecError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Command::Open,
            1 => Command::Close,
            2 => Command::Transfer,
            3 => Command::SetConfig,
            4 => Command::GetConfig,
            other => return Err(CodecError::Unsupported(other)),
        })
    }
}

/// Fixed-size wire image of one transfer segment.
///
/// Buffers never travel as addresses: `has_write` says a payload of `len`
/// bytes follows inline, `has_read` says the reply must carry `len` bytes
/// for this segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentRecord {
    /// Shared read/write length of the segment.
    pub len: u32,
    /// Per-segment clock override, `0` keeps the controller speed.
    pub speed_hz: u32,
    /// Delay after the segment, in microseconds.
    pub delay_us: u16,
    /// Deassert chip-select after the segment.
    pub cs_change: bool,
    /// A write payload follows inline.
    pub has_write: bool,
    /// Read data is expected in the reply.
    pub has_read: bool,
}

impl SegmentRecord {
    /// Serialise the record into its 16-byte wire image.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SEGMENT_RECORD_SIZE] {
        let mut out = [0u8; SEGMENT_RECORD_SIZE];
        out[0..4].copy_from_slice(&self.len.to_le_bytes());
        out[4..8].copy_from_slice(&self.speed_hz.to_le_bytes());
        out[8..10].copy_from_slice(&self.delay_us.to_le_bytes());
        out[10] = u8::from(self.cs_change);
        let mut flags = 0u8;
        if self.has_write {
            flags |= SEGMENT_WRITE_PRESENT;
        }
        if self.has_read {
            flags |= SEGMENT_READ_PRESENT;
        }
        out[11] = flags;
        out
    }

    /// Parse a record from exactly [`SEGMENT_RECORD_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != SEGMENT_RECORD_SIZE {
            return Err(CodecError::LengthMismatch {
                declared: SEGMENT_RECORD_SIZE as u32,
                actual: bytes.len(),
            });
        }
        let flags = bytes[11];
        if flags & !SEGMENT_KNOWN_FLAGS != 0 {
            return Err(CodecError::InvalidSegmentFlags(flags));
        }
        let reserved = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        if reserved != 0 {
            return Err(CodecError::ReservedNotZero(reserved));
        }
        Ok(Self {
            len: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            speed_hz: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            delay_us: u16::from_le_bytes([bytes[8], bytes[9]]),
            cs_change: bytes[10] != 0,
            has_write: flags & SEGMENT_WRITE_PRESENT != 0,
            has_read: flags & SEGMENT_READ_PRESENT != 0,
        })
    }
}

/// Flatten a record slice into one contiguous segment array.
#[must_use]
pub fn encode_segments(records: &[SegmentRecord]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * SEGMENT_RECORD_SIZE);
    for record in records {
        out.extend_from_slice(&record.to_bytes());
    }
    out
}

/// Reinterpret a flat segment array as `len / SEGMENT_RECORD_SIZE` records.
pub fn decode_segments(bytes: &[u8]) -> Result<Vec<SegmentRecord>, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::EmptySegmentArray);
    }
    if bytes.len() % SEGMENT_RECORD_SIZE != 0 {
        return Err(CodecError::MisalignedSegmentArray(bytes.len()));
    }
    bytes
        .chunks_exact(SEGMENT_RECORD_SIZE)
        .map(SegmentRecord::from_bytes)
        .collect()
}

/// Wire image of the caller-visible controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CfgRecord {
    /// Maximum clock speed in Hz.
    pub max_speed_hz: u32,
    /// Mode bit flags.
    pub mode: u16,
    /// Transfer mode discriminant.
    pub transfer_mode: u8,
    /// Word size in bits.
    pub bits_per_word: u8,
}

impl CfgRecord {
    /// Serialise the record into its 8-byte wire image.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; CFG_RECORD_SIZE] {
        let mut out = [0u8; CFG_RECORD_SIZE];
        out[0..4].copy_from_slice(&self.max_speed_hz.to_le_bytes());
        out[4..6].copy_from_slice(&self.mode.to_le_bytes());
        out[6] = self.transfer_mode;
        out[7] = self.bits_per_word;
        out
    }

    /// Parse a record from exactly [`CFG_RECORD_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() != CFG_RECORD_SIZE {
            return Err(CodecError::LengthMismatch {
                declared: CFG_RECORD_SIZE as u32,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            max_speed_hz: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            mode: u16::from_le_bytes([bytes[4], bytes[5]]),
            transfer_mode: bytes[6],
            bits_per_word: bytes[7],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_record_layout_is_stable() {
        let record = SegmentRecord {
            len: 0x0102_0304,
            speed_hz: 1_000_000,
            delay_us: 10,
            cs_change: true,
            has_write: true,
            has_read: false,
        };
        let bytes = record.to_bytes();
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[8..10], &[10, 0]);
        assert_eq!(bytes[10], 1);
        assert_eq!(bytes[11], SEGMENT_WRITE_PRESENT);
        assert_eq!(&bytes[12..], &[0, 0, 0, 0]);
    }

    #[test]
    fn segment_array_must_be_whole_records() {
        assert_eq!(decode_segments(&[]), Err(CodecError::EmptySegmentArray));
        assert_eq!(
            decode_segments(&[0u8; 20]),
            Err(CodecError::MisalignedSegmentArray(20))
        );
        let decoded = decode_segments(&[0u8; 32]).expect("two empty records");
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn unknown_segment_flags_are_rejected() {
        let mut bytes = SegmentRecord::default().to_bytes();
        bytes[11] = 0x80;
        assert_eq!(
            SegmentRecord::from_bytes(&bytes),
            Err(CodecError::InvalidSegmentFlags(0x80))
        );
    }

    #[test]
    fn reserved_word_must_be_zero() {
        let mut bytes = SegmentRecord::default().to_bytes();
        bytes[15] = 0x01;
        assert_eq!(
            SegmentRecord::from_bytes(&bytes),
            Err(CodecError::ReservedNotZero(0x0100_0000))
        );
        let mut array = encode_segments(&[SegmentRecord::default(); 2]);
        array[SEGMENT_RECORD_SIZE + 12] = 0xFF;
        assert_eq!(
            decode_segments(&array),
            Err(CodecError::ReservedNotZero(0xFF))
        );
    }

    #[test]
    fn cfg_record_rejects_wrong_length() {
        assert!(matches!(
            CfgRecord::from_bytes(&[0u8; 7]),
            Err(CodecError::LengthMismatch { declared: 8, actual: 7 })
        ));
    }

    #[test]
    fn command_codes_are_stable() {
        assert_eq!(Command::Open.code(), 0);
        assert_eq!(Command::Close.code(), 1);
        assert_eq!(Command::Transfer.code(), 2);
        assert_eq!(Command::SetConfig.code(), 3);
        assert_eq!(Command::GetConfig.code(), 4);
        assert_eq!(Command::try_from(5), Err(CodecError::Unsupported(5)));
    }
}
