// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Frame SPI dispatch requests and replies for transport across a thread boundary.
// Author: Lukas Bower

//! Request and reply frames.
//!
//! A frame is `[size u32][word u32][payload]` where `size` counts the whole
//! frame. For requests the word is the command code; for replies it is the
//! signed status.

use alloc::vec::Vec;

use crate::types::{CodecError, Command};

/// Bytes taken by the size and command/status words.
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest frame either side accepts.
pub const MAX_FRAME_SIZE: u32 = 1 << 20;

/// Request frame sent from a client to a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    /// Raw command code; unknown codes are rejected by the dispatcher.
    pub command: u32,
    /// Encoded transport buffer.
    pub payload: Vec<u8>,
}

impl RequestFrame {
    /// Build a frame for a known command.
    #[must_use]
    pub fn new(command: Command, payload: Vec<u8>) -> Self {
        Self {
            command: command.code(),
            payload,
        }
    }

    /// Encode the frame.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        finish(&self.command.to_le_bytes(), &self.payload)
    }

    /// Decode a frame, validating its declared size.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let (word, payload) = decode_frame(bytes)?;
        Ok(Self {
            command: u32::from_le_bytes(word),
            payload: payload.to_vec(),
        })
    }
}

/// Reply frame sent from a service back to its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyFrame {
    /// Status code, `0` on success.
    pub status: i32,
    /// Encoded reply buffer.
    pub payload: Vec<u8>,
}

impl ReplyFrame {
    /// Encode the frame.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        finish(&self.status.to_le_bytes(), &self.payload)
    }

    /// Decode a frame, validating its declared size.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let (word, payload) = decode_frame(bytes)?;
        Ok(Self {
            status: i32::from_le_bytes(word),
            payload: payload.to_vec(),
        })
    }
}

fn finish(word: &[u8; 4], payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let size = payload
        .len()
        .checked_add(FRAME_HEADER_LEN)
        .ok_or(CodecError::LengthOverflow(payload.len()))?;
    let declared: u32 = size
        .try_into()
        .map_err(|_| CodecError::LengthOverflow(size))?;
    if declared > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: declared,
            max: MAX_FRAME_SIZE,
        });
    }
    let mut buffer = Vec::with_capacity(size);
    buffer.extend_from_slice(&declared.to_le_bytes());
    buffer.extend_from_slice(word);
    buffer.extend_from_slice(payload);
    Ok(buffer)
}

fn decode_frame(bytes: &[u8]) -> Result<([u8; 4], &[u8]), CodecError> {
    if bytes.len() < FRAME_HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    let declared = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if declared > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge {
            size: declared,
            max: MAX_FRAME_SIZE,
        });
    }
    if declared as usize != bytes.len() {
        return Err(CodecError::LengthMismatch {
            declared,
            actual: bytes.len(),
        });
    }
    let word = [bytes[4], bytes[5], bytes[6], bytes[7]];
    Ok((word, &bytes[FRAME_HEADER_LEN..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn request_frame_declares_total_size() {
        let frame = RequestFrame::new(Command::Transfer, vec![1, 2, 3]);
        let bytes = frame.encode().expect("encode");
        assert_eq!(&bytes[..4], &11u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(RequestFrame::decode(&bytes), Ok(frame));
    }

    #[test]
    fn reply_frame_keeps_negative_status() {
        let frame = ReplyFrame {
            status: -7,
            payload: vec![],
        };
        let bytes = frame.encode().expect("encode");
        assert_eq!(ReplyFrame::decode(&bytes).map(|f| f.status), Ok(-7));
    }

    #[test]
    fn detect_truncated_and_mismatched_frames() {
        let bytes = RequestFrame::new(Command::Open, vec![0; 4])
            .encode()
            .expect("encode");
        assert_eq!(
            RequestFrame::decode(&bytes[..5]),
            Err(CodecError::Truncated)
        );
        assert_eq!(
            RequestFrame::decode(&bytes[..10]),
            Err(CodecError::LengthMismatch {
                declared: 12,
                actual: 10
            })
        );
    }

    #[test]
    fn reject_oversized_declared_frame() {
        let mut bytes = vec![0u8; FRAME_HEADER_LEN];
        bytes[..4].copy_from_slice(&(MAX_FRAME_SIZE + 1).to_le_bytes());
        assert!(matches!(
            ReplyFrame::decode(&bytes),
            Err(CodecError::FrameTooLarge { .. })
        ));
    }
}
