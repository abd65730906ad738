// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide SPI transport buffer and wire record primitives for client and service code.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![no_std]

//! SPI dispatch wire primitives shared by the in-process service, the
//! remote service thread and the client handles.
//!
//! Everything in this crate is plain bytes: chip-select words, fixed-size
//! segment and configuration records, length-prefixed buffers and the
//! request/reply frames used when a request crosses a thread boundary.
//! Nothing here knows about controllers or hardware.

extern crate alloc;

#[cfg(test)]
extern crate std;

mod frame;
mod sbuf;
mod types;

pub use frame::{ReplyFrame, RequestFrame, FRAME_HEADER_LEN, MAX_FRAME_SIZE};
pub use sbuf::{SbufReader, TransportBuf};
pub use types::*;
