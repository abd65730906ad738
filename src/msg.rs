// CLASSIFICATION: COMMUNITY
// Filename: msg.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Scatter/gather transfer segments.

use spi_wire::SegmentRecord;

use crate::error::{SpiError, SpiResult};

/// One segment of a transfer.
///
/// The write and read buffers of a segment always have the same length.
/// A segment with neither buffer is rejected.
#[derive(Debug)]
pub struct SpiMsg<'a> {
    /// Bytes clocked out, if any.
    pub wbuf: Option<&'a [u8]>,
    /// Destination for bytes clocked in, if any.
    pub rbuf: Option<&'a mut [u8]>,
    /// Shared length of the segment.
    pub len: u32,
    /// Clock override for this segment; `0` keeps the controller speed.
    pub speed_hz: u32,
    /// Delay after the segment, in microseconds.
    pub delay_us: u16,
    /// Deassert chip-select after this segment.
    pub cs_change: bool,
}

impl<'a> SpiMsg<'a> {
    /// Write-only segment.
    #[must_use]
    pub fn write(buf: &'a [u8]) -> Self {
        Self::build(Some(buf), None, buf.len())
    }

    /// Read-only segment.
    #[must_use]
    pub fn read(buf: &'a mut [u8]) -> Self {
        let len = buf.len();
        Self::build(None, Some(buf), len)
    }

    /// Full-duplex segment. Both buffers must be the same length.
    pub fn duplex(wbuf: &'a [u8], rbuf: &'a mut [u8]) -> SpiResult<Self> {
        if wbuf.len() != rbuf.len() {
            return Err(SpiError::InvalidParam);
        }
        Ok(Self::build(Some(wbuf), Some(rbuf), wbuf.len()))
    }

    fn build(wbuf: Option<&'a [u8]>, rbuf: Option<&'a mut [u8]>, len: usize) -> Self {
        Self {
            wbuf,
            rbuf,
            len: u32::try_from(len).unwrap_or(u32::MAX),
            speed_hz: 0,
            delay_us: 0,
            cs_change: false,
        }
    }

    /// Deassert chip-select once this segment completes.
    #[must_use]
    pub fn with_cs_change(mut self, cs_change: bool) -> Self {
        self.cs_change = cs_change;
        self
    }

    /// Wait `delay_us` microseconds after this segment.
    #[must_use]
    pub fn with_delay_us(mut self, delay_us: u16) -> Self {
        self.delay_us = delay_us;
        self
    }

    /// Run this segment at `speed_hz` instead of the controller speed.
    #[must_use]
    pub fn with_speed_hz(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Length as a host index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// True for a zero-length segment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check the presence and length invariants of the segment.
    pub fn validate(&self) -> SpiResult<()> {
        if self.wbuf.is_none() && self.rbuf.is_none() {
            return Err(SpiError::InvalidParam);
        }
        if self.wbuf.is_some_and(|w| w.len() != self.len()) {
            return Err(SpiError::InvalidParam);
        }
        if self.rbuf.as_deref().is_some_and(|r| r.len() != self.len()) {
            return Err(SpiError::InvalidParam);
        }
        Ok(())
    }

    /// Wire record describing this segment. Buffers become presence flags.
    #[must_use]
    pub fn record(&self) -> SegmentRecord {
        SegmentRecord {
            len: self.len,
            speed_hz: self.speed_hz,
            delay_us: self.delay_us,
            cs_change: self.cs_change,
            has_write: self.wbuf.is_some(),
            has_read: self.rbuf.is_some(),
        }
    }
}

/// Validate a whole transfer.
pub fn validate_msgs(msgs: &[SpiMsg<'_>]) -> SpiResult<()> {
    if msgs.is_empty() {
        return Err(SpiError::InvalidParam);
    }
    msgs.iter().try_for_each(SpiMsg::validate)
}
