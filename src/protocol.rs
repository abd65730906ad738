// CLASSIFICATION: COMMUNITY
// Filename: protocol.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Transfer protocol codec.
//!
//! Client side: [`encode_transfer`] flattens a segment slice into a request
//! buffer and [`copy_back`] scatters the reply into the caller's read
//! buffers. Service side: [`DecodedTransfer`] rebuilds the segments, binding
//! write buffers to payloads borrowed from the request and read buffers to
//! slices of one scratch region that lives exactly as long as the request.
//!
//! Request: `[cs u32][buffer: segment array][buffer: write 0][buffer: write 1]…`
//! Reply:   concatenation of every read region, in segment order.

use log::warn;
use spi_wire::{
    decode_segments, encode_segments, CfgRecord, SbufReader, SegmentRecord, TransportBuf,
    FRAME_HEADER_LEN, MAX_FRAME_SIZE, SEGMENT_RECORD_SIZE,
};

use crate::error::{SpiError, SpiResult};
use crate::msg::{validate_msgs, SpiMsg};
use crate::resource::SpiCfg;

/// Length prefix written in front of every buffer.
const BUFFER_PREFIX_LEN: usize = 4;

/// Reply capacity reserved for status-only replies.
pub const DEFAULT_REPLY_CAPACITY: usize = 16;

/// Largest read region a single request may ask the service to allocate.
///
/// The read data travels back as one reply payload, so it must fit in a
/// frame alongside the frame header.
pub const MAX_SCRATCH_LEN: usize = MAX_FRAME_SIZE as usize - FRAME_HEADER_LEN;

/// Client-side encoding of one transfer.
#[derive(Debug)]
pub struct EncodedTransfer {
    /// Request buffer ready for dispatch.
    pub request: TransportBuf,
    /// Reply capacity the client should provide.
    pub reply_capacity: usize,
}

/// Buffer carrying only a chip-select.
#[must_use]
pub fn encode_cs(cs: u32) -> TransportBuf {
    let mut sbuf = TransportBuf::with_capacity(4);
    sbuf.write_u32(cs);
    sbuf
}

/// Encode `msgs` for chip-select `cs`.
pub fn encode_transfer(cs: u32, msgs: &[SpiMsg<'_>]) -> SpiResult<EncodedTransfer> {
    validate_msgs(msgs)?;
    let expected = msgs
        .iter()
        .filter(|m| m.rbuf.is_some())
        .try_fold(0usize, |acc, m| acc.checked_add(m.len()))
        .filter(|total| *total <= MAX_SCRATCH_LEN)
        .ok_or(SpiError::MallocFail)?;
    let writes: usize = msgs
        .iter()
        .filter_map(|m| m.wbuf)
        .map(|w| w.len() + BUFFER_PREFIX_LEN)
        .sum();
    let array_len = msgs.len() * SEGMENT_RECORD_SIZE;
    let total = 4 + BUFFER_PREFIX_LEN + array_len + writes;

    let mut request = TransportBuf::with_capacity(total);
    request.write_u32(cs);
    let records: Vec<SegmentRecord> = msgs.iter().map(SpiMsg::record).collect();
    request.write_buffer(&encode_segments(&records))?;
    for wbuf in msgs.iter().filter_map(|m| m.wbuf) {
        request.write_buffer(wbuf)?;
    }

    Ok(EncodedTransfer {
        request,
        reply_capacity: if expected == 0 {
            DEFAULT_REPLY_CAPACITY
        } else {
            expected
        },
    })
}

/// Scatter a transfer reply into the read buffers of `msgs`.
///
/// A reply shorter than requested fills what it can and is logged; the
/// remaining bytes of the affected buffers are left untouched.
pub fn copy_back(reply: &TransportBuf, msgs: &mut [SpiMsg<'_>]) -> SpiResult<()> {
    let mut reader = reply.reader();
    for (index, msg) in msgs.iter_mut().enumerate() {
        let Some(rbuf) = msg.rbuf.as_deref_mut() else {
            continue;
        };
        let got = reader.read_up_to(rbuf.len());
        if got.len() < rbuf.len() {
            warn!(
                "spi reply short for segment {}: wanted {} got {}",
                index,
                rbuf.len(),
                got.len()
            );
        }
        rbuf[..got.len()].copy_from_slice(got);
    }
    Ok(())
}

/// Encode a SET_CONFIG request.
pub fn encode_cfg(cs: u32, cfg: &SpiCfg) -> SpiResult<TransportBuf> {
    let mut sbuf = encode_cs(cs);
    sbuf.write_buffer(&cfg.to_record().to_bytes())?;
    Ok(sbuf)
}

/// Read a configuration record written with [`write_cfg`].
pub fn read_cfg(reader: &mut SbufReader<'_>) -> SpiResult<SpiCfg> {
    let bytes = reader.read_buffer()?;
    SpiCfg::from_record(&CfgRecord::from_bytes(bytes)?)
}

/// Append a configuration record.
pub fn write_cfg(sbuf: &mut TransportBuf, cfg: &SpiCfg) -> SpiResult<()> {
    sbuf.write_buffer(&cfg.to_record().to_bytes())?;
    Ok(())
}

/// Service-side view of a transfer request.
#[derive(Debug)]
pub struct DecodedTransfer<'a> {
    records: Vec<SegmentRecord>,
    writes: Vec<Option<&'a [u8]>>,
    scratch: Vec<u8>,
}

impl<'a> DecodedTransfer<'a> {
    /// Decode the segment array and write payloads that follow the
    /// chip-select in `reader`, and allocate the read scratch region.
    pub fn decode(reader: &mut SbufReader<'a>) -> SpiResult<Self> {
        let array = reader.read_buffer()?;
        let records = decode_segments(array)?;

        let mut writes = Vec::with_capacity(records.len());
        for record in &records {
            if !record.has_write && !record.has_read {
                return Err(SpiError::InvalidParam);
            }
            if record.has_write {
                let payload = reader.read_buffer()?;
                if payload.len() != record.len as usize {
                    return Err(SpiError::Io);
                }
                writes.push(Some(payload));
            } else {
                writes.push(None);
            }
        }

        let total = records
            .iter()
            .filter(|r| r.has_read)
            .try_fold(0usize, |acc, r| acc.checked_add(r.len as usize))
            .filter(|total| *total <= MAX_SCRATCH_LEN)
            .ok_or(SpiError::MallocFail)?;
        let mut scratch = Vec::new();
        scratch
            .try_reserve_exact(total)
            .map_err(|_| SpiError::MallocFail)?;
        scratch.resize(total, 0);

        Ok(Self {
            records,
            writes,
            scratch,
        })
    }

    /// Number of segments.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Bytes reserved for read data.
    #[must_use]
    pub fn scratch_len(&self) -> usize {
        self.scratch.len()
    }

    /// Segments bound to the request payloads and scratch slices.
    pub fn msgs(&mut self) -> Vec<SpiMsg<'_>> {
        let mut rest: &mut [u8] = &mut self.scratch;
        let mut msgs = Vec::with_capacity(self.records.len());
        for (record, wbuf) in self.records.iter().zip(self.writes.iter()) {
            let rbuf = if record.has_read {
                let (head, tail) = std::mem::take(&mut rest).split_at_mut(record.len as usize);
                rest = tail;
                Some(head)
            } else {
                None
            };
            msgs.push(SpiMsg {
                wbuf: *wbuf,
                rbuf,
                len: record.len,
                speed_hz: record.speed_hz,
                delay_us: record.delay_us,
                cs_change: record.cs_change,
            });
        }
        msgs
    }

    /// Append every read region to `reply`, in segment order.
    pub fn write_back(&self, reply: &mut TransportBuf) {
        let mut offset = 0usize;
        for record in self.records.iter().filter(|r| r.has_read) {
            let end = offset + record.len as usize;
            reply.write_raw(&self.scratch[offset..end]);
            offset = end;
        }
    }
}
