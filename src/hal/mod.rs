// CLASSIFICATION: COMMUNITY
// Filename: mod.rs · SPI HAL facade v0.3
// Date Modified: 2027-09-02
// Author: Lukas Bower
//
// ─────────────────────────────────────────────────────────────
// Cohesix · SPI Hardware‑Abstraction Layer (facade)
//
// The vendor pin-mux, clock and SPI engine calls are consumed as
// one opaque capability set: the `SpiHal` trait. Each hardware
// family implements it once; the bottom half is generic over it.
//
//   • `hal::sim` – software bus model for host builds and tests
//
// Additional families are added as sibling sub‑modules.
// ─────────────────────────────────────────────────────────────

#![warn(missing_docs)]

pub mod sim;

pub use sim::{HalEvent, IrqMode, SimHal, SimProbe};

use std::thread;
use std::time::Duration;

use crate::driver::{HwConfig, IrqSignal};
use crate::error::SpiResult;

/// GPIO output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Driven low.
    Low,
    /// Driven high.
    High,
}

/// Data movement requested from the SPI engine.
#[derive(Debug)]
pub enum Xfer<'a> {
    /// Clock bytes out, discard what comes in.
    Tx(&'a [u8]),
    /// Clock filler out, keep what comes in.
    Rx(&'a mut [u8]),
    /// Full duplex; both slices have the same length.
    TxRx(&'a [u8], &'a mut [u8]),
}

impl Xfer<'_> {
    /// Number of bytes on the wire.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Xfer::Tx(tx) => tx.len(),
            Xfer::Rx(rx) => rx.len(),
            Xfer::TxRx(tx, _) => tx.len(),
        }
    }

    /// True when nothing would be clocked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capability set a hardware family exposes to the bottom half.
///
/// Every call is made with the per-bus lock held, so implementations need
/// no locking of their own for register access.
pub trait SpiHal: Send + 'static {
    /// Program the controller and pin-mux from a register image.
    fn configure(&mut self, hw: &HwConfig) -> SpiResult<()>;

    /// Gate the controller clock and release the pins.
    fn shutdown(&mut self) -> SpiResult<()>;

    /// Change the serial clock rate.
    fn set_rate(&mut self, hz: u32) -> SpiResult<()>;

    /// Route the hardware chip-select to `cs`.
    fn select(&mut self, cs: u32) -> SpiResult<()>;

    /// Drive a GPIO output.
    fn set_gpio(&mut self, pin: u32, level: Level) -> SpiResult<()>;

    /// Synchronous transfer; returns once every byte has been clocked.
    fn transfer_polled(&mut self, xfer: Xfer<'_>) -> SpiResult<()>;

    /// Kick an interrupt or DMA driven transfer. `done` is posted from the
    /// completion interrupt; the call itself must not wait for it.
    fn start_async(&mut self, xfer: Xfer<'_>, done: &IrqSignal) -> SpiResult<()>;

    /// Busy-wait or sleep between segments.
    fn delay_us(&mut self, us: u16) {
        thread::sleep(Duration::from_micros(u64::from(us)));
    }
}
