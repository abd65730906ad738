// CLASSIFICATION: COMMUNITY
// Filename: sim.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Software SPI family used on hosts without SPI hardware.
//!
//! Records every HAL call, serves reads from a programmable queue (or
//! echoes writes back in loopback mode) and models the completion
//! interrupt as immediate, delayed or lost.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::driver::{HwConfig, IrqSignal};
use crate::error::{SpiError, SpiResult};
use crate::hal::{Level, SpiHal, Xfer};

/// Byte clocked in when nothing is queued: an idle MISO line reads high.
const IDLE_BYTE: u8 = 0xFF;

/// One recorded HAL call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HalEvent {
    /// Controller programmed.
    Configure(HwConfig),
    /// Controller shut down.
    Shutdown,
    /// Clock rate changed.
    Rate(u32),
    /// Hardware chip-select routed.
    Select(u32),
    /// GPIO driven.
    Gpio {
        /// Pin number.
        pin: u32,
        /// Driven level.
        level: Level,
    },
    /// Asynchronous transfer started.
    Kick {
        /// DMA rather than interrupt driven.
        dma: bool,
    },
    /// Bytes clocked out.
    Write(Vec<u8>),
    /// Bytes clocked in.
    Read(usize),
    /// Full-duplex exchange.
    Duplex {
        /// Bytes clocked out.
        write: Vec<u8>,
        /// Bytes clocked in.
        read: Vec<u8>,
    },
    /// Inter-segment delay.
    Delay(u16),
}

/// How the simulated completion interrupt behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqMode {
    /// Posted before `start_async` returns.
    Immediate,
    /// Posted from another thread after the delay.
    Delayed(Duration),
    /// Never posted.
    Dropped,
}

#[derive(Debug)]
struct SimState {
    events: Vec<HalEvent>,
    rx: VecDeque<u8>,
    loopback: bool,
    irq: IrqMode,
    hw: Option<HwConfig>,
}

fn lock_state(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulated controller.
#[derive(Debug)]
pub struct SimHal {
    state: Arc<Mutex<SimState>>,
}

/// Test-side view of a [`SimHal`] that has been moved into a driver.
#[derive(Debug, Clone)]
pub struct SimProbe {
    state: Arc<Mutex<SimState>>,
}

impl SimHal {
    /// Create a controller and its probe.
    #[must_use]
    pub fn new() -> (Self, SimProbe) {
        let state = Arc::new(Mutex::new(SimState {
            events: Vec::new(),
            rx: VecDeque::new(),
            loopback: false,
            irq: IrqMode::Immediate,
            hw: None,
        }));
        (
            Self {
                state: state.clone(),
            },
            SimProbe { state },
        )
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        lock_state(&self.state)
    }

    fn move_bytes(state: &mut SimState, xfer: Xfer<'_>) {
        match xfer {
            Xfer::Tx(tx) => {
                if state.loopback {
                    state.rx.extend(tx.iter().copied());
                }
                state.events.push(HalEvent::Write(tx.to_vec()));
            }
            Xfer::Rx(rx) => {
                for byte in rx.iter_mut() {
                    *byte = state.rx.pop_front().unwrap_or(IDLE_BYTE);
                }
                state.events.push(HalEvent::Read(rx.len()));
            }
            Xfer::TxRx(tx, rx) => {
                for (out, byte) in rx.iter_mut().zip(tx.iter()) {
                    *out = if state.loopback {
                        *byte
                    } else {
                        state.rx.pop_front().unwrap_or(IDLE_BYTE)
                    };
                }
                state.events.push(HalEvent::Duplex {
                    write: tx.to_vec(),
                    read: rx.to_vec(),
                });
            }
        }
    }
}

impl SpiHal for SimHal {
    fn configure(&mut self, hw: &HwConfig) -> SpiResult<()> {
        if hw.rate_hz == 0 {
            return Err(SpiError::InvalidParam);
        }
        let mut state = self.state();
        state.loopback = hw.loopback;
        state.hw = Some(*hw);
        state.events.push(HalEvent::Configure(*hw));
        Ok(())
    }

    fn shutdown(&mut self) -> SpiResult<()> {
        let mut state = self.state();
        state.hw = None;
        state.events.push(HalEvent::Shutdown);
        Ok(())
    }

    fn set_rate(&mut self, hz: u32) -> SpiResult<()> {
        if hz == 0 {
            return Err(SpiError::InvalidParam);
        }
        self.state().events.push(HalEvent::Rate(hz));
        Ok(())
    }

    fn select(&mut self, cs: u32) -> SpiResult<()> {
        self.state().events.push(HalEvent::Select(cs));
        Ok(())
    }

    fn set_gpio(&mut self, pin: u32, level: Level) -> SpiResult<()> {
        self.state().events.push(HalEvent::Gpio { pin, level });
        Ok(())
    }

    fn transfer_polled(&mut self, xfer: Xfer<'_>) -> SpiResult<()> {
        let mut state = self.state();
        if state.hw.is_none() {
            return Err(SpiError::Failure);
        }
        Self::move_bytes(&mut state, xfer);
        Ok(())
    }

    fn start_async(&mut self, xfer: Xfer<'_>, done: &IrqSignal) -> SpiResult<()> {
        let mut state = self.state();
        let Some(hw) = state.hw else {
            return Err(SpiError::Failure);
        };
        state.events.push(HalEvent::Kick { dma: hw.dma_tx });
        Self::move_bytes(&mut state, xfer);
        match state.irq {
            IrqMode::Immediate => done.post(),
            IrqMode::Delayed(after) => {
                let done = done.clone();
                thread::spawn(move || {
                    thread::sleep(after);
                    done.post();
                });
            }
            IrqMode::Dropped => {}
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u16) {
        self.state().events.push(HalEvent::Delay(us));
        thread::sleep(Duration::from_micros(u64::from(us)));
    }
}

impl SimProbe {
    /// Snapshot of the recorded calls.
    #[must_use]
    pub fn events(&self) -> Vec<HalEvent> {
        lock_state(&self.state).events.clone()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        lock_state(&self.state).events.clear();
    }

    /// Queue bytes the peripheral will return on the next reads.
    pub fn queue_read(&self, bytes: &[u8]) {
        lock_state(&self.state).rx.extend(bytes.iter().copied());
    }

    /// Select how the completion interrupt behaves.
    pub fn set_irq_mode(&self, mode: IrqMode) {
        lock_state(&self.state).irq = mode;
    }

    /// Register image last programmed, if the controller is up.
    #[must_use]
    pub fn hw(&self) -> Option<HwConfig> {
        lock_state(&self.state).hw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Completion;
    use crate::resource::SpiResource;

    fn configured() -> (SimHal, SimProbe) {
        let (mut hal, probe) = SimHal::new();
        hal.configure(&HwConfig::from_resource(&SpiResource::new(0)))
            .unwrap();
        (hal, probe)
    }

    #[test]
    fn reads_drain_queue_then_idle_high() {
        let (mut hal, probe) = configured();
        probe.queue_read(&[0x12]);
        let mut buf = [0u8; 3];
        hal.transfer_polled(Xfer::Rx(&mut buf)).unwrap();
        assert_eq!(buf, [0x12, IDLE_BYTE, IDLE_BYTE]);
    }

    #[test]
    fn loopback_echoes_duplex() {
        let (mut hal, _probe) = SimHal::new();
        let mut res = SpiResource::new(0);
        res.mode = crate::resource::ModeFlags::LOOP;
        hal.configure(&HwConfig::from_resource(&res)).unwrap();
        let mut rx = [0u8; 2];
        hal.transfer_polled(Xfer::TxRx(&[5, 6], &mut rx)).unwrap();
        assert_eq!(rx, [5, 6]);
    }

    #[test]
    fn transfer_before_configure_fails() {
        let (mut hal, _probe) = SimHal::new();
        assert_eq!(hal.transfer_polled(Xfer::Tx(&[1])), Err(SpiError::Failure));
    }

    #[test]
    fn immediate_irq_posts_completion() {
        let (mut hal, _probe) = configured();
        let done = Arc::new(Completion::new());
        hal.start_async(Xfer::Tx(&[1]), &IrqSignal::new(done.clone()))
            .unwrap();
        assert_eq!(done.wait(Some(Duration::from_millis(1))), Ok(()));
    }
}
