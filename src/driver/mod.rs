// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Bottom-half SPI bus driver.
//!
//! [`BusDriver`] is generic over a hardware family's [`SpiHal`] and is
//! installed as the method table of a [`crate::cntlr::SpiCntlr`]. It owns the
//! per-bus lock and the completion semaphore posted by the transfer-complete
//! interrupt.
//!
//! Bus states: `Closed → Configuring → Open → {Sending | Receiving} → Open
//! → … → Closed`. Opens are counted; the first configures the hardware and
//! the last close shuts it down.

mod completion;
mod regs;

pub use completion::{Completion, IrqSignal};
pub use regs::{CsControl, HwConfig, PinAssignment, PinFunction};

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, warn};

use crate::cntlr::SpiCntlrMethod;
use crate::error::{SpiError, SpiResult};
use crate::hal::{Level, SpiHal, Xfer};
use crate::msg::{validate_msgs, SpiMsg};
use crate::resource::{SpiCfg, SpiResource, TransferMode};

/// Lifecycle state of one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusState {
    /// Hardware is shut down.
    Closed,
    /// Register image is being programmed.
    Configuring,
    /// Ready for transfers.
    Open,
    /// Clocking a segment that writes.
    Sending,
    /// Clocking a read-only segment.
    Receiving,
}

/// Board-specific device state for one bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiDevice {
    resource: SpiResource,
    hw: HwConfig,
}

impl SpiDevice {
    /// Attach a device described by `resource`.
    #[must_use]
    pub fn new(resource: SpiResource) -> Self {
        let hw = HwConfig::from_resource(&resource);
        Self { resource, hw }
    }

    /// Bus identity.
    #[must_use]
    pub fn spi_id(&self) -> u32 {
        self.resource.bus_num
    }

    /// Current resource descriptor.
    #[must_use]
    pub fn resource(&self) -> &SpiResource {
        &self.resource
    }

    /// Current register image.
    #[must_use]
    pub fn hw(&self) -> &HwConfig {
        &self.hw
    }

    fn apply_cfg(&mut self, cfg: &SpiCfg) -> SpiResult<()> {
        self.resource.apply_cfg(cfg)?;
        self.hw = HwConfig::from_resource(&self.resource);
        Ok(())
    }
}

struct BusInner<H> {
    device: SpiDevice,
    hal: H,
    state: BusState,
    open_count: u32,
}

/// Bottom half for one bus of hardware family `H`.
pub struct BusDriver<H: SpiHal> {
    bus_num: u32,
    inner: Mutex<BusInner<H>>,
    done: Arc<Completion>,
}

impl<H: SpiHal> fmt::Debug for BusDriver<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusDriver")
            .field("bus_num", &self.bus_num)
            .field("state", &self.state())
            .finish()
    }
}

impl<H: SpiHal> BusDriver<H> {
    /// Bind `device` to the hardware behind `hal`. The bus starts closed.
    #[must_use]
    pub fn new(device: SpiDevice, hal: H) -> Self {
        Self {
            bus_num: device.spi_id(),
            inner: Mutex::new(BusInner {
                device,
                hal,
                state: BusState::Closed,
                open_count: 0,
            }),
            done: Arc::new(Completion::new()),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BusState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(BusState::Closed)
    }

    /// Signal handle the hardware interrupt posts on completion.
    ///
    /// The handle completes whichever transfer is waiting when it fires.
    #[must_use]
    pub fn irq_signal(&self) -> IrqSignal {
        IrqSignal::new(self.done.clone())
    }

    fn lock(&self) -> SpiResult<MutexGuard<'_, BusInner<H>>> {
        self.inner.lock().map_err(|_| SpiError::Failure)
    }

    /// Write `data` on chip-select `cs`.
    pub fn send(&self, cs: u32, data: &[u8]) -> SpiResult<()> {
        self.run_segments(cs, &mut [SpiMsg::write(data)])
    }

    /// Fill `buf` from chip-select `cs`.
    pub fn recv(&self, cs: u32, buf: &mut [u8]) -> SpiResult<()> {
        self.run_segments(cs, &mut [SpiMsg::read(buf)])
    }

    /// Full-duplex exchange on chip-select `cs`.
    pub fn send_recv(&self, cs: u32, tx: &[u8], rx: &mut [u8]) -> SpiResult<()> {
        self.run_segments(cs, &mut [SpiMsg::duplex(tx, rx)?])
    }

    fn run_segments(&self, cs: u32, msgs: &mut [SpiMsg<'_>]) -> SpiResult<()> {
        validate_msgs(msgs)?;
        let mut inner = self.lock()?;
        if inner.state == BusState::Closed {
            return Err(SpiError::InvalidObject);
        }
        match inner.device.hw.cs {
            CsControl::Hardware { lines, .. } => {
                if cs >= lines {
                    return Err(SpiError::InvalidParam);
                }
                inner.hal.select(cs)?;
            }
            CsControl::Software { .. } if cs != 0 => return Err(SpiError::InvalidParam),
            _ => {}
        }
        let mut asserted = false;
        let result = inner.run_all(&self.done, msgs, &mut asserted);
        if asserted {
            let released = inner.drive_cs(false);
            if result.is_ok() {
                released?;
            }
        }
        inner.state = BusState::Open;
        result
    }
}

impl<H: SpiHal> BusInner<H> {
    fn drive_cs(&mut self, active: bool) -> SpiResult<()> {
        if let CsControl::Software { pin, active_high } = self.device.hw.cs {
            let level = if active == active_high {
                Level::High
            } else {
                Level::Low
            };
            self.hal.set_gpio(pin, level)?;
        }
        Ok(())
    }

    fn run_all(
        &mut self,
        done: &Arc<Completion>,
        msgs: &mut [SpiMsg<'_>],
        asserted: &mut bool,
    ) -> SpiResult<()> {
        let base_rate = self.device.hw.rate_hz;
        for msg in msgs.iter_mut() {
            if !*asserted {
                self.drive_cs(true)?;
                *asserted = true;
            }
            let override_rate = msg.speed_hz != 0 && msg.speed_hz != base_rate;
            if override_rate {
                self.hal.set_rate(msg.speed_hz)?;
            }
            if !msg.is_empty() {
                self.run_one(done, msg)?;
            }
            if override_rate {
                self.hal.set_rate(base_rate)?;
            }
            if msg.delay_us > 0 {
                self.hal.delay_us(msg.delay_us);
            }
            if msg.cs_change {
                self.drive_cs(false)?;
                *asserted = false;
            }
        }
        Ok(())
    }

    fn run_one(&mut self, done: &Arc<Completion>, msg: &mut SpiMsg<'_>) -> SpiResult<()> {
        let xfer = match (msg.wbuf, msg.rbuf.as_deref_mut()) {
            (Some(tx), Some(rx)) => Xfer::TxRx(tx, rx),
            (Some(tx), None) => Xfer::Tx(tx),
            (None, Some(rx)) => Xfer::Rx(rx),
            (None, None) => return Err(SpiError::InvalidParam),
        };
        self.state = match xfer {
            Xfer::Rx(_) => BusState::Receiving,
            _ => BusState::Sending,
        };
        let bus = self.device.spi_id();
        let result = match self.device.resource.transfer_mode {
            TransferMode::Polling => self.hal.transfer_polled(xfer),
            TransferMode::Interrupt | TransferMode::Dma => {
                let irq = done.arm();
                self.hal.start_async(xfer, &irq)?;
                let waited = done.wait(self.device.resource.timeout);
                if waited == Err(SpiError::Timeout) {
                    warn!(
                        "spi{}: completion not posted within {:?}",
                        bus, self.device.resource.timeout
                    );
                }
                waited
            }
        };
        self.state = BusState::Open;
        result
    }
}

impl<H: SpiHal> SpiCntlrMethod for BusDriver<H> {
    fn get_cfg(&self, _cs: u32) -> SpiResult<SpiCfg> {
        Ok(self.lock()?.device.resource.cfg())
    }

    fn set_cfg(&self, _cs: u32, cfg: &SpiCfg) -> SpiResult<()> {
        let mut inner = self.lock()?;
        inner.device.apply_cfg(cfg)?;
        if inner.state != BusState::Closed {
            let hw = inner.device.hw;
            inner.hal.configure(&hw).map_err(|err| {
                error!("spi{}: reconfigure failed: {}", self.bus_num, err);
                err
            })?;
        }
        debug!("spi{}: cfg now {:?}", self.bus_num, cfg);
        Ok(())
    }

    fn transfer(&self, cs: u32, msgs: &mut [SpiMsg<'_>]) -> SpiResult<()> {
        self.run_segments(cs, msgs)
    }

    fn open(&self, cs: u32) -> SpiResult<()> {
        let mut inner = self.lock()?;
        if inner.open_count == 0 {
            inner.state = BusState::Configuring;
            let hw = inner.device.hw;
            if let Err(err) = inner.hal.configure(&hw) {
                error!("spi{}: configure failed: {}", self.bus_num, err);
                inner.state = BusState::Closed;
                return Err(err);
            }
            if let Err(err) = inner.drive_cs(false) {
                inner.state = BusState::Closed;
                return Err(err);
            }
            inner.state = BusState::Open;
            debug!("spi{}: bus open", self.bus_num);
        }
        inner.open_count += 1;
        debug!("spi{}: cs {} open ({} users)", self.bus_num, cs, inner.open_count);
        Ok(())
    }

    fn close(&self, cs: u32) -> SpiResult<()> {
        let mut inner = self.lock()?;
        if inner.open_count == 0 {
            return Err(SpiError::InvalidObject);
        }
        inner.open_count -= 1;
        if inner.open_count == 0 {
            inner.hal.shutdown()?;
            inner.state = BusState::Closed;
            debug!("spi{}: bus closed by cs {}", self.bus_num, cs);
        }
        Ok(())
    }
}
