// CLASSIFICATION: COMMUNITY
// Filename: cntlr.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Generic SPI controller core.
//!
//! A [`SpiCntlr`] is created when a bus driver binds and receives its
//! method table when the driver initialises. Every operation runs with the
//! controller lock held for its full duration, including any blocking
//! completion wait inside the bottom half, so operations on one controller
//! are strictly serialised. The chip-select travels as an argument.

use std::fmt;
use std::sync::{Arc, Mutex};

use log::debug;
use once_cell::sync::OnceCell;

use crate::error::{SpiError, SpiResult};
use crate::msg::{validate_msgs, SpiMsg};
use crate::resource::SpiCfg;

/// Method table a bottom half installs into its controller.
///
/// Methods a driver does not provide report [`SpiError::NotSupported`].
pub trait SpiCntlrMethod: Send + Sync {
    /// Read the current configuration.
    fn get_cfg(&self, _cs: u32) -> SpiResult<SpiCfg> {
        Err(SpiError::NotSupported)
    }

    /// Replace the configuration.
    fn set_cfg(&self, _cs: u32, _cfg: &SpiCfg) -> SpiResult<()> {
        Err(SpiError::NotSupported)
    }

    /// Run a scatter/gather transfer.
    fn transfer(&self, _cs: u32, _msgs: &mut [SpiMsg<'_>]) -> SpiResult<()> {
        Err(SpiError::NotSupported)
    }

    /// Prepare the bus for `cs`.
    fn open(&self, _cs: u32) -> SpiResult<()> {
        Err(SpiError::NotSupported)
    }

    /// Release the bus for `cs`.
    fn close(&self, _cs: u32) -> SpiResult<()> {
        Err(SpiError::NotSupported)
    }
}

impl<T: SpiCntlrMethod + ?Sized> SpiCntlrMethod for Arc<T> {
    fn get_cfg(&self, cs: u32) -> SpiResult<SpiCfg> {
        (**self).get_cfg(cs)
    }

    fn set_cfg(&self, cs: u32, cfg: &SpiCfg) -> SpiResult<()> {
        (**self).set_cfg(cs, cfg)
    }

    fn transfer(&self, cs: u32, msgs: &mut [SpiMsg<'_>]) -> SpiResult<()> {
        (**self).transfer(cs, msgs)
    }

    fn open(&self, cs: u32) -> SpiResult<()> {
        (**self).open(cs)
    }

    fn close(&self, cs: u32) -> SpiResult<()> {
        (**self).close(cs)
    }
}

/// Live controller for one SPI bus.
pub struct SpiCntlr {
    bus_num: u32,
    num_cs: u32,
    lock: Mutex<()>,
    method: OnceCell<Box<dyn SpiCntlrMethod>>,
}

impl fmt::Debug for SpiCntlr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpiCntlr")
            .field("bus_num", &self.bus_num)
            .field("num_cs", &self.num_cs)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl SpiCntlr {
    /// Create a controller without a method table.
    #[must_use]
    pub fn new(bus_num: u32, num_cs: u32) -> Self {
        Self {
            bus_num,
            num_cs,
            lock: Mutex::new(()),
            method: OnceCell::new(),
        }
    }

    /// Bus number served by this controller.
    #[must_use]
    pub fn bus_num(&self) -> u32 {
        self.bus_num
    }

    /// Number of addressable chip-selects.
    #[must_use]
    pub fn num_cs(&self) -> u32 {
        self.num_cs
    }

    /// Install the method table. A controller accepts exactly one.
    pub fn attach(&self, method: Box<dyn SpiCntlrMethod>) -> SpiResult<()> {
        self.method.set(method).map_err(|_| SpiError::Failure)
    }

    /// True once a method table is installed.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.method.get().is_some()
    }

    /// True when no operation currently holds the controller lock.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.lock.try_lock().is_ok()
    }

    fn call<T>(
        &self,
        op: &'static str,
        cs: u32,
        f: impl FnOnce(&dyn SpiCntlrMethod) -> SpiResult<T>,
    ) -> SpiResult<T> {
        let method = self.method.get().ok_or(SpiError::InvalidParam)?;
        if cs >= self.num_cs {
            return Err(SpiError::InvalidParam);
        }
        let _guard = self.lock.lock().map_err(|_| SpiError::Failure)?;
        debug!("spi{}: {} cs={}", self.bus_num, op, cs);
        f(method.as_ref())
    }

    /// Open chip-select `cs`.
    pub fn open(&self, cs: u32) -> SpiResult<()> {
        self.call("open", cs, |m| m.open(cs))
    }

    /// Close chip-select `cs`.
    pub fn close(&self, cs: u32) -> SpiResult<()> {
        self.call("close", cs, |m| m.close(cs))
    }

    /// Run `msgs` against chip-select `cs`.
    pub fn transfer(&self, cs: u32, msgs: &mut [SpiMsg<'_>]) -> SpiResult<()> {
        validate_msgs(msgs)?;
        self.call("transfer", cs, |m| m.transfer(cs, msgs))
    }

    /// Replace the controller configuration.
    pub fn set_cfg(&self, cs: u32, cfg: &SpiCfg) -> SpiResult<()> {
        self.call("set_cfg", cs, |m| m.set_cfg(cs, cfg))
    }

    /// Read the controller configuration.
    pub fn get_cfg(&self, cs: u32) -> SpiResult<SpiCfg> {
        self.call("get_cfg", cs, |m| m.get_cfg(cs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ModeFlags, TransferMode};

    struct CfgOnly;

    impl SpiCntlrMethod for CfgOnly {
        fn get_cfg(&self, _cs: u32) -> SpiResult<SpiCfg> {
            Ok(SpiCfg {
                max_speed_hz: 1,
                mode: ModeFlags::empty(),
                transfer_mode: TransferMode::Polling,
                bits_per_word: 8,
            })
        }
    }

    #[test]
    fn unattached_controller_rejects_calls() {
        let cntlr = SpiCntlr::new(0, 1);
        assert_eq!(cntlr.open(0), Err(SpiError::InvalidParam));
        assert!(cntlr.is_idle());
    }

    #[test]
    fn missing_method_is_not_supported() {
        let cntlr = SpiCntlr::new(0, 1);
        cntlr.attach(Box::new(CfgOnly)).unwrap();
        assert!(cntlr.get_cfg(0).is_ok());
        assert_eq!(cntlr.open(0), Err(SpiError::NotSupported));
        let mut msgs = [SpiMsg::write(&[1])];
        assert_eq!(cntlr.transfer(0, &mut msgs), Err(SpiError::NotSupported));
        assert!(cntlr.is_idle());
    }

    #[test]
    fn chip_select_out_of_range_is_invalid() {
        let cntlr = SpiCntlr::new(0, 2);
        cntlr.attach(Box::new(CfgOnly)).unwrap();
        assert!(cntlr.get_cfg(1).is_ok());
        assert_eq!(cntlr.get_cfg(2), Err(SpiError::InvalidParam));
    }

    #[test]
    fn second_attach_fails() {
        let cntlr = SpiCntlr::new(0, 1);
        cntlr.attach(Box::new(CfgOnly)).unwrap();
        assert_eq!(cntlr.attach(Box::new(CfgOnly)), Err(SpiError::Failure));
    }
}
