// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Client handles for one chip-select on one bus.
//!
//! [`DirectHandle`] calls a controller published in this process;
//! [`RemoteHandle`] talks to a dispatcher through an endpoint. Both are
//! resolved by service name, are open for as long as they exist and close
//! themselves on drop if [`SpiHandle::close`] was never called.

mod direct;
mod remote;

pub use direct::DirectHandle;
pub use remote::RemoteHandle;

use crate::error::SpiResult;
use crate::msg::SpiMsg;
use crate::resource::SpiCfg;

/// Operations available on an open handle.
pub trait SpiHandle {
    /// Run a scatter/gather transfer. An empty slice is rejected.
    fn transfer(&self, msgs: &mut [SpiMsg<'_>]) -> SpiResult<()>;

    /// Replace the bus configuration.
    fn set_cfg(&self, cfg: &SpiCfg) -> SpiResult<()>;

    /// Read the bus configuration.
    fn get_cfg(&self) -> SpiResult<SpiCfg>;

    /// Close the handle.
    fn close(self) -> SpiResult<()>
    where
        Self: Sized;

    /// Fill `buf` in one read-only segment.
    fn read(&self, buf: &mut [u8]) -> SpiResult<()> {
        self.transfer(&mut [SpiMsg::read(buf)])
    }

    /// Send `buf` in one write-only segment.
    fn write(&self, buf: &[u8]) -> SpiResult<()> {
        self.transfer(&mut [SpiMsg::write(buf)])
    }
}
