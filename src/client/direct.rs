// CLASSIFICATION: COMMUNITY
// Filename: direct.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

use std::sync::Arc;

use log::{debug, warn};

use super::SpiHandle;
use crate::cntlr::SpiCntlr;
use crate::error::{SpiError, SpiResult};
use crate::msg::{validate_msgs, SpiMsg};
use crate::registry::{service_name, SpiRegistry, DEFAULT_SERVICE_PREFIX};
use crate::resource::SpiCfg;

/// Handle calling the controller core of this process directly.
#[derive(Debug)]
pub struct DirectHandle {
    cntlr: Arc<SpiCntlr>,
    cs: u32,
    open: bool,
}

impl DirectHandle {
    /// Open `cs` on bus `bus_num` under the default service prefix.
    pub fn open(bus_num: u32, cs: u32) -> SpiResult<Self> {
        Self::open_with_prefix(DEFAULT_SERVICE_PREFIX, bus_num, cs)
    }

    /// Open `cs` on bus `bus_num` published under `prefix`.
    pub fn open_with_prefix(prefix: &str, bus_num: u32, cs: u32) -> SpiResult<Self> {
        let name = service_name(prefix, bus_num);
        let cntlr = SpiRegistry::lookup_cntlr(&name)?.ok_or_else(|| {
            debug!("no controller published as {}", name);
            SpiError::DeviceNotFound
        })?;
        cntlr.open(cs)?;
        Ok(Self {
            cntlr,
            cs,
            open: true,
        })
    }

    /// Chip-select addressed by this handle.
    #[must_use]
    pub fn cs(&self) -> u32 {
        self.cs
    }

    fn release(&mut self) -> SpiResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.cntlr.close(self.cs)
    }
}

impl SpiHandle for DirectHandle {
    fn transfer(&self, msgs: &mut [SpiMsg<'_>]) -> SpiResult<()> {
        validate_msgs(msgs)?;
        self.cntlr.transfer(self.cs, msgs)
    }

    fn set_cfg(&self, cfg: &SpiCfg) -> SpiResult<()> {
        self.cntlr.set_cfg(self.cs, cfg)
    }

    fn get_cfg(&self) -> SpiResult<SpiCfg> {
        self.cntlr.get_cfg(self.cs)
    }

    fn close(mut self) -> SpiResult<()> {
        self.release()
    }
}

impl Drop for DirectHandle {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("spi{}: close on drop failed: {}", self.cntlr.bus_num(), err);
        }
    }
}
