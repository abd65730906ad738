// CLASSIFICATION: COMMUNITY
// Filename: dispatch.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Service-side dispatch front end.
//!
//! Routes a command code and its request buffer to the controller core.
//! Every command starts with the chip-select; a request too short to carry
//! one is an I/O error.

use std::sync::Arc;

use log::debug;
use spi_wire::{Command, TransportBuf};

use crate::cntlr::SpiCntlr;
use crate::error::{SpiError, SpiResult};
use crate::protocol::{read_cfg, write_cfg, DecodedTransfer};

/// Dispatcher bound to one controller.
#[derive(Debug, Clone)]
pub struct SpiService {
    cntlr: Arc<SpiCntlr>,
}

impl SpiService {
    /// Serve requests against `cntlr`.
    #[must_use]
    pub fn new(cntlr: Arc<SpiCntlr>) -> Self {
        Self { cntlr }
    }

    /// Controller served by this dispatcher.
    #[must_use]
    pub fn cntlr(&self) -> &Arc<SpiCntlr> {
        &self.cntlr
    }

    /// Handle command `cmd` carried in `data`, appending any reply payload
    /// to `reply`.
    pub fn dispatch(
        &self,
        cmd: u32,
        data: &TransportBuf,
        reply: &mut TransportBuf,
    ) -> SpiResult<()> {
        let command = Command::try_from(cmd).map_err(|_| SpiError::NotSupported)?;
        let mut reader = data.reader();
        let cs = reader.read_u32().map_err(|_| SpiError::Io)?;
        debug!(
            "spi{}: dispatch {:?} cs={} ({} bytes)",
            self.cntlr.bus_num(),
            command,
            cs,
            data.len()
        );
        match command {
            Command::Open => self.cntlr.open(cs),
            Command::Close => self.cntlr.close(cs),
            Command::Transfer => {
                let mut decoded = DecodedTransfer::decode(&mut reader)?;
                {
                    let mut msgs = decoded.msgs();
                    self.cntlr.transfer(cs, &mut msgs)?;
                }
                decoded.write_back(reply);
                Ok(())
            }
            Command::SetConfig => {
                let cfg = read_cfg(&mut reader)?;
                self.cntlr.set_cfg(cs, &cfg)
            }
            Command::GetConfig => {
                let cfg = self.cntlr.get_cfg(cs)?;
                write_cfg(reply, &cfg)
            }
        }
    }
}
