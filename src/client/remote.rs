// CLASSIFICATION: COMMUNITY
// Filename: remote.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use spi_wire::{Command, TransportBuf};

use super::SpiHandle;
use crate::error::{SpiError, SpiResult};
use crate::msg::{validate_msgs, SpiMsg};
use crate::protocol::{copy_back, encode_cfg, encode_cs, encode_transfer, read_cfg};
use crate::registry::{service_name, SpiRegistry, DEFAULT_SERVICE_PREFIX};
use crate::resource::SpiCfg;
use crate::transport::Endpoint;

/// Handle talking to a dispatcher through an [`Endpoint`].
pub struct RemoteHandle {
    name: String,
    endpoint: Option<Arc<dyn Endpoint>>,
    cs: u32,
}

impl fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("name", &self.name)
            .field("cs", &self.cs)
            .field("open", &self.endpoint.is_some())
            .finish()
    }
}

impl RemoteHandle {
    /// Open `cs` on bus `bus_num` under the default service prefix.
    pub fn open(bus_num: u32, cs: u32) -> SpiResult<Self> {
        Self::open_with_prefix(DEFAULT_SERVICE_PREFIX, bus_num, cs)
    }

    /// Open `cs` on bus `bus_num` published under `prefix`.
    pub fn open_with_prefix(prefix: &str, bus_num: u32, cs: u32) -> SpiResult<Self> {
        let name = service_name(prefix, bus_num);
        let endpoint = SpiRegistry::lookup_endpoint(&name)?.ok_or_else(|| {
            debug!("no endpoint published as {}", name);
            SpiError::DeviceNotFound
        })?;
        endpoint.call(Command::Open, &encode_cs(cs), &mut TransportBuf::new())?;
        Ok(Self {
            name,
            endpoint: Some(endpoint),
            cs,
        })
    }

    /// Chip-select addressed by this handle.
    #[must_use]
    pub fn cs(&self) -> u32 {
        self.cs
    }

    fn endpoint(&self) -> SpiResult<&Arc<dyn Endpoint>> {
        self.endpoint.as_ref().ok_or(SpiError::InvalidObject)
    }

    fn release(&mut self) -> SpiResult<()> {
        let Some(endpoint) = self.endpoint.take() else {
            return Ok(());
        };
        endpoint.call(Command::Close, &encode_cs(self.cs), &mut TransportBuf::new())
    }
}

impl SpiHandle for RemoteHandle {
    fn transfer(&self, msgs: &mut [SpiMsg<'_>]) -> SpiResult<()> {
        validate_msgs(msgs)?;
        let encoded = encode_transfer(self.cs, msgs)?;
        let mut reply = TransportBuf::with_capacity(encoded.reply_capacity);
        self.endpoint()?
            .call(Command::Transfer, &encoded.request, &mut reply)?;
        copy_back(&reply, msgs)
    }

    fn set_cfg(&self, cfg: &SpiCfg) -> SpiResult<()> {
        let request = encode_cfg(self.cs, cfg)?;
        self.endpoint()?
            .call(Command::SetConfig, &request, &mut TransportBuf::new())
    }

    fn get_cfg(&self) -> SpiResult<SpiCfg> {
        let mut reply = TransportBuf::new();
        self.endpoint()?
            .call(Command::GetConfig, &encode_cs(self.cs), &mut reply)?;
        read_cfg(&mut reply.reader())
    }

    fn close(mut self) -> SpiResult<()> {
        self.release()
    }
}

impl Drop for RemoteHandle {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!("{}: close on drop failed: {}", self.name, err);
        }
    }
}
