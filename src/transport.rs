// CLASSIFICATION: COMMUNITY
// Filename: transport.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Request/reply transport between remote clients and a dispatcher.
//!
//! [`ServiceThread`] runs one [`SpiService`] on a dedicated thread and hands
//! out [`ChannelEndpoint`]s. Requests and replies cross the thread boundary
//! as encoded frames and are answered in arrival order.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{debug, error, info};
use spi_wire::{Command, ReplyFrame, RequestFrame, TransportBuf};

use crate::dispatch::SpiService;
use crate::error::{status_of, SpiError, SpiResult};

/// Something that answers dispatch requests.
pub trait Endpoint: Send + Sync {
    /// Issue `cmd` with request `data`; reply payload is appended to `reply`.
    fn call(&self, cmd: Command, data: &TransportBuf, reply: &mut TransportBuf) -> SpiResult<()>;
}

impl Endpoint for SpiService {
    fn call(&self, cmd: Command, data: &TransportBuf, reply: &mut TransportBuf) -> SpiResult<()> {
        self.dispatch(cmd.code(), data, reply)
    }
}

enum ServiceMsg {
    Call {
        frame: Vec<u8>,
        reply: Sender<Vec<u8>>,
    },
    Shutdown,
}

/// Client side of a [`ServiceThread`].
#[derive(Clone)]
pub struct ChannelEndpoint {
    tx: Sender<ServiceMsg>,
}

impl fmt::Debug for ChannelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelEndpoint").finish_non_exhaustive()
    }
}

impl Endpoint for ChannelEndpoint {
    fn call(&self, cmd: Command, data: &TransportBuf, reply: &mut TransportBuf) -> SpiResult<()> {
        let frame = RequestFrame::new(cmd, data.as_bytes().to_vec()).encode()?;
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(ServiceMsg::Call {
                frame,
                reply: reply_tx,
            })
            .map_err(|_| SpiError::Failure)?;
        let bytes = reply_rx.recv().map_err(|_| SpiError::Failure)?;
        let frame = ReplyFrame::decode(&bytes)?;
        if let Some(err) = SpiError::from_status(frame.status) {
            return Err(err);
        }
        reply.write_raw(&frame.payload);
        Ok(())
    }
}

/// Dedicated thread serving one dispatcher.
pub struct ServiceThread {
    name: String,
    tx: Sender<ServiceMsg>,
    worker: Option<JoinHandle<()>>,
}

impl fmt::Debug for ServiceThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceThread")
            .field("name", &self.name)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl ServiceThread {
    /// Start serving `service` on a thread named after `name`.
    pub fn spawn(name: &str, service: SpiService) -> SpiResult<Self> {
        let (tx, rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || serve(&service, rx))
            .map_err(|err| {
                error!("failed to start service thread {}: {}", name, err);
                SpiError::Failure
            })?;
        info!("service thread {} started", name);
        Ok(Self {
            name: name.to_string(),
            tx,
            worker: Some(worker),
        })
    }

    /// New endpoint talking to this thread.
    #[must_use]
    pub fn endpoint(&self) -> ChannelEndpoint {
        ChannelEndpoint {
            tx: self.tx.clone(),
        }
    }

    /// Stop the thread after it drains queued requests.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.tx.send(ServiceMsg::Shutdown);
        if worker.join().is_err() {
            error!("service thread {} panicked", self.name);
        }
        info!("service thread {} stopped", self.name);
    }
}

impl Drop for ServiceThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve(service: &SpiService, rx: Receiver<ServiceMsg>) {
    for msg in rx {
        match msg {
            ServiceMsg::Call { frame, reply } => {
                let _ = reply.send(answer(service, &frame));
            }
            ServiceMsg::Shutdown => break,
        }
    }
}

fn answer(service: &SpiService, frame: &[u8]) -> Vec<u8> {
    let reply = match RequestFrame::decode(frame) {
        Ok(request) => {
            let data = TransportBuf::from_bytes(request.payload);
            let mut payload = TransportBuf::new();
            let result = service.dispatch(request.command, &data, &mut payload);
            if let Err(err) = result {
                debug!("command {} failed: {}", request.command, err);
            }
            ReplyFrame {
                status: status_of(&result),
                payload: if result.is_ok() {
                    payload.into_bytes()
                } else {
                    Vec::new()
                },
            }
        }
        Err(err) => {
            debug!("malformed request frame: {}", err);
            ReplyFrame {
                status: SpiError::Io.status(),
                payload: Vec::new(),
            }
        }
    };
    reply.encode().unwrap_or_else(|err| {
        error!("reply frame not encodable: {}", err);
        ReplyFrame {
            status: SpiError::Io.status(),
            payload: Vec::new(),
        }
        .encode()
        .unwrap_or_default()
    })
}
