// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v0.1
// Date Modified: 2027-09-02
// Author: Lukas Bower

//! SPI platform support for Cohesix.
//!
//! A bus is described by a [`resource::SpiResource`], driven by a
//! [`driver::BusDriver`] over a hardware family's [`hal::SpiHal`], and
//! served through a [`cntlr::SpiCntlr`]. Clients reach it either directly
//! ([`client::DirectHandle`]) or through the dispatch protocol
//! ([`client::RemoteHandle`]).

/// Error taxonomy and status codes
pub mod error;

/// Resource descriptors and caller-visible configuration
pub mod resource;

/// Scatter/gather transfer segments
pub mod msg;

/// Generic controller core
pub mod cntlr;

/// Hardware abstraction and the simulated family
pub mod hal;

/// Bottom-half bus driver
pub mod driver;

/// Transfer protocol codec
pub mod protocol;

/// Service-side dispatch front end
pub mod dispatch;

/// Request/reply transport
pub mod transport;

/// Process-wide service registry
pub mod registry;

/// Client handles
pub mod client;

/// Board configuration
pub mod config;

/// Driver host lifecycle
pub mod host;

pub use client::{DirectHandle, RemoteHandle, SpiHandle};
pub use cntlr::{SpiCntlr, SpiCntlrMethod};
pub use config::{BoardConfig, ConfigError};
pub use error::{SpiError, SpiResult};
pub use host::{SpiDriver, SpiHost};
pub use msg::SpiMsg;
pub use resource::{ModeFlags, SpiCfg, SpiResource, TransferMode};
