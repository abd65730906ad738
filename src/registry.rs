// CLASSIFICATION: COMMUNITY
// Filename: registry.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Process-wide SPI service registry.
//!
//! Bound controllers are published under `"<PREFIX>_SPI_<bus>"` for direct
//! clients, and remote endpoints under the same name for remote clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::info;
use once_cell::sync::Lazy;

use crate::cntlr::SpiCntlr;
use crate::error::{SpiError, SpiResult};
use crate::transport::Endpoint;

/// Prefix used when the board configuration does not name one.
pub const DEFAULT_SERVICE_PREFIX: &str = "HDF_PLATFORM";

static CONTROLLERS: Lazy<Mutex<HashMap<String, Arc<SpiCntlr>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

static ENDPOINTS: Lazy<Mutex<HashMap<String, Arc<dyn Endpoint>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Service name of bus `bus_num` under `prefix`.
#[must_use]
pub fn service_name(prefix: &str, bus_num: u32) -> String {
    format!("{}_SPI_{}", prefix, bus_num)
}

/// Registry of published controllers and endpoints.
pub struct SpiRegistry;

impl SpiRegistry {
    /// Publish `cntlr` under `name`, replacing any previous entry.
    pub fn register_cntlr(name: &str, cntlr: Arc<SpiCntlr>) -> SpiResult<()> {
        CONTROLLERS
            .lock()
            .map_err(|_| SpiError::Failure)?
            .insert(name.into(), cntlr);
        info!("SPI controller {:?} registered", name);
        Ok(())
    }

    /// Remove the controller published under `name`.
    pub fn unregister_cntlr(name: &str) -> SpiResult<()> {
        CONTROLLERS
            .lock()
            .map_err(|_| SpiError::Failure)?
            .remove(name);
        info!("SPI controller {:?} unregistered", name);
        Ok(())
    }

    /// Controller published under `name`.
    pub fn lookup_cntlr(name: &str) -> SpiResult<Option<Arc<SpiCntlr>>> {
        Ok(CONTROLLERS
            .lock()
            .map_err(|_| SpiError::Failure)?
            .get(name)
            .cloned())
    }

    /// Publish `endpoint` under `name`, replacing any previous entry.
    pub fn register_endpoint(name: &str, endpoint: Arc<dyn Endpoint>) -> SpiResult<()> {
        ENDPOINTS
            .lock()
            .map_err(|_| SpiError::Failure)?
            .insert(name.into(), endpoint);
        info!("SPI endpoint {:?} registered", name);
        Ok(())
    }

    /// Remove the endpoint published under `name`.
    pub fn unregister_endpoint(name: &str) -> SpiResult<()> {
        ENDPOINTS
            .lock()
            .map_err(|_| SpiError::Failure)?
            .remove(name);
        info!("SPI endpoint {:?} unregistered", name);
        Ok(())
    }

    /// Endpoint published under `name`.
    pub fn lookup_endpoint(name: &str) -> SpiResult<Option<Arc<dyn Endpoint>>> {
        Ok(ENDPOINTS
            .lock()
            .map_err(|_| SpiError::Failure)?
            .get(name)
            .cloned())
    }

    /// Names of every published controller, sorted.
    pub fn list_cntlrs() -> SpiResult<Vec<String>> {
        let mut names: Vec<String> = CONTROLLERS
            .lock()
            .map_err(|_| SpiError::Failure)?
            .keys()
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    /// Clear both tables. Only used in tests.
    pub fn reset() -> SpiResult<()> {
        CONTROLLERS.lock().map_err(|_| SpiError::Failure)?.clear();
        ENDPOINTS.lock().map_err(|_| SpiError::Failure)?.clear();
        Ok(())
    }
}

/// Clears the registry on creation and again on drop.
pub struct TestRegistryGuard;

impl TestRegistryGuard {
    /// Start from an empty registry.
    pub fn new() -> Self {
        let _ = SpiRegistry::reset();
        TestRegistryGuard
    }
}

impl Default for TestRegistryGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestRegistryGuard {
    fn drop(&mut self) {
        let _ = SpiRegistry::reset();
    }
}
