// CLASSIFICATION: COMMUNITY
// Filename: host.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Driver host lifecycle: bind, init and release of SPI buses.
//!
//! Binding publishes a controller without a method table, so clients that
//! resolve it early see `InvalidParam` until init installs the bottom half.

use std::fmt;
use std::sync::Arc;

use log::{error, info};

use crate::cntlr::SpiCntlr;
use crate::config::BoardConfig;
use crate::dispatch::SpiService;
use crate::driver::{BusDriver, BusState, IrqSignal, SpiDevice};
use crate::error::{SpiError, SpiResult};
use crate::hal::SpiHal;
use crate::registry::{service_name, SpiRegistry};
use crate::resource::SpiResource;
use crate::transport::ServiceThread;

/// Host-side driver entry for one bus.
pub struct SpiDriver<H: SpiHal> {
    name: String,
    resource: SpiResource,
    cntlr: Option<Arc<SpiCntlr>>,
    bus: Option<Arc<BusDriver<H>>>,
    service: Option<ServiceThread>,
}

impl<H: SpiHal> fmt::Debug for SpiDriver<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpiDriver")
            .field("name", &self.name)
            .field("bound", &self.cntlr.is_some())
            .field("initialised", &self.bus.is_some())
            .field("remote", &self.service.is_some())
            .finish()
    }
}

impl<H: SpiHal> SpiDriver<H> {
    /// Create the controller for `resource` and publish it under `prefix`.
    pub fn bind(prefix: &str, resource: SpiResource) -> SpiResult<Self> {
        let name = service_name(prefix, resource.bus_num);
        if SpiRegistry::lookup_cntlr(&name)?.is_some() {
            error!("{} already bound", name);
            return Err(SpiError::Failure);
        }
        let cntlr = Arc::new(SpiCntlr::new(resource.bus_num, resource.num_cs));
        SpiRegistry::register_cntlr(&name, cntlr.clone())?;
        info!("bound {}", name);
        Ok(Self {
            name,
            resource,
            cntlr: Some(cntlr),
            bus: None,
            service: None,
        })
    }

    /// Install the bottom half driving `hal`; with `remote`, also start a
    /// service thread and publish its endpoint.
    pub fn init(&mut self, hal: H, remote: bool) -> SpiResult<()> {
        let cntlr = self.cntlr.clone().ok_or(SpiError::InvalidObject)?;
        if self.bus.is_some() {
            return Err(SpiError::Failure);
        }
        let bus = Arc::new(BusDriver::new(SpiDevice::new(self.resource.clone()), hal));
        cntlr.attach(Box::new(bus.clone()))?;
        self.bus = Some(bus);
        if remote {
            let service = ServiceThread::spawn(&self.name, SpiService::new(cntlr))?;
            SpiRegistry::register_endpoint(&self.name, Arc::new(service.endpoint()))?;
            self.service = Some(service);
        }
        info!("initialised {} (remote: {})", self.name, remote);
        Ok(())
    }

    /// Service name of this bus.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resource the bus was bound with.
    #[must_use]
    pub fn resource(&self) -> &SpiResource {
        &self.resource
    }

    /// Published controller, until release.
    #[must_use]
    pub fn cntlr(&self) -> Option<&Arc<SpiCntlr>> {
        self.cntlr.as_ref()
    }

    /// Lifecycle state of the bottom half, once initialised.
    #[must_use]
    pub fn bus_state(&self) -> Option<BusState> {
        self.bus.as_ref().map(|bus| bus.state())
    }

    /// Handle the completion interrupt of this bus posts through.
    #[must_use]
    pub fn irq_signal(&self) -> Option<IrqSignal> {
        self.bus.as_ref().map(|bus| bus.irq_signal())
    }

    /// Unpublish the bus, stop its service thread and drop the controller.
    pub fn release(&mut self) -> SpiResult<()> {
        if self.cntlr.is_none() {
            return Ok(());
        }
        if let Some(mut service) = self.service.take() {
            SpiRegistry::unregister_endpoint(&self.name)?;
            service.stop();
        }
        SpiRegistry::unregister_cntlr(&self.name)?;
        self.bus = None;
        self.cntlr = None;
        info!("released {}", self.name);
        Ok(())
    }
}

impl<H: SpiHal> Drop for SpiDriver<H> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            error!("release of {} failed: {}", self.name, err);
        }
    }
}

/// Every bus of one board, bound and initialised together.
pub struct SpiHost<H: SpiHal> {
    prefix: String,
    drivers: Vec<SpiDriver<H>>,
}

impl<H: SpiHal> fmt::Debug for SpiHost<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpiHost")
            .field("prefix", &self.prefix)
            .field("drivers", &self.drivers)
            .finish()
    }
}

impl<H: SpiHal> SpiHost<H> {
    /// Bind and initialise every bus of `board`, asking `factory` for each
    /// bus's hardware. Buses brought up before a failure are released.
    pub fn start(
        board: &BoardConfig,
        remote: bool,
        mut factory: impl FnMut(&SpiResource) -> SpiResult<H>,
    ) -> SpiResult<Self> {
        let mut drivers = Vec::with_capacity(board.buses.len());
        for resource in &board.buses {
            let mut driver = SpiDriver::bind(&board.service_prefix, resource.clone())?;
            let hal = factory(resource)?;
            driver.init(hal, remote)?;
            drivers.push(driver);
        }
        info!(
            "SPI host up with {} bus(es) under {}",
            drivers.len(),
            board.service_prefix
        );
        Ok(Self {
            prefix: board.service_prefix.clone(),
            drivers,
        })
    }

    /// Service prefix of the board.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Driver for bus `bus_num`.
    #[must_use]
    pub fn driver(&self, bus_num: u32) -> Option<&SpiDriver<H>> {
        self.drivers
            .iter()
            .find(|driver| driver.resource.bus_num == bus_num)
    }

    /// Release every bus.
    pub fn shutdown(&mut self) -> SpiResult<()> {
        let mut result = Ok(());
        for driver in &mut self.drivers {
            if let Err(err) = driver.release() {
                result = Err(err);
            }
        }
        self.drivers.clear();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::SimHal;
    use crate::registry::TestRegistryGuard;
    use serial_test::serial;

    #[test]
    #[serial]
    fn bind_publishes_uninitialised_controller() {
        let _guard = TestRegistryGuard::new();
        let mut driver = SpiDriver::<SimHal>::bind("UNIT", SpiResource::new(5)).unwrap();
        let cntlr = SpiRegistry::lookup_cntlr("UNIT_SPI_5").unwrap().unwrap();
        assert_eq!(cntlr.open(0), Err(SpiError::InvalidParam));
        let (hal, _probe) = SimHal::new();
        driver.init(hal, false).unwrap();
        assert_eq!(driver.bus_state(), Some(BusState::Closed));
        cntlr.open(0).unwrap();
        assert_eq!(driver.bus_state(), Some(BusState::Open));
        cntlr.close(0).unwrap();
    }

    #[test]
    #[serial]
    fn second_init_and_double_bind_fail() {
        let _guard = TestRegistryGuard::new();
        let mut driver = SpiDriver::<SimHal>::bind("UNIT", SpiResource::new(6)).unwrap();
        assert_eq!(
            SpiDriver::<SimHal>::bind("UNIT", SpiResource::new(6)).unwrap_err(),
            SpiError::Failure
        );
        driver.init(SimHal::new().0, false).unwrap();
        assert_eq!(driver.init(SimHal::new().0, false), Err(SpiError::Failure));
    }

    #[test]
    #[serial]
    fn release_unpublishes_everything() {
        let _guard = TestRegistryGuard::new();
        let mut driver = SpiDriver::<SimHal>::bind("UNIT", SpiResource::new(7)).unwrap();
        driver.init(SimHal::new().0, true).unwrap();
        assert!(SpiRegistry::lookup_endpoint("UNIT_SPI_7").unwrap().is_some());
        driver.release().unwrap();
        assert!(SpiRegistry::lookup_cntlr("UNIT_SPI_7").unwrap().is_none());
        assert!(SpiRegistry::lookup_endpoint("UNIT_SPI_7").unwrap().is_none());
        assert!(driver.cntlr().is_none());
        assert_eq!(driver.init(SimHal::new().0, false), Err(SpiError::InvalidObject));
    }
}
