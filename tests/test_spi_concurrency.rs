// CLASSIFICATION: COMMUNITY
// Filename: test_spi_concurrency.rs v0.1
// Date Modified: 2027-09-02
// Author: Lukas Bower

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cohesix_spi::driver::{HwConfig, IrqSignal};
use cohesix_spi::hal::{IrqMode, Level, SimHal, SpiHal, Xfer};
use cohesix_spi::registry::TestRegistryGuard;
use cohesix_spi::{
    DirectHandle, RemoteHandle, SpiCntlr, SpiCntlrMethod, SpiDriver, SpiError, SpiHandle,
    SpiMsg, SpiResource, SpiResult, TransferMode,
};
use serial_test::serial;

const PREFIX: &str = "CONC_TEST";

/// HAL that records when each transfer entered and left the engine.
struct TimingHal {
    spans: Arc<Mutex<Vec<(Instant, Instant)>>>,
}

impl SpiHal for TimingHal {
    fn configure(&mut self, _hw: &HwConfig) -> SpiResult<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> SpiResult<()> {
        Ok(())
    }

    fn set_rate(&mut self, _hz: u32) -> SpiResult<()> {
        Ok(())
    }

    fn select(&mut self, _cs: u32) -> SpiResult<()> {
        Ok(())
    }

    fn set_gpio(&mut self, _pin: u32, _level: Level) -> SpiResult<()> {
        Ok(())
    }

    fn transfer_polled(&mut self, _xfer: Xfer<'_>) -> SpiResult<()> {
        let enter = Instant::now();
        thread::sleep(Duration::from_millis(2));
        let exit = Instant::now();
        self.spans.lock().unwrap().push((enter, exit));
        Ok(())
    }

    fn start_async(&mut self, _xfer: Xfer<'_>, _done: &IrqSignal) -> SpiResult<()> {
        Err(SpiError::NotSupported)
    }
}

#[test]
#[serial]
fn concurrent_transfers_never_overlap() {
    let _ = env_logger::builder().is_test(true).try_init();
    let _guard = TestRegistryGuard::new();
    let spans = Arc::new(Mutex::new(Vec::new()));
    let mut driver = SpiDriver::bind(PREFIX, SpiResource::new(20)).unwrap();
    driver
        .init(
            TimingHal {
                spans: spans.clone(),
            },
            false,
        )
        .unwrap();

    let workers: Vec<_> = (0..2)
        .map(|_| {
            thread::spawn(|| {
                let handle = DirectHandle::open_with_prefix(PREFIX, 20, 0).unwrap();
                for _ in 0..10 {
                    handle.write(&[0x5A; 8]).unwrap();
                }
                handle.close().unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let mut spans = spans.lock().unwrap().clone();
    assert_eq!(spans.len(), 20);
    spans.sort_by_key(|(enter, _)| *enter);
    for pair in spans.windows(2) {
        assert!(pair[1].0 >= pair[0].1, "transfers overlapped");
    }
}

/// Method table with no locking of its own; counts callers inside `transfer`.
#[derive(Default)]
struct Unlocked {
    inside: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl SpiCntlrMethod for Unlocked {
    fn transfer(&self, _cs: u32, _msgs: &mut [SpiMsg<'_>]) -> SpiResult<()> {
        let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(2));
        self.inside.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn controller_lock_serialises_unlocked_driver() {
    let method = Arc::new(Unlocked::default());
    let cntlr = Arc::new(SpiCntlr::new(25, 2));
    cntlr.attach(Box::new(method.clone())).unwrap();

    let workers: Vec<_> = (0..2)
        .map(|cs| {
            let cntlr = cntlr.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    cntlr
                        .transfer(cs, &mut [SpiMsg::write(&[0xA5; 4])])
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(method.calls.load(Ordering::SeqCst), 20);
    assert_eq!(method.peak.load(Ordering::SeqCst), 1, "transfers overlapped");
    assert!(cntlr.is_idle());
}

fn dma_bus(bus: u32, timeout: Duration, irq: IrqMode, remote: bool) -> SpiDriver<SimHal> {
    let mut res = SpiResource::new(bus);
    res.transfer_mode = TransferMode::Dma;
    res.timeout = Some(timeout);
    let mut driver = SpiDriver::bind(PREFIX, res).unwrap();
    let (hal, probe) = SimHal::new();
    probe.set_irq_mode(irq);
    driver.init(hal, remote).unwrap();
    driver
}

#[test]
#[serial]
fn lost_dma_completion_times_out() {
    let _ = env_logger::builder().is_test(true).try_init();
    let _guard = TestRegistryGuard::new();
    let timeout = Duration::from_millis(60);
    let driver = dma_bus(21, timeout, IrqMode::Dropped, false);
    let handle = DirectHandle::open_with_prefix(PREFIX, 21, 0).unwrap();
    let started = Instant::now();
    assert_eq!(handle.write(&[1, 2, 3]), Err(SpiError::Timeout));
    let elapsed = started.elapsed();
    assert!(elapsed >= timeout);
    assert!(elapsed < timeout + Duration::from_secs(2));
    assert!(driver.cntlr().unwrap().is_idle());
}

#[test]
#[serial]
fn lost_dma_completion_times_out_remotely() {
    let _guard = TestRegistryGuard::new();
    let timeout = Duration::from_millis(40);
    let _driver = dma_bus(22, timeout, IrqMode::Dropped, true);
    let handle = RemoteHandle::open_with_prefix(PREFIX, 22, 0).unwrap();
    let mut buf = [0u8; 2];
    assert_eq!(handle.read(&mut buf), Err(SpiError::Timeout));
}

#[test]
#[serial]
fn delayed_dma_completion_is_awaited() {
    let _guard = TestRegistryGuard::new();
    let _driver = dma_bus(
        23,
        Duration::from_secs(2),
        IrqMode::Delayed(Duration::from_millis(20)),
        false,
    );
    let handle = DirectHandle::open_with_prefix(PREFIX, 23, 0).unwrap();
    for _ in 0..3 {
        handle.write(&[0xC3]).unwrap();
    }
}

#[test]
#[serial]
fn irq_signal_reaches_waiting_transfer() {
    let _guard = TestRegistryGuard::new();
    let driver = dma_bus(24, Duration::from_secs(2), IrqMode::Dropped, false);
    let irq = driver.irq_signal().unwrap();
    let handle = DirectHandle::open_with_prefix(PREFIX, 24, 0).unwrap();
    let poster = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        irq.post();
    });
    handle.write(&[0x0F]).unwrap();
    poster.join().unwrap();
}
