// CLASSIFICATION: COMMUNITY
// Filename: test_spi_direct.rs v0.1
// Date Modified: 2027-09-02
// Author: Lukas Bower

use cohesix_spi::driver::BusState;
use cohesix_spi::hal::{HalEvent, Level, SimHal, SimProbe};
use cohesix_spi::registry::{TestRegistryGuard, DEFAULT_SERVICE_PREFIX};
use cohesix_spi::resource::PinMap;
use cohesix_spi::{
    DirectHandle, ModeFlags, SpiCfg, SpiDriver, SpiError, SpiHandle, SpiMsg, SpiResource,
    TransferMode,
};
use serial_test::serial;

fn bring_up(resource: SpiResource) -> (SpiDriver<SimHal>, SimProbe) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut driver = SpiDriver::bind(DEFAULT_SERVICE_PREFIX, resource).unwrap();
    let (hal, probe) = SimHal::new();
    driver.init(hal, false).unwrap();
    (driver, probe)
}

#[test]
#[serial]
fn write_only_segment_reaches_hal_once() {
    let _guard = TestRegistryGuard::new();
    let (_driver, probe) = bring_up(SpiResource::new(0));
    let handle = DirectHandle::open(0, 0).unwrap();
    probe.clear();
    handle.write(&[0x01, 0x02, 0x03]).unwrap();
    let writes: Vec<HalEvent> = probe
        .events()
        .into_iter()
        .filter(|e| matches!(e, HalEvent::Write(_)))
        .collect();
    assert_eq!(writes, vec![HalEvent::Write(vec![0x01, 0x02, 0x03])]);
    handle.close().unwrap();
}

#[test]
#[serial]
fn read_only_segment_fills_caller_buffer() {
    let _guard = TestRegistryGuard::new();
    let (_driver, probe) = bring_up(SpiResource::new(1));
    let handle = DirectHandle::open(1, 0).unwrap();
    probe.queue_read(&[0xAA, 0xBB, 0xCC, 0xDD]);
    let mut buf = [0u8; 4];
    handle.read(&mut buf).unwrap();
    assert_eq!(buf, [0xAA, 0xBB, 0xCC, 0xDD]);
}

#[test]
#[serial]
fn software_cs_toggles_between_segments() {
    let _guard = TestRegistryGuard::new();
    let mut res = SpiResource::new(2);
    res.cs_soft = true;
    res.pins = PinMap {
        clk: 20,
        mosi: 21,
        miso: 22,
        cs: 23,
    };
    let (_driver, probe) = bring_up(res);
    let handle = DirectHandle::open(2, 0).unwrap();
    probe.clear();
    probe.queue_read(&[9, 8, 7, 6, 5]);
    let mut rx = [0u8; 5];
    let mut msgs = [
        SpiMsg::write(&[0x10, 0x20]).with_cs_change(true),
        SpiMsg::read(&mut rx),
    ];
    handle.transfer(&mut msgs).unwrap();
    let levels: Vec<Level> = probe
        .events()
        .into_iter()
        .filter_map(|e| match e {
            HalEvent::Gpio { pin: 23, level } => Some(level),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![Level::Low, Level::High, Level::Low, Level::High]);
    assert_eq!(rx, [9, 8, 7, 6, 5]);
}

#[test]
#[serial]
fn cfg_round_trips() {
    let _guard = TestRegistryGuard::new();
    let (_driver, _probe) = bring_up(SpiResource::new(3));
    let handle = DirectHandle::open(3, 0).unwrap();
    let cfg = SpiCfg {
        max_speed_hz: 12_000_000,
        mode: ModeFlags::CPOL | ModeFlags::CPHA | ModeFlags::CS_HIGH,
        transfer_mode: TransferMode::Interrupt,
        bits_per_word: 16,
    };
    handle.set_cfg(&cfg).unwrap();
    assert_eq!(handle.get_cfg().unwrap(), cfg);

    let bad = SpiCfg {
        bits_per_word: 0,
        ..cfg
    };
    assert_eq!(handle.set_cfg(&bad), Err(SpiError::InvalidParam));
    assert_eq!(handle.get_cfg().unwrap(), cfg);
}

#[test]
#[serial]
fn open_close_leaves_controller_idle() {
    let _guard = TestRegistryGuard::new();
    let (driver, _probe) = bring_up(SpiResource::new(4));
    let handle = DirectHandle::open(4, 0).unwrap();
    assert_eq!(driver.bus_state(), Some(BusState::Open));
    handle.close().unwrap();
    assert!(driver.cntlr().unwrap().is_idle());
    assert_eq!(driver.bus_state(), Some(BusState::Closed));
}

#[test]
#[serial]
fn dropped_handle_closes_bus() {
    let _guard = TestRegistryGuard::new();
    let (driver, probe) = bring_up(SpiResource::new(5));
    {
        let _handle = DirectHandle::open(5, 0).unwrap();
        assert_eq!(driver.bus_state(), Some(BusState::Open));
    }
    assert_eq!(driver.bus_state(), Some(BusState::Closed));
    assert!(probe.events().contains(&HalEvent::Shutdown));
}

#[test]
#[serial]
fn open_failures_yield_no_handle() {
    let _guard = TestRegistryGuard::new();
    let (_driver, _probe) = bring_up(SpiResource::new(6));
    assert_eq!(
        DirectHandle::open(60, 0).unwrap_err(),
        SpiError::DeviceNotFound
    );
    assert_eq!(
        DirectHandle::open(6, 1).unwrap_err(),
        SpiError::InvalidParam
    );
}

#[test]
#[serial]
fn empty_transfer_is_invalid() {
    let _guard = TestRegistryGuard::new();
    let (_driver, _probe) = bring_up(SpiResource::new(7));
    let handle = DirectHandle::open(7, 0).unwrap();
    assert_eq!(handle.transfer(&mut []), Err(SpiError::InvalidParam));
}

#[test]
#[serial]
fn hardware_cs_selects_requested_line() {
    let _guard = TestRegistryGuard::new();
    let mut res = SpiResource::new(8);
    res.num_cs = 2;
    res.cs_index = 1;
    let (_driver, probe) = bring_up(res);
    let handle = DirectHandle::open(8, 1).unwrap();
    probe.clear();
    handle.write(&[0x55]).unwrap();
    assert_eq!(probe.events()[0], HalEvent::Select(1));
    handle.close().unwrap();

    let first = DirectHandle::open(8, 0).unwrap();
    probe.clear();
    first.write(&[0x66]).unwrap();
    assert_eq!(probe.events()[0], HalEvent::Select(0));
}
