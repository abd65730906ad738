// CLASSIFICATION: COMMUNITY
// Filename: resource.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Resource descriptors and the caller-visible SPI configuration.

use std::time::Duration;

use bitflags::bitflags;
use spi_wire::CfgRecord;

use crate::error::{SpiError, SpiResult};

bitflags! {
    /// SPI mode bits. The low two bits encode the classic mode 0-3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModeFlags: u16 {
        /// Sample on the second clock edge.
        const CPHA = 1 << 0;
        /// Clock idles high.
        const CPOL = 1 << 1;
        /// MOSI and MISO share one line.
        const THREE_WIRE = 1 << 2;
        /// Internal loopback.
        const LOOP = 1 << 3;
        /// Least significant bit first.
        const LSB_FIRST = 1 << 4;
        /// No chip-select line is driven.
        const NO_CS = 1 << 5;
        /// Chip-select is active high.
        const CS_HIGH = 1 << 6;
        /// Peripheral may pause the transfer via a ready line.
        const READY = 1 << 7;
    }
}

impl ModeFlags {
    /// Classic SPI mode number (0-3) from the phase/polarity pair.
    #[must_use]
    pub fn mode_number(self) -> u8 {
        (self.bits() & 0x3) as u8
    }
}

/// How the bottom half moves bytes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Interrupt driven, completion signalled by the controller IRQ.
    Interrupt = 0,
    /// Synchronous polled I/O.
    Polling = 1,
    /// DMA with completion signalled by the DMA IRQ.
    Dma = 2,
}

impl TryFrom<u8> for TransferMode {
    type Error = SpiError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TransferMode::Interrupt),
            1 => Ok(TransferMode::Polling),
            2 => Ok(TransferMode::Dma),
            _ => Err(SpiError::InvalidParam),
        }
    }
}

/// Pin numbers for the four SPI signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
pub struct PinMap {
    /// Clock pin.
    pub clk: u32,
    /// Controller-out pin.
    pub mosi: u32,
    /// Controller-in pin.
    pub miso: u32,
    /// Chip-select pin.
    pub cs: u32,
}

/// Parsed configuration of one logical SPI bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiResource {
    /// Bus number, also the controller identity.
    pub bus_num: u32,
    /// Clock speed in Hz.
    pub max_speed_hz: u32,
    /// Transfer method.
    pub transfer_mode: TransferMode,
    /// Mode bit flags.
    pub mode: ModeFlags,
    /// Word size in bits.
    pub bits_per_word: u8,
    /// Chip-select is driven as a GPIO by software.
    pub cs_soft: bool,
    /// Hardware chip-select line selected while the bus is idle.
    pub cs_index: u32,
    /// Number of chip-selects addressable through the controller.
    pub num_cs: u32,
    /// Pin assignments.
    pub pins: PinMap,
    /// Completion timeout for interrupt and DMA transfers; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl SpiResource {
    /// Minimal polled resource, mostly useful for tests and tooling.
    #[must_use]
    pub fn new(bus_num: u32) -> Self {
        Self {
            bus_num,
            max_speed_hz: 1_000_000,
            transfer_mode: TransferMode::Polling,
            mode: ModeFlags::empty(),
            bits_per_word: 8,
            cs_soft: false,
            cs_index: 0,
            num_cs: 1,
            pins: PinMap::default(),
            timeout: Some(Duration::from_millis(1000)),
        }
    }

    /// Caller-visible subset of the resource.
    #[must_use]
    pub fn cfg(&self) -> SpiCfg {
        SpiCfg {
            max_speed_hz: self.max_speed_hz,
            mode: self.mode,
            transfer_mode: self.transfer_mode,
            bits_per_word: self.bits_per_word,
        }
    }

    /// Replace the caller-visible fields after validating them.
    pub fn apply_cfg(&mut self, cfg: &SpiCfg) -> SpiResult<()> {
        cfg.validate()?;
        self.max_speed_hz = cfg.max_speed_hz;
        self.mode = cfg.mode;
        self.transfer_mode = cfg.transfer_mode;
        self.bits_per_word = cfg.bits_per_word;
        Ok(())
    }
}

/// Controller configuration exchanged through Get/SetCfg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiCfg {
    /// Maximum clock speed in Hz.
    pub max_speed_hz: u32,
    /// Mode bit flags.
    pub mode: ModeFlags,
    /// Transfer method.
    pub transfer_mode: TransferMode,
    /// Word size in bits.
    pub bits_per_word: u8,
}

impl SpiCfg {
    /// Reject configurations no bottom half can honour.
    pub fn validate(&self) -> SpiResult<()> {
        if self.max_speed_hz == 0 || !(1..=32).contains(&self.bits_per_word) {
            return Err(SpiError::InvalidParam);
        }
        Ok(())
    }

    /// Wire image of the configuration.
    #[must_use]
    pub fn to_record(&self) -> CfgRecord {
        CfgRecord {
            max_speed_hz: self.max_speed_hz,
            mode: self.mode.bits(),
            transfer_mode: self.transfer_mode as u8,
            bits_per_word: self.bits_per_word,
        }
    }

    /// Rebuild a configuration from its wire image. Unknown mode bits are kept.
    pub fn from_record(record: &CfgRecord) -> SpiResult<Self> {
        Ok(Self {
            max_speed_hz: record.max_speed_hz,
            mode: ModeFlags::from_bits_retain(record.mode),
            transfer_mode: TransferMode::try_from(record.transfer_mode)?,
            bits_per_word: record.bits_per_word,
        })
    }
}
