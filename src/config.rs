// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Board configuration loaded from TOML.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::registry::DEFAULT_SERVICE_PREFIX;
use crate::resource::{ModeFlags, PinMap, SpiResource, TransferMode};

/// Errors produced while loading a board configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed board config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("bus {0} declared twice")]
    DuplicateBus(u32),
    #[error("bus {0}: max_speed_hz must be non-zero")]
    ZeroSpeed(u32),
    #[error("bus {bus}: bits_per_word {bits} outside 1..=32")]
    WordSize { bus: u32, bits: u8 },
    #[error("bus {0}: num_cs must be non-zero")]
    NoChipSelect(u32),
    #[error("bus {bus}: cs_index {cs_index} not below num_cs {num_cs}")]
    ChipSelectRange { bus: u32, cs_index: u32, num_cs: u32 },
    #[error("bus {bus}: software chip-select drives one pin but num_cs is {num_cs}")]
    SoftCsShared { bus: u32, num_cs: u32 },
}

fn default_transfer_mode() -> TransferMode {
    TransferMode::Polling
}

fn default_bits() -> u8 {
    8
}

fn default_num_cs() -> u32 {
    1
}

fn default_timeout_ms() -> u64 {
    1000
}

/// One `[[bus]]` table.
#[derive(Debug, Deserialize, Clone)]
pub struct BusEntry {
    pub bus_num: u32,
    pub max_speed_hz: u32,
    #[serde(default = "default_transfer_mode")]
    pub transfer_mode: TransferMode,
    #[serde(default)]
    pub mode: u16,
    #[serde(default = "default_bits")]
    pub bits_per_word: u8,
    #[serde(default)]
    pub cs_soft: bool,
    #[serde(default)]
    pub cs_index: u32,
    #[serde(default = "default_num_cs")]
    pub num_cs: u32,
    /// Completion timeout; `0` waits forever.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub pins: PinMap,
}

impl BusEntry {
    fn validate(&self) -> Result<(), ConfigError> {
        let bus = self.bus_num;
        if self.max_speed_hz == 0 {
            return Err(ConfigError::ZeroSpeed(bus));
        }
        if !(1..=32).contains(&self.bits_per_word) {
            return Err(ConfigError::WordSize {
                bus,
                bits: self.bits_per_word,
            });
        }
        if self.num_cs == 0 {
            return Err(ConfigError::NoChipSelect(bus));
        }
        if self.cs_index >= self.num_cs {
            return Err(ConfigError::ChipSelectRange {
                bus,
                cs_index: self.cs_index,
                num_cs: self.num_cs,
            });
        }
        if self.cs_soft && self.num_cs > 1 {
            return Err(ConfigError::SoftCsShared {
                bus,
                num_cs: self.num_cs,
            });
        }
        Ok(())
    }

    /// Resource descriptor for this bus.
    #[must_use]
    pub fn to_resource(&self) -> SpiResource {
        SpiResource {
            bus_num: self.bus_num,
            max_speed_hz: self.max_speed_hz,
            transfer_mode: self.transfer_mode,
            mode: ModeFlags::from_bits_retain(self.mode),
            bits_per_word: self.bits_per_word,
            cs_soft: self.cs_soft,
            cs_index: self.cs_index,
            num_cs: self.num_cs,
            pins: self.pins,
            timeout: match self.timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawBoard {
    #[serde(default)]
    service_prefix: Option<String>,
    #[serde(default)]
    bus: Vec<BusEntry>,
}

/// Validated board description.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Prefix of every service name on this board.
    pub service_prefix: String,
    /// Buses in declaration order.
    pub buses: Vec<SpiResource>,
}

impl BoardConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawBoard = toml::from_str(text)?;
        let mut seen = BTreeSet::new();
        let mut buses = Vec::with_capacity(raw.bus.len());
        for entry in &raw.bus {
            if !seen.insert(entry.bus_num) {
                return Err(ConfigError::DuplicateBus(entry.bus_num));
            }
            entry.validate()?;
            buses.push(entry.to_resource());
        }
        Ok(Self {
            service_prefix: raw
                .service_prefix
                .unwrap_or_else(|| DEFAULT_SERVICE_PREFIX.to_string()),
            buses,
        })
    }

    /// Read and validate the board file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
