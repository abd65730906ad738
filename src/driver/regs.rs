// CLASSIFICATION: COMMUNITY
// Filename: regs.rs v0.1
// Author: Lukas Bower
// Date Modified: 2027-09-02

//! Translation of a resource descriptor into a controller register image.

use crate::resource::{ModeFlags, SpiResource, TransferMode};

/// Function a pin is muxed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinFunction {
    /// Serial clock.
    SpiClk,
    /// Controller out.
    SpiMosi,
    /// Controller in.
    SpiMiso,
    /// Hardware chip-select.
    SpiCs,
    /// Plain GPIO output.
    Gpio,
    /// Left unmuxed.
    Unused,
}

/// One pin-mux entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinAssignment {
    /// Pin number.
    pub pin: u32,
    /// Selected function.
    pub function: PinFunction,
}

/// Who drives chip-select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsControl {
    /// The controller drives hardware line `cs`, for `cs < lines`.
    Hardware {
        /// Line selected while the bus is idle.
        default: u32,
        /// Number of hardware lines.
        lines: u32,
    },
    /// The bottom half toggles a GPIO.
    Software {
        /// GPIO number.
        pin: u32,
        /// Chip-select asserts high.
        active_high: bool,
    },
    /// No chip-select line.
    None,
}

/// Register image programmed through [`crate::hal::SpiHal::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HwConfig {
    /// Bus number.
    pub bus_num: u32,
    /// Serial clock rate.
    pub rate_hz: u32,
    /// Clock idles high.
    pub cpol: bool,
    /// Sample on the second edge.
    pub cpha: bool,
    /// Word size.
    pub word_bits: u8,
    /// LSB first.
    pub lsb_first: bool,
    /// Internal loopback.
    pub loopback: bool,
    /// Half-duplex on one data line.
    pub three_wire: bool,
    /// Transmit DMA request enabled.
    pub dma_tx: bool,
    /// Receive DMA request enabled.
    pub dma_rx: bool,
    /// Transfer-complete interrupt enabled.
    pub irq_enable: bool,
    /// Chip-select ownership.
    pub cs: CsControl,
    /// Pin-mux for clock, MOSI, MISO and CS, in that order.
    pub pins: [PinAssignment; 4],
}

impl HwConfig {
    /// Build the register image for `res`.
    #[must_use]
    pub fn from_resource(res: &SpiResource) -> Self {
        let dma = res.transfer_mode == TransferMode::Dma;
        let cs = if res.mode.contains(ModeFlags::NO_CS) {
            CsControl::None
        } else if res.cs_soft {
            CsControl::Software {
                pin: res.pins.cs,
                active_high: res.mode.contains(ModeFlags::CS_HIGH),
            }
        } else {
            CsControl::Hardware {
                default: res.cs_index,
                lines: res.num_cs,
            }
        };
        let cs_function = match cs {
            CsControl::Hardware { .. } => PinFunction::SpiCs,
            CsControl::Software { .. } => PinFunction::Gpio,
            CsControl::None => PinFunction::Unused,
        };
        let three_wire = res.mode.contains(ModeFlags::THREE_WIRE);
        Self {
            bus_num: res.bus_num,
            rate_hz: res.max_speed_hz,
            cpol: res.mode.contains(ModeFlags::CPOL),
            cpha: res.mode.contains(ModeFlags::CPHA),
            word_bits: res.bits_per_word,
            lsb_first: res.mode.contains(ModeFlags::LSB_FIRST),
            loopback: res.mode.contains(ModeFlags::LOOP),
            three_wire,
            dma_tx: dma,
            dma_rx: dma,
            irq_enable: res.transfer_mode != TransferMode::Polling,
            cs,
            pins: [
                PinAssignment {
                    pin: res.pins.clk,
                    function: PinFunction::SpiClk,
                },
                PinAssignment {
                    pin: res.pins.mosi,
                    function: PinFunction::SpiMosi,
                },
                PinAssignment {
                    pin: res.pins.miso,
                    function: if three_wire {
                        PinFunction::Unused
                    } else {
                        PinFunction::SpiMiso
                    },
                },
                PinAssignment {
                    pin: res.pins.cs,
                    function: cs_function,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::PinMap;

    fn resource() -> SpiResource {
        let mut res = SpiResource::new(2);
        res.pins = PinMap {
            clk: 4,
            mosi: 5,
            miso: 6,
            cs: 7,
        };
        res
    }

    #[test]
    fn mode_three_sets_phase_and_polarity() {
        let mut res = resource();
        res.mode = ModeFlags::CPOL | ModeFlags::CPHA;
        let hw = HwConfig::from_resource(&res);
        assert!(hw.cpol && hw.cpha);
        res.mode = ModeFlags::CPHA;
        let hw = HwConfig::from_resource(&res);
        assert!(!hw.cpol && hw.cpha);
    }

    #[test]
    fn dma_mode_enables_both_requests() {
        let mut res = resource();
        res.transfer_mode = TransferMode::Dma;
        let hw = HwConfig::from_resource(&res);
        assert!(hw.dma_tx && hw.dma_rx && hw.irq_enable);
        res.transfer_mode = TransferMode::Polling;
        let hw = HwConfig::from_resource(&res);
        assert!(!hw.dma_tx && !hw.dma_rx && !hw.irq_enable);
    }

    #[test]
    fn software_cs_rebinds_pin_to_gpio() {
        let mut res = resource();
        res.cs_soft = true;
        let hw = HwConfig::from_resource(&res);
        assert_eq!(
            hw.cs,
            CsControl::Software {
                pin: 7,
                active_high: false
            }
        );
        assert_eq!(hw.pins[3].function, PinFunction::Gpio);

        res.cs_soft = false;
        res.cs_index = 1;
        res.num_cs = 2;
        let hw = HwConfig::from_resource(&res);
        assert_eq!(
            hw.cs,
            CsControl::Hardware {
                default: 1,
                lines: 2
            }
        );
        assert_eq!(hw.pins[3].function, PinFunction::SpiCs);
    }

    #[test]
    fn no_cs_leaves_pin_unmuxed() {
        let mut res = resource();
        res.cs_soft = true;
        res.mode = ModeFlags::NO_CS;
        let hw = HwConfig::from_resource(&res);
        assert_eq!(hw.cs, CsControl::None);
        assert_eq!(hw.pins[3].function, PinFunction::Unused);
    }
}
