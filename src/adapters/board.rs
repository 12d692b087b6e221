//! Raspberry Pi wiring for the real stand.
//!
//! Outputs are GPIO character-device lines wrapped in `CdevPin`.  The
//! MCP3208s share `/dev/spidev0.0` with the kernel chip select disabled;
//! each chip gets its own bus handle and a GPIO chip-select line through
//! `embedded-hal-bus`'s `ExclusiveDevice`.  The kernel must not claim
//! GPIO7/GPIO8 as CE lines (`dtoverlay=spi0-0cs`).
//!
//! Only the line layout is host-testable; opening devices needs the
//! `hardware` feature.

use embedded_hal::digital::PinState;

use crate::app::profile::EngineProfile;
use crate::pins;

pub const GPIO_CHIP: &str = "/dev/gpiochip0";
pub const SPI_BUS: &str = "/dev/spidev0.0";
/// MCP3208 clock.  Faster starves the sample-and-hold capacitor.
pub const SPI_HZ: u32 = 244_000;
/// Consumer label on requested GPIO lines.
pub const CONSUMER: &str = "resfet";

/// Every line the controller drives as a plain output.  ADC chip selects
/// belong to the SPI devices and are not listed.
pub fn output_lines() -> Vec<u8> {
    let mut lines = vec![
        pins::IGN_START,
        pins::VALVE1,
        pins::VALVE2,
        pins::VALVE3,
        pins::HEATING_TAPE,
    ];
    lines.extend(pins::DRIVER_PINS);
    lines
}

/// Level a line is requested at, so it never glitches through the wrong
/// state before `drive_safe_defaults` runs.
pub fn initial_level(profile: &EngineProfile, line: u8) -> PinState {
    profile
        .safe_levels()
        .iter()
        .find(|(pin, _)| *pin == line)
        .map_or(PinState::Low, |&(_, level)| level)
}

#[cfg(feature = "hardware")]
pub use linux::{BoardAdc, BoardPins, open};

#[cfg(feature = "hardware")]
mod linux {
    use embedded_hal::digital::PinState;
    use embedded_hal_bus::spi::ExclusiveDevice;
    use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
    use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
    use linux_embedded_hal::{CdevPin, Delay, SpidevBus};
    use log::info;

    use super::{CONSUMER, GPIO_CHIP, SPI_BUS, SPI_HZ, initial_level, output_lines};
    use crate::adapters::adc::AdcBank;
    use crate::adapters::gpio::GpioBank;
    use crate::app::profile::EngineProfile;
    use crate::error::HardwareError;
    use crate::pins;

    pub type BoardPins = GpioBank<CdevPin>;
    pub type BoardAdc = AdcBank<ExclusiveDevice<SpidevBus, CdevPin, Delay>>;

    fn request(chip: &mut Chip, line: u8, level: PinState) -> Result<CdevPin, HardwareError> {
        let gpio = |e: &dyn core::fmt::Debug| HardwareError::Gpio {
            line,
            reason: format!("{e:?}"),
        };
        let default = u8::from(level == PinState::High);
        let handle = chip
            .get_line(u32::from(line))
            .and_then(|l| l.request(LineRequestFlags::OUTPUT, default, CONSUMER))
            .map_err(|e| gpio(&e))?;
        CdevPin::new(handle).map_err(|e| gpio(&e))
    }

    fn open_bus() -> Result<SpidevBus, HardwareError> {
        let spi = |e: &dyn core::fmt::Debug| HardwareError::Spi {
            path: SPI_BUS.to_string(),
            reason: format!("{e:?}"),
        };
        let mut bus = SpidevBus::open(SPI_BUS).map_err(|e| spi(&e))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_HZ)
            .mode(SpiModeFlags::SPI_MODE_3 | SpiModeFlags::SPI_NO_CS)
            .build();
        bus.configure(&options).map_err(|e| spi(&e))?;
        Ok(bus)
    }

    /// Claim every output line and ADC, then drive the profile's safe
    /// levels.
    pub fn open(profile: &EngineProfile) -> Result<(BoardAdc, BoardPins), HardwareError> {
        let mut chip = Chip::new(GPIO_CHIP).map_err(|e| HardwareError::Gpio {
            line: 0,
            reason: format!("{GPIO_CHIP}: {e:?}"),
        })?;

        let mut outputs = GpioBank::new();
        for line in output_lines() {
            let pin = request(&mut chip, line, initial_level(profile, line))?;
            outputs = outputs.with_pin(line, pin);
        }
        outputs.drive_safe_defaults(profile);

        let mut adc = AdcBank::new();
        for cs in pins::ADC_CHIP_SELECTS {
            let select = request(&mut chip, cs, PinState::High)?;
            let device = ExclusiveDevice::new(open_bus()?, select, Delay).map_err(|e| {
                HardwareError::Gpio {
                    line: cs,
                    reason: format!("{e:?}"),
                }
            })?;
            adc = adc.with_chip(cs, device);
        }

        info!(
            "Board open: {} outputs on {GPIO_CHIP}, {} ADCs on {SPI_BUS}",
            output_lines().len(),
            pins::ADC_CHIP_SELECTS.len()
        );
        Ok((adc, outputs))
    }
}
