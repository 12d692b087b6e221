//! MCP3208 ADC adapter.
//!
//! One `embedded_hal::spi::SpiDevice` per chip select; the device owns
//! CS assertion, this module owns the conversion protocol:
//!
//! ```text
//!   MOSI: 0x18|ch   0x00      0x00
//!   MISO:   --    [.. b11..b6] [b5..b0 ..]
//!   value = ((rx[1] << 8) | rx[2]) >> 2, masked to 12 bits
//! ```
//!
//! The chips share one bus, so one bank-wide mutex serializes every
//! conversion.  A bus error or unknown chip select returns
//! [`ADC_FAULT`], which flows into telemetry unchanged.

use std::sync::{Mutex, PoisonError};

use embedded_hal::spi::SpiDevice;
use log::warn;

use crate::app::ports::SampleReader;
use crate::sensors::{AdcAddress, SensorSpec};

/// Reading reported when a conversion fails.  Outside the 12-bit range.
pub const ADC_FAULT: u16 = 0xFFFF;

/// Start bit + single-ended mode; OR in the channel.
const CMD_SINGLE_ENDED: u8 = 0x18;
const RESOLUTION_MASK: u16 = 0x0FFF;

/// Command frame for a single-ended read of `channel`.
pub fn command_frame(channel: u8) -> [u8; 3] {
    [CMD_SINGLE_ENDED | (channel & 0x07), 0, 0]
}

/// Extract the 12-bit conversion from a response frame.
pub fn decode_response(rx: &[u8; 3]) -> u16 {
    (u16::from_be_bytes([rx[1], rx[2]]) >> 2) & RESOLUTION_MASK
}

pub struct AdcBank<SPI> {
    chips: Mutex<Vec<(u8, SPI)>>,
}

impl<SPI: SpiDevice + Send> AdcBank<SPI> {
    pub fn new() -> Self {
        Self {
            chips: Mutex::new(Vec::new()),
        }
    }

    /// Register the SPI device selected by GPIO `cs_pin`.
    pub fn with_chip(self, cs_pin: u8, device: SPI) -> Self {
        let mut chips = self.chips.into_inner().unwrap_or_else(PoisonError::into_inner);
        chips.retain(|(existing, _)| *existing != cs_pin);
        chips.push((cs_pin, device));
        Self {
            chips: Mutex::new(chips),
        }
    }

    pub fn read(&self, address: AdcAddress) -> u16 {
        let mut chips = self.chips.lock().unwrap_or_else(PoisonError::into_inner);
        let Some((_, device)) = chips.iter_mut().find(|(cs, _)| *cs == address.cs_pin) else {
            warn!("No ADC on chip select GPIO{}", address.cs_pin);
            return ADC_FAULT;
        };
        let tx = command_frame(address.channel);
        let mut rx = [0u8; 3];
        match device.transfer(&mut rx, &tx) {
            Ok(()) => decode_response(&rx),
            Err(e) => {
                warn!(
                    "ADC GPIO{} ch{} transfer failed: {e:?}",
                    address.cs_pin, address.channel
                );
                ADC_FAULT
            }
        }
    }
}

impl<SPI: SpiDevice + Send> Default for AdcBank<SPI> {
    fn default() -> Self {
        Self::new()
    }
}

impl<SPI: SpiDevice + Send> SampleReader for AdcBank<SPI> {
    fn read_raw_sample(&self, sensor: &SensorSpec) -> u16 {
        self.read(sensor.address)
    }
}
