//! Host simulation adapters.
//!
//! - [`SimAdc`] returns injected per-sensor raw values; sensors with no
//!   injected value read a free-running counter, so telemetry shows
//!   motion on a bench with no stand attached.
//! - [`SimPins`] remembers the last level written to every GPIO and logs
//!   each write.

use std::sync::atomic::{AtomicU8, AtomicU16, AtomicU32, Ordering};

use embedded_hal::digital::PinState;
use log::info;

use crate::app::ports::{DigitalOutput, SampleReader};
use crate::sensors::{Sensor, SensorSpec};

/// Marks a sensor with no injected value.
const UNSET: u32 = u32::MAX;

/// Highest BCM GPIO id tracked.
pub const SIM_PIN_COUNT: usize = 28;

const LEVEL_UNKNOWN: u8 = 0;
const LEVEL_LOW: u8 = 1;
const LEVEL_HIGH: u8 = 2;

pub struct SimAdc {
    values: [AtomicU32; Sensor::ALL.len()],
    counter: AtomicU16,
}

impl Default for SimAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl SimAdc {
    pub fn new() -> Self {
        Self {
            values: core::array::from_fn(|_| AtomicU32::new(UNSET)),
            counter: AtomicU16::new(0),
        }
    }

    /// Pin `sensor` to a fixed raw reading.
    pub fn set(&self, sensor: Sensor, raw: u16) {
        self.values[usize::from(sensor.id())].store(u32::from(raw), Ordering::Release);
    }

    /// Return `sensor` to counter mode.
    pub fn clear(&self, sensor: Sensor) {
        self.values[usize::from(sensor.id())].store(UNSET, Ordering::Release);
    }
}

impl SampleReader for SimAdc {
    fn read_raw_sample(&self, spec: &SensorSpec) -> u16 {
        let injected = self.values[usize::from(spec.sensor.id())].load(Ordering::Acquire);
        match u16::try_from(injected) {
            Ok(raw) => raw,
            // 12-bit counter, like a real conversion.
            Err(_) => self.counter.fetch_add(1, Ordering::Relaxed) & 0x0FFF,
        }
    }
}

pub struct SimPins {
    levels: [AtomicU8; SIM_PIN_COUNT],
}

impl Default for SimPins {
    fn default() -> Self {
        Self::new()
    }
}

impl SimPins {
    pub fn new() -> Self {
        Self {
            levels: core::array::from_fn(|_| AtomicU8::new(LEVEL_UNKNOWN)),
        }
    }

    /// Last level written to `pin`, or `None` if never written.
    pub fn level(&self, pin: u8) -> Option<PinState> {
        match self.levels.get(usize::from(pin))?.load(Ordering::Acquire) {
            LEVEL_LOW => Some(PinState::Low),
            LEVEL_HIGH => Some(PinState::High),
            _ => None,
        }
    }
}

impl DigitalOutput for SimPins {
    fn write_pin(&self, pin: u8, level: PinState) {
        let Some(slot) = self.levels.get(usize::from(pin)) else {
            log::warn!("SIM GPIO{pin} out of range");
            return;
        };
        let encoded = match level {
            PinState::Low => LEVEL_LOW,
            PinState::High => LEVEL_HIGH,
        };
        slot.store(encoded, Ordering::Release);
        info!("SIM GPIO{pin} <- {level:?}");
    }
}
