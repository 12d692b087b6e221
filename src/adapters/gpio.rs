//! GPIO adapter for valve relays, igniter, drivers and ADC chip selects.
//!
//! Wraps any set of `embedded_hal::digital::OutputPin`s keyed by BCM pin
//! id and exposes them through [`DigitalOutput`].  Each pin sits behind
//! its own mutex so writes from the dispatcher and the sequencer never
//! contend on unrelated pins.

use std::sync::{Mutex, PoisonError};

use embedded_hal::digital::{OutputPin, PinState};
use log::{debug, warn};

use crate::app::ports::DigitalOutput;
use crate::app::profile::EngineProfile;
use crate::pins;

pub struct GpioBank<P> {
    pins: Vec<(u8, Mutex<P>)>,
}

impl<P: OutputPin + Send> GpioBank<P> {
    pub fn new() -> Self {
        Self { pins: Vec::new() }
    }

    /// Register `pin` under BCM id `id`.  A repeated id replaces the
    /// earlier pin.
    pub fn with_pin(mut self, id: u8, pin: P) -> Self {
        self.pins.retain(|(existing, _)| *existing != id);
        self.pins.push((id, Mutex::new(pin)));
        self
    }

    pub fn is_mapped(&self, id: u8) -> bool {
        self.pins.iter().any(|(existing, _)| *existing == id)
    }

    /// Startup pin state: mapped ADC chip selects deselected (HIGH),
    /// every engine output at its profile safe level, every driver off.
    pub fn drive_safe_defaults(&self, profile: &EngineProfile) {
        for cs in pins::ADC_CHIP_SELECTS {
            if self.is_mapped(cs) {
                self.write_pin(cs, PinState::High);
            }
        }
        for &(pin, level) in profile.safe_levels() {
            self.write_pin(pin, level);
        }
        for pin in pins::DRIVER_PINS {
            self.write_pin(pin, PinState::Low);
        }
        debug!("GPIO safe defaults applied for {}", profile.name());
    }
}

impl<P: OutputPin + Send> Default for GpioBank<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: OutputPin + Send> DigitalOutput for GpioBank<P> {
    fn write_pin(&self, pin: u8, level: PinState) {
        let Some((_, slot)) = self.pins.iter().find(|(id, _)| *id == pin) else {
            warn!("GPIO{pin} is not mapped, write of {level:?} dropped");
            return;
        };
        let mut out = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.set_state(level) {
            warn!("GPIO{pin} write {level:?} failed: {e:?}");
        }
    }
}
