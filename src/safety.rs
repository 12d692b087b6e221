//! Process-wide safety flags.
//!
//! The only state written by more than one thread:
//!
//! | Flag              | Set by                      | Cleared by                          | Read by    |
//! |-------------------|-----------------------------|-------------------------------------|------------|
//! | `ignition_active` | dispatcher (`StartIgnition`)| sequencer (burn end), `StopIgnition`| sequencer  |
//! | `pressure_shutoff`| pressure guard              | pressure guard, `StartIgnition`     | sequencer  |
//!
//! No invariant spans both flags, so each is an independent atomic and no
//! lock is needed.  Constructed once in `main` and shared via `Arc`.

use core::sync::atomic::{AtomicBool, Ordering};

use log::{error, info};

#[derive(Debug, Default)]
pub struct SafetyState {
    ignition_active: AtomicBool,
    pressure_shutoff: AtomicBool,
}

impl SafetyState {
    /// Both flags start false.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignition_active(&self) -> bool {
        self.ignition_active.load(Ordering::Acquire)
    }

    /// Raise the ignition flag.  Returns `false` if a burn was already in
    /// flight (the flag was already set).
    pub fn request_ignition(&self) -> bool {
        self.ignition_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clear the ignition flag.  Returns the previous value.
    pub fn clear_ignition(&self) -> bool {
        self.ignition_active.swap(false, Ordering::AcqRel)
    }

    pub fn pressure_shutoff(&self) -> bool {
        self.pressure_shutoff.load(Ordering::Acquire)
    }

    /// Store the shutoff level, logging only on an edge.
    pub fn set_pressure_shutoff(&self, shutoff: bool) {
        let was = self.pressure_shutoff.swap(shutoff, Ordering::AcqRel);
        if shutoff && !was {
            error!("PRESSURE SHUTOFF SET");
        } else if !shutoff && was {
            info!("Pressure returned to nominal");
        }
    }
}
