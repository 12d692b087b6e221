//! Blackboard threaded through every sequencer state handler.
//!
//! The sequencer fills the input half (time and the two safety flags)
//! before each tick; handlers write the output half (queued pin levels,
//! burn outcome, flag-clear request) which the sequencer applies after
//! the tick.

use core::time::Duration;

use embedded_hal::digital::PinState;
use heapless::Vec;
use log::warn;

use super::gitvc::GitvcSequence;
use crate::app::profile::EngineProfile;
use crate::config::ControllerConfig;

/// Pin writes one tick may queue.
pub const MAX_PENDING_WRITES: usize = 8;

/// Burn timing, all measured from the moment the igniter is energized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnTiming {
    /// Igniter on to main valve open.
    pub preignite: Duration,
    /// Igniter on to burn end.
    pub hotflow: Duration,
    /// Igniter on to the point where a pressure shutoff may end the burn.
    pub shutoff_arm: Duration,
    /// Sequencer poll interval.
    pub poll: Duration,
}

impl BurnTiming {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            preignite: Duration::from_millis(config.worker.preignite_ms),
            hotflow: Duration::from_millis(config.worker.hotflow_ms),
            shutoff_arm: Duration::from_millis(config.pressure.shutoff_arm_ms),
            poll: Duration::from_millis(config.worker.poll_ms),
        }
    }
}

/// Why a burn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurnOutcome {
    /// Ran for the full hotflow duration.
    Completed,
    /// The ignition flag was cleared mid-burn.
    Aborted,
    /// The armed pressure guard tripped.
    PressureShutoff,
}

pub struct BurnContext {
    // -- Inputs (written by the sequencer before each tick) --
    /// Time since process start.
    pub now: Duration,
    pub ignition_active: bool,
    pub pressure_shutoff: bool,

    // -- Configuration --
    pub profile: EngineProfile,
    pub timing: BurnTiming,

    // -- Burn state --
    /// `now` when the igniter was energized.
    pub t0: Duration,
    pub outcome: Option<BurnOutcome>,
    pub gitvc: Option<GitvcSequence>,

    // -- Outputs (applied by the sequencer after each tick) --
    writes: Vec<(u8, PinState), MAX_PENDING_WRITES>,
    /// Ask the sequencer to clear `ignition_active`.
    pub clear_ignition: bool,
}

impl BurnContext {
    pub fn new(profile: EngineProfile, timing: BurnTiming) -> Self {
        Self {
            now: Duration::ZERO,
            ignition_active: false,
            pressure_shutoff: false,
            profile,
            timing,
            t0: Duration::ZERO,
            outcome: None,
            gitvc: None,
            writes: Vec::new(),
            clear_ignition: false,
        }
    }

    /// Time since the igniter was energized.
    pub fn burn_elapsed(&self) -> Duration {
        self.now.saturating_sub(self.t0)
    }

    /// Queue a pin write, applied in order after the tick.
    pub fn write(&mut self, pin: u8, level: PinState) {
        if self.writes.push((pin, level)).is_err() {
            warn!("Sequencer write queue full, dropping pin {pin} -> {level:?}");
        }
    }

    /// Hand the queued writes to the caller and empty the queue.
    pub fn take_writes(&mut self) -> Vec<(u8, PinState), MAX_PENDING_WRITES> {
        core::mem::take(&mut self.writes)
    }

    /// Reason to end the burn early, if any.  A pressure shutoff only
    /// counts once the arm delay has passed.
    pub fn abort_reason(&self) -> Option<BurnOutcome> {
        if !self.ignition_active {
            Some(BurnOutcome::Aborted)
        } else if self.pressure_shutoff && self.burn_elapsed() >= self.timing.shutoff_arm {
            Some(BurnOutcome::PressureShutoff)
        } else {
            None
        }
    }
}
