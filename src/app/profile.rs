//! Engine profiles: which valves exist and how they behave.
//!
//! A closed set of variants selected once at startup from
//! `Main.engine_type`.  The dispatcher matches on the variant for preset
//! commands; the sequencer asks it for the levels that open and end a burn.

use core::time::Duration;

use embedded_hal::digital::PinState;
use heapless::Vec;
use log::warn;

use crate::config::LunaConfig;
use crate::pins;

/// Maximum GITVC pulses in one burn.
pub const MAX_GITVC_PULSES: usize = 16;

/// Timed GITVC actuation plan for a Luna burn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitvcPlan {
    /// Main-valve-open to first pulse.
    pub wait: Duration,
    /// OFF gap between pulses.
    pub between: Duration,
    /// ON duration of each pulse, in order.
    pub pulses: Vec<Duration, MAX_GITVC_PULSES>,
}

impl GitvcPlan {
    pub fn from_config(luna: &LunaConfig) -> Self {
        let mut pulses = Vec::new();
        for &ms in &luna.gitvc_times_ms {
            if pulses.push(Duration::from_millis(u64::from(ms))).is_err() {
                warn!("GITVC plan truncated to {MAX_GITVC_PULSES} pulses");
                break;
            }
        }
        Self {
            wait: Duration::from_millis(u64::from(luna.gitvc_wait_ms)),
            between: Duration::from_millis(u64::from(luna.time_between_gitvc_ms)),
            pulses,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineProfile {
    /// Drivers and ignition only; no engine presets.
    Generic,
    /// Water-cooled hybrid with optional GITVC pulsing during the burn.
    Luna { gitvc: Option<GitvcPlan> },
    /// Self-pressurising nitrous engine with vent/tank/heating-tape presets.
    Titan,
}

impl EngineProfile {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generic => "Generic",
            Self::Luna { .. } => "Luna",
            Self::Titan => "Titan",
        }
    }

    pub fn ignition_pin(&self) -> u8 {
        pins::IGN_START
    }

    /// Valve the operator's StopIgnition closes alongside the igniter.
    pub fn main_valve_pin(&self) -> u8 {
        pins::MAIN_VALVE
    }

    /// Valve levels written when the preignite delay ends and the burn
    /// proper begins.  Titan burns by opening the vent and closing the
    /// tank with the main valve shut.
    pub fn burn_open_levels(&self) -> &'static [(u8, PinState)] {
        match self {
            Self::Generic | Self::Luna { .. } => &[(pins::MAIN_VALVE, PinState::High)],
            Self::Titan => &[
                (pins::MAIN_VALVE, PinState::Low),
                (pins::VENT_VALVE, PinState::Low),
                (pins::TANK_VALVE, PinState::High),
            ],
        }
    }

    /// Levels written, in order, when a burn ends for any reason.  A main
    /// valve close always precedes the igniter.  Titan's burn valve state
    /// is already its default, so only the igniter changes.
    pub fn burn_end_levels(&self) -> &'static [(u8, PinState)] {
        match self {
            Self::Generic => &[
                (pins::MAIN_VALVE, PinState::Low),
                (pins::IGN_START, PinState::Low),
            ],
            Self::Luna { .. } => &[
                (pins::MAIN_VALVE, PinState::Low),
                (pins::IGN_START, PinState::Low),
                (pins::GITVC_VALVE, PinState::High),
                (pins::WATER_VALVE, PinState::Low),
            ],
            Self::Titan => &[(pins::IGN_START, PinState::Low)],
        }
    }

    /// Levels that make every engine output inert.  Driven once at startup.
    pub fn safe_levels(&self) -> &'static [(u8, PinState)] {
        match self {
            Self::Generic => &[
                (pins::IGN_START, PinState::Low),
                (pins::MAIN_VALVE, PinState::Low),
            ],
            Self::Luna { .. } => &[
                (pins::IGN_START, PinState::Low),
                (pins::MAIN_VALVE, PinState::Low),
                (pins::WATER_VALVE, PinState::Low),
                (pins::GITVC_VALVE, PinState::High),
            ],
            Self::Titan => &[
                (pins::IGN_START, PinState::Low),
                (pins::MAIN_VALVE, PinState::Low),
                (pins::VENT_VALVE, PinState::Low),
                (pins::TANK_VALVE, PinState::High),
                (pins::HEATING_TAPE, PinState::Low),
            ],
        }
    }
}
