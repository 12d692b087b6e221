//! Command dispatcher, the operator-facing core.
//!
//! Decodes opcode bytes and turns them into pin writes and safety-flag
//! changes.  Engine presets are matched on the active [`EngineProfile`];
//! everything else falls through to the shared base table.
//!
//! ```text
//!  opcode byte ──▶ Command ──▶ ┌──────────────────────┐ ──▶ DigitalOutput
//!                              │  CommandDispatcher   │
//!                              │ base · Luna · Titan  │ ──▶ SafetyState
//!                              └──────────────────────┘
//! ```
//!
//! Nothing here blocks on the burn: `StartIgnition` raises the flag and
//! returns, the sequencer thread does the rest.

use std::sync::Arc;

use embedded_hal::digital::PinState::{self, High, Low};
use log::{info, warn};

use super::commands::{Command, UnknownCommand};
use super::ports::DigitalOutput;
use super::profile::EngineProfile;
use crate::pins;
use crate::safety::SafetyState;

/// What became of a dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Pins written and/or flags changed.
    Applied,
    /// Valid command with nothing to do (burn already in flight, or not
    /// meaningful for the active profile).
    Ignored,
}

pub struct CommandDispatcher<O> {
    profile: EngineProfile,
    safety: Arc<SafetyState>,
    outputs: O,
}

impl<O: DigitalOutput> CommandDispatcher<O> {
    pub fn new(profile: EngineProfile, safety: Arc<SafetyState>, outputs: O) -> Self {
        Self {
            profile,
            safety,
            outputs,
        }
    }

    pub fn profile(&self) -> &EngineProfile {
        &self.profile
    }

    /// Decode and dispatch one opcode byte.  An unknown byte is logged
    /// and changes nothing.
    pub fn handle_byte(&self, byte: u8) -> Result<Dispatch, UnknownCommand> {
        match Command::from_byte(byte) {
            Ok(cmd) => Ok(self.handle(cmd)),
            Err(e) => {
                warn!("Ignoring {e}");
                Err(e)
            }
        }
    }

    pub fn handle(&self, cmd: Command) -> Dispatch {
        info!("Command {} ({})", cmd.name(), cmd.opcode());
        match (&self.profile, cmd) {
            (EngineProfile::Titan, preset) if is_titan_preset(preset) => self.titan(preset),
            (EngineProfile::Luna { .. }, preset) if is_luna_preset(preset) => self.luna(preset),
            (_, cmd) => self.base(cmd),
        }
    }

    // ── Shared base table ──────────────────────────────────────

    fn base(&self, cmd: Command) -> Dispatch {
        match cmd {
            Command::SetDriver(k) => self.driver(k, High),
            Command::UnsetDriver(k) => self.driver(k, Low),
            Command::StartIgnition => {
                if !self.safety.request_ignition() {
                    warn!("Burn already in flight, START_IGNITION ignored");
                    return Dispatch::Ignored;
                }
                self.safety.set_pressure_shutoff(false);
                info!("Ignition requested");
                Dispatch::Applied
            }
            Command::StopIgnition => {
                let was_active = self.safety.clear_ignition();
                self.write(self.profile.ignition_pin(), Low);
                self.write(self.profile.main_valve_pin(), Low);
                if was_active {
                    warn!("Ignition stopped by operator");
                }
                Dispatch::Applied
            }
            preset => {
                warn!(
                    "{} is not available on the {} profile",
                    preset.name(),
                    self.profile.name()
                );
                Dispatch::Ignored
            }
        }
    }

    fn driver(&self, k: u8, level: PinState) -> Dispatch {
        match pins::DRIVER_PINS.get(usize::from(k)) {
            Some(&pin) => {
                self.write(pin, level);
                Dispatch::Applied
            }
            None => {
                warn!("No driver {k}");
                Dispatch::Ignored
            }
        }
    }

    // ── Titan presets ──────────────────────────────────────────

    fn titan(&self, cmd: Command) -> Dispatch {
        let (label, writes): (&str, &[(u8, PinState)]) = match cmd {
            Command::LeakCheck => (
                "leak check",
                &[
                    (pins::MAIN_VALVE, High),
                    (pins::VENT_VALVE, High),
                    (pins::TANK_VALVE, High),
                ],
            ),
            Command::Fill => (
                "fill",
                &[
                    (pins::MAIN_VALVE, High),
                    (pins::VENT_VALVE, High),
                    (pins::TANK_VALVE, Low),
                ],
            ),
            Command::FillIdle => (
                "fill idle",
                &[
                    (pins::MAIN_VALVE, Low),
                    (pins::VENT_VALVE, High),
                    (pins::TANK_VALVE, High),
                ],
            ),
            Command::Default => (
                "default",
                &[
                    (pins::MAIN_VALVE, Low),
                    (pins::VENT_VALVE, Low),
                    (pins::TANK_VALVE, High),
                ],
            ),
            Command::TapeOn => ("heating tape on", &[(pins::HEATING_TAPE, High)]),
            Command::TapeOff => ("heating tape off", &[(pins::HEATING_TAPE, Low)]),
            Command::SetWater => ("vent open", &[(pins::VENT_VALVE, Low)]),
            Command::UnsetWater => ("vent closed", &[(pins::VENT_VALVE, High)]),
            other => return self.base(other),
        };
        info!("Titan preset: {label}");
        self.write_all(writes);
        Dispatch::Applied
    }

    // ── Luna presets ───────────────────────────────────────────

    fn luna(&self, cmd: Command) -> Dispatch {
        let (label, pin, level) = match cmd {
            Command::SetWater => ("water on", pins::WATER_VALVE, High),
            Command::UnsetWater => ("water off", pins::WATER_VALVE, Low),
            Command::SetGitvc => ("GITVC on", pins::GITVC_VALVE, Low),
            Command::UnsetGitvc => ("GITVC off", pins::GITVC_VALVE, High),
            other => return self.base(other),
        };
        info!("Luna: {label} (pin {pin})");
        self.write(pin, level);
        Dispatch::Applied
    }

    fn write(&self, pin: u8, level: PinState) {
        self.outputs.write_pin(pin, level);
    }

    fn write_all(&self, writes: &[(u8, PinState)]) {
        for &(pin, level) in writes {
            self.write(pin, level);
        }
    }
}

fn is_titan_preset(cmd: Command) -> bool {
    matches!(
        cmd,
        Command::LeakCheck
            | Command::Fill
            | Command::FillIdle
            | Command::Default
            | Command::TapeOn
            | Command::TapeOff
            | Command::SetWater
            | Command::UnsetWater
    )
}

fn is_luna_preset(cmd: Command) -> bool {
    matches!(
        cmd,
        Command::SetWater | Command::UnsetWater | Command::SetGitvc | Command::UnsetGitvc
    )
}
