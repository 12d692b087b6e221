//! Operator commands received over the TCP command channel.
//!
//! One byte per command, no framing, no reply.  The opcode space is
//! 0–31:
//!
//! | Opcode  | Command                                  |
//! |---------|------------------------------------------|
//! | 0–13    | `2k` = unset driver k, `2k+1` = set it   |
//! | 14      | stop ignition                            |
//! | 15      | start ignition                           |
//! | 16–19   | leak-check, fill, fill-idle, default     |
//! | 20–21   | heating tape on / off                    |
//! | 22–25   | water on / off, GITVC on / off           |
//! | 26–31   | reserved                                 |
//!
//! ASCII `'0'` (48) ends the session and never reaches the dispatcher.

use core::fmt;

use crate::pins::DRIVER_COUNT;

/// Byte that closes a command session.
pub const SESSION_END: u8 = b'0';

/// Decoded operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetDriver(u8),
    UnsetDriver(u8),
    StopIgnition,
    StartIgnition,
    LeakCheck,
    Fill,
    FillIdle,
    Default,
    TapeOn,
    TapeOff,
    SetWater,
    UnsetWater,
    SetGitvc,
    UnsetGitvc,
}

/// A byte outside the known opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCommand(pub u8);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command opcode {}", self.0)
    }
}

const DRIVER_OPCODES: u8 = (DRIVER_COUNT * 2) as u8;

impl Command {
    pub fn from_byte(byte: u8) -> Result<Self, UnknownCommand> {
        let cmd = match byte {
            b if b < DRIVER_OPCODES && b % 2 == 0 => Self::UnsetDriver(b / 2),
            b if b < DRIVER_OPCODES => Self::SetDriver(b / 2),
            14 => Self::StopIgnition,
            15 => Self::StartIgnition,
            16 => Self::LeakCheck,
            17 => Self::Fill,
            18 => Self::FillIdle,
            19 => Self::Default,
            20 => Self::TapeOn,
            21 => Self::TapeOff,
            22 => Self::SetWater,
            23 => Self::UnsetWater,
            24 => Self::SetGitvc,
            25 => Self::UnsetGitvc,
            other => return Err(UnknownCommand(other)),
        };
        Ok(cmd)
    }

    pub fn opcode(self) -> u8 {
        match self {
            Self::UnsetDriver(k) => k * 2,
            Self::SetDriver(k) => k * 2 + 1,
            Self::StopIgnition => 14,
            Self::StartIgnition => 15,
            Self::LeakCheck => 16,
            Self::Fill => 17,
            Self::FillIdle => 18,
            Self::Default => 19,
            Self::TapeOn => 20,
            Self::TapeOff => 21,
            Self::SetWater => 22,
            Self::UnsetWater => 23,
            Self::SetGitvc => 24,
            Self::UnsetGitvc => 25,
        }
    }

    /// Operator-facing name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::SetDriver(_) => "SET_DRIVER",
            Self::UnsetDriver(_) => "UNSET_DRIVER",
            Self::StopIgnition => "STOP_IGNITION",
            Self::StartIgnition => "START_IGNITION",
            Self::LeakCheck => "LEAK_CHECK",
            Self::Fill => "FILL",
            Self::FillIdle => "FILL_IDLE",
            Self::Default => "DEF",
            Self::TapeOn => "TAPE_ON",
            Self::TapeOff => "TAPE_OFF",
            Self::SetWater => "SET_WATER",
            Self::UnsetWater => "UNSET_WATER",
            Self::SetGitvc => "SET_GITVC",
            Self::UnsetGitvc => "UNSET_GITVC",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = UnknownCommand;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte)
    }
}
