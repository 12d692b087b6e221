//! Error types for the engine controller.
//!
//! One small enum per subsystem.  The binary folds them into `anyhow`
//! at startup.  ADC read faults are absent: a bad conversion is a
//! sentinel value that flows into telemetry, not an error.

use core::fmt;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file could not be read.
    Io(String),
    /// The INI text does not parse.
    Malformed(String),
    /// The requested section/key pair does not exist.
    KeyNotFound { section: String, key: String },
    /// The value exists but does not parse as the requested type.
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
    /// A parsed value is outside its permitted range.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "cannot read config: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed config: {msg}"),
            Self::KeyNotFound { section, key } => {
                write!(f, "key `{key}` not found in section `{section}`")
            }
            Self::InvalidValue {
                section,
                key,
                value,
            } => write!(f, "invalid value `{value}` for {section}.{key}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommsError {
    /// The datagram could not be handed to the network stack.
    SendFailed(String),
    /// The socket sent fewer bytes than the frame holds.
    ShortWrite { sent: usize, expected: usize },
    /// A socket could not be created or bound.
    BindFailed(String),
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed(msg) => write!(f, "send failed: {msg}"),
            Self::ShortWrite { sent, expected } => {
                write!(f, "short write: {sent} of {expected} bytes")
            }
            Self::BindFailed(msg) => write!(f, "bind failed: {msg}"),
        }
    }
}

impl std::error::Error for CommsError {}

// ---------------------------------------------------------------------------
// Board errors
// ---------------------------------------------------------------------------

/// Opening the real GPIO/SPI devices failed.  Fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareError {
    Gpio { line: u8, reason: String },
    Spi { path: String, reason: String },
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpio { line, reason } => write!(f, "GPIO{line}: {reason}"),
            Self::Spi { path, reason } => write!(f, "{path}: {reason}"),
        }
    }
}

impl std::error::Error for HardwareError {}

// ---------------------------------------------------------------------------
// Telemetry frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than a header, or than the header's declared length.
    Truncated { needed: usize, available: usize },
    /// The declared payload length is not a whole number of items.
    Misaligned(u16),
    /// The output buffer cannot hold even an empty frame.
    BufferTooSmall(usize),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(f, "truncated: need {needed} bytes, have {available}")
            }
            Self::Misaligned(len) => write!(f, "payload length {len} is not item-aligned"),
            Self::BufferTooSmall(len) => write!(f, "output buffer of {len} bytes too small"),
        }
    }
}

impl std::error::Error for FrameError {}
