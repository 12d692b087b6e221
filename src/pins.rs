//! GPIO pin assignments for the Raspberry Pi test-stand controller.
//!
//! Single source of truth: every driver, preset, and the ignition
//! sequencer references this module rather than hard-coding pin numbers.
//! Numbers are BCM GPIO ids; the P1 header position is noted alongside.

// ---------------------------------------------------------------------------
// ADC chip selects (MCP3208, active LOW, driven manually)
// ---------------------------------------------------------------------------

/// P1-26.
pub const ADC_0_CS: u8 = 7;
/// P1-24.  Pressure transducers and thermocouples.
pub const ADC_1_CS: u8 = 8;
/// P1-22.  Load cells.
pub const ADC_2_CS: u8 = 25;

pub const LC_ADC: u8 = ADC_2_CS;
pub const PT_ADC: u8 = ADC_1_CS;
pub const TC_ADC: u8 = ADC_1_CS;

pub const ADC_CHIP_SELECTS: [u8; 3] = [ADC_0_CS, ADC_1_CS, ADC_2_CS];

// ---------------------------------------------------------------------------
// Valve relays and igniter
// ---------------------------------------------------------------------------

/// P1-11.
pub const VALVE1: u8 = 17;
/// P1-13.
pub const VALVE2: u8 = 27;
/// P1-16.
pub const VALVE3: u8 = 23;
/// P1-15.  Igniter relay.
pub const IGN_START: u8 = 22;

/// Main propellant valve on every engine.
pub const MAIN_VALVE: u8 = VALVE1;

// Luna
/// Water valve.  HIGH = open.
pub const WATER_VALVE: u8 = VALVE2;
/// Gimbal-injection thrust vector control valve.  Active LOW.
pub const GITVC_VALVE: u8 = VALVE3;

// Titan
/// Ground vent valve.  LOW = open.
pub const VENT_VALVE: u8 = VALVE2;
/// Tank isolation valve.  HIGH = closed.
pub const TANK_VALVE: u8 = VALVE3;
/// Oxidiser heating tape relay (P1-18).
pub const HEATING_TAPE: u8 = 24;

// ---------------------------------------------------------------------------
// Generic driver channels (relay board, dispatcher-owned)
// ---------------------------------------------------------------------------

/// Number of generic drivers addressable by `Set/UnsetDriverK`.
pub const DRIVER_COUNT: usize = 7;

/// Driver K is wired to `DRIVER_PINS[K]`.  Disjoint from every pin the
/// ignition sequencer drives.
pub const DRIVER_PINS: [u8; DRIVER_COUNT] = [5, 6, 12, 13, 19, 26, 16];
