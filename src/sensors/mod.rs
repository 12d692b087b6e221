//! Sensor catalogue and sensor groups.
//!
//! The stand carries a fixed set of sensors: four load cells, four
//! pressure transducers, and three thermocouples, read through MCP3208
//! ADCs on the SPI bus.  Sensors of one type are sampled together by one
//! thread at one rate: a [`SensorGroup`].

pub mod pressure;

use core::time::Duration;

use heapless::Vec;
use log::warn;

use crate::config::ControllerConfig;
use crate::pins;

/// Most sensors one group may hold.
pub const MAX_GROUP_SENSORS: usize = 8;

/// Every sensor on the stand.  The discriminant is the telemetry sensor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Sensor {
    Lc1 = 0,
    Lc2 = 1,
    Lc3 = 2,
    Lc4 = 3,
    /// Combustion-chamber transducer.
    Pt1 = 4,
    Pt2 = 5,
    Pt3 = 6,
    Pt4 = 7,
    Tc1 = 8,
    Tc2 = 9,
    Tc3 = 10,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    LoadCell,
    PressureTransducer,
    Thermocouple,
}

/// Where a sensor lives on the SPI bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdcAddress {
    /// Chip-select GPIO of the ADC.
    pub cs_pin: u8,
    /// Single-ended input channel, 0–7.
    pub channel: u8,
}

impl Sensor {
    pub const ALL: [Sensor; 11] = [
        Self::Lc1,
        Self::Lc2,
        Self::Lc3,
        Self::Lc4,
        Self::Pt1,
        Self::Pt2,
        Self::Pt3,
        Self::Pt4,
        Self::Tc1,
        Self::Tc2,
        Self::Tc3,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Lc1 => "LC1",
            Self::Lc2 => "LC2",
            Self::Lc3 => "LC3",
            Self::Lc4 => "LC4",
            Self::Pt1 => "PT1",
            Self::Pt2 => "PT2",
            Self::Pt3 => "PT3",
            Self::Pt4 => "PT4",
            Self::Tc1 => "TC1",
            Self::Tc2 => "TC2",
            Self::Tc3 => "TC3",
        }
    }

    pub fn kind(self) -> SensorKind {
        match self {
            Self::Lc1 | Self::Lc2 | Self::Lc3 | Self::Lc4 => SensorKind::LoadCell,
            Self::Pt1 | Self::Pt2 | Self::Pt3 | Self::Pt4 => SensorKind::PressureTransducer,
            Self::Tc1 | Self::Tc2 | Self::Tc3 => SensorKind::Thermocouple,
        }
    }

    /// Wiring of the stand's ADC harness.
    pub fn address(self) -> AdcAddress {
        let (cs_pin, channel) = match self {
            Self::Lc1 => (pins::LC_ADC, 0),
            Self::Lc2 => (pins::LC_ADC, 1),
            Self::Lc3 => (pins::LC_ADC, 2),
            Self::Lc4 => (pins::LC_ADC, 3),
            Self::Pt1 => (pins::PT_ADC, 3),
            Self::Pt2 => (pins::PT_ADC, 2),
            Self::Pt3 => (pins::PT_ADC, 1),
            Self::Pt4 => (pins::PT_ADC, 0),
            Self::Tc1 => (pins::TC_ADC, 4),
            Self::Tc2 => (pins::TC_ADC, 5),
            Self::Tc3 => (pins::TC_ADC, 6),
        };
        AdcAddress { cs_pin, channel }
    }
}

/// Linear calibration plus safety window for a guarded pressure sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureLimits {
    pub slope: f64,
    pub intercept: f64,
    pub min: f64,
    pub max: f64,
    /// Initial value of the running average.
    pub nominal: f64,
}

impl PressureLimits {
    pub fn calibrate(&self, raw: u16) -> f64 {
        self.slope * f64::from(raw) + self.intercept
    }

    pub fn in_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Immutable description of one sensor as configured at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSpec {
    pub sensor: Sensor,
    pub address: AdcAddress,
    /// Present only for transducers that feed the pressure guard.
    pub pressure: Option<PressureLimits>,
}

impl SensorSpec {
    pub fn new(sensor: Sensor) -> Self {
        Self {
            sensor,
            address: sensor.address(),
            pressure: None,
        }
    }

    pub fn with_pressure(mut self, limits: PressureLimits) -> Self {
        self.pressure = Some(limits);
        self
    }
}

/// A set of same-type sensors sampled together at one rate.
#[derive(Debug, Clone)]
pub struct SensorGroup {
    pub name: &'static str,
    pub frequency_hz: u32,
    pub sensors: Vec<SensorSpec, MAX_GROUP_SENSORS>,
}

impl SensorGroup {
    /// Keeps the first [`MAX_GROUP_SENSORS`] specs; the rest are dropped
    /// with a warning.
    pub fn new(name: &'static str, frequency_hz: u32, sensors: &[SensorSpec]) -> Self {
        if sensors.len() > MAX_GROUP_SENSORS {
            let dropped: std::vec::Vec<&str> = sensors[MAX_GROUP_SENSORS..]
                .iter()
                .map(|s| s.sensor.name())
                .collect();
            warn!(
                "{name} group holds at most {MAX_GROUP_SENSORS} sensors; dropping {}",
                dropped.join(", ")
            );
        }
        let mut group = Vec::new();
        for spec in sensors.iter().take(MAX_GROUP_SENSORS) {
            // Bounded by `take`.
            let _ = group.push(*spec);
        }
        Self {
            name,
            frequency_hz,
            sensors: group,
        }
    }

    /// Time between samples.  `frequency_hz` is validated non-zero.
    pub fn period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.frequency_hz.max(1)))
    }

    /// The load-cell, pressure, and thermocouple groups.  PT1 carries the
    /// `Pressure` calibration; the rest report raw counts.
    pub fn standard_groups(config: &ControllerConfig) -> [SensorGroup; 3] {
        let p = &config.pressure;
        let combustion = PressureLimits {
            slope: p.slope,
            intercept: p.yint,
            min: p.pressure_min,
            max: p.pressure_max,
            nominal: p.nominal,
        };

        [
            Self::new(
                "Load Cell Thread",
                config.sampling.lc_hz,
                &[
                    SensorSpec::new(Sensor::Lc1),
                    SensorSpec::new(Sensor::Lc2),
                    SensorSpec::new(Sensor::Lc3),
                    SensorSpec::new(Sensor::Lc4),
                ],
            ),
            Self::new(
                "Pressure Transducer Thread",
                config.sampling.pt_hz,
                &[
                    SensorSpec::new(Sensor::Pt1).with_pressure(combustion),
                    SensorSpec::new(Sensor::Pt2),
                    SensorSpec::new(Sensor::Pt3),
                    SensorSpec::new(Sensor::Pt4),
                ],
            ),
            Self::new(
                "Thermocouple Thread",
                config.sampling.tc_hz,
                &[
                    SensorSpec::new(Sensor::Tc1),
                    SensorSpec::new(Sensor::Tc2),
                    SensorSpec::new(Sensor::Tc3),
                ],
            ),
        ]
    }
}
