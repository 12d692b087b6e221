//! Controller configuration.
//!
//! Two layers:
//!
//! - [`ConfigMap`]: the raw section/key/value tree the `config` crate
//!   parses from the INI file handed to the binary.  Typed accessors fail
//!   with [`ConfigError::KeyNotFound`] instead of returning a default.
//! - [`ControllerConfig`]: the validated, typed view built once at
//!   startup.  Everything downstream (sampling threads, sequencer,
//!   dispatcher) takes values from here and never touches the map.
//!
//! File format:
//!
//! ```text
//! # comment
//! [Network]
//! address=192.168.1.50
//! port=8080
//!
//! [Luna]
//! gitvc_times_ms=100, 150, 200
//! ```

use std::path::Path;

use ::config::{Config, File, FileFormat, Map, Source, Value, ValueKind};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::profile::{EngineProfile, GitvcPlan, MAX_GITVC_PULSES};
use crate::error::ConfigError;

// ═══════════════════════════════════════════════════════════════
//  Raw key/value store
// ═══════════════════════════════════════════════════════════════

/// Section → key → value.  Keys that appear before any header are
/// looked up under the section named `""`.  Section and key lookups
/// ignore ASCII case.
#[derive(Debug, Clone)]
pub struct ConfigMap {
    root: Map<String, Value>,
}

impl ConfigMap {
    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.as_ref().display())))?;
        Self::parse(&text)
    }

    /// Parse INI text.  Any syntax error rejects the whole file.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let root = Config::builder()
            .add_source(File::from_str(text, FileFormat::Ini))
            .build()
            .and_then(|c| c.collect())
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;
        Ok(Self { root })
    }

    pub fn is_present(&self, section: &str, key: &str) -> bool {
        self.value(section, key).is_ok()
    }

    fn value(&self, section: &str, key: &str) -> Result<&Value, ConfigError> {
        let table = if section.is_empty() {
            Some(&self.root)
        } else {
            lookup(&self.root, section).and_then(|v| match &v.kind {
                ValueKind::Table(t) => Some(t),
                _ => None,
            })
        };
        table
            .and_then(|t| lookup(t, key))
            .filter(|v| !matches!(v.kind, ValueKind::Table(_)))
            .ok_or_else(|| ConfigError::KeyNotFound {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    pub fn get_string(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        let value = self.value(section, key)?;
        value
            .clone()
            .into_string()
            .map_err(|_| invalid(section, key, &value.to_string()))
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<i64, ConfigError> {
        let value = self.value(section, key)?;
        value
            .clone()
            .into_int()
            .map_err(|_| invalid(section, key, &value.to_string()))
    }

    pub fn get_double(&self, section: &str, key: &str) -> Result<f64, ConfigError> {
        let value = self.value(section, key)?;
        value
            .clone()
            .into_float()
            .map_err(|_| invalid(section, key, &value.to_string()))
    }

    /// Accepts `1/0/true/false/yes/no/on/off`, any case.
    pub fn get_bool(&self, section: &str, key: &str) -> Result<bool, ConfigError> {
        let value = self.value(section, key)?;
        value
            .clone()
            .into_bool()
            .map_err(|_| invalid(section, key, &value.to_string()))
    }

    /// Comma-separated integers.  Empty entries are skipped.
    pub fn get_vector(&self, section: &str, key: &str) -> Result<Vec<i64>, ConfigError> {
        let raw = self.get_string(section, key)?;
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|item| item.parse().map_err(|_| invalid(section, key, item)))
            .collect()
    }
}

/// Exact match first, then ASCII case-insensitive.
fn lookup<'a>(table: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    table.get(name).or_else(|| {
        table
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })
}

fn invalid(section: &str, key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════
//  Typed configuration
// ═══════════════════════════════════════════════════════════════

/// Which engine the stand is plumbed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Generic,
    Luna,
    Titan,
}

impl EngineKind {
    /// Accepts names (any case) and the legacy numerals `0` = Luna,
    /// `1` = Titan, `2` = Generic.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "generic" | "2" => Some(Self::Generic),
            "luna" | "0" => Some(Self::Luna),
            "titan" | "1" => Some(Self::Titan),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Telemetry destination host.
    pub address: String,
    /// Telemetry destination UDP port.
    pub port: u16,
    /// Local interface the command server binds.
    pub listen_address: String,
    /// TCP port the command server listens on.
    pub command_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Igniter-on to main-valve-open delay.
    pub preignite_ms: u64,
    /// Igniter-on to burn end.
    pub hotflow_ms: u64,
    /// Sequencer flag poll interval.
    pub poll_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressureConfig {
    pub pressure_max: f64,
    pub pressure_min: f64,
    /// Calibration: `psi = slope * raw + yint`.
    pub slope: f64,
    pub yint: f64,
    /// Seed for the running average.
    pub nominal: f64,
    /// Time after ignition before a pressure shutoff may end the burn.
    pub shutoff_arm_ms: u64,
    pub shutoff_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub lc_hz: u32,
    pub pt_hz: u32,
    pub tc_hz: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LunaConfig {
    pub use_gitvc: bool,
    /// ON duration of each GITVC pulse.
    pub gitvc_times_ms: Vec<u32>,
    /// Main-valve-open to first pulse.
    pub gitvc_wait_ms: u32,
    /// OFF gap between pulses.
    pub time_between_gitvc_ms: u32,
}

/// Complete controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub network: NetworkConfig,
    pub engine: EngineKind,
    pub worker: WorkerConfig,
    pub pressure: PressureConfig,
    pub sampling: SamplingConfig,
    pub luna: LunaConfig,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            pressure_max: 800.0,
            pressure_min: 300.0,
            slope: -0.3,
            yint: 1108.1,
            nominal: 700.0,
            shutoff_arm_ms: 1000,
            shutoff_enabled: true,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            lc_hz: 2000,
            pt_hz: 500,
            tc_hz: 20,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig {
                address: "127.0.0.1".to_string(),
                port: 8080,
                listen_address: "0.0.0.0".to_string(),
                command_port: 1234,
            },
            engine: EngineKind::Luna,
            worker: WorkerConfig {
                preignite_ms: 500,
                hotflow_ms: 3000,
                poll_ms: 50,
            },
            pressure: PressureConfig::default(),
            sampling: SamplingConfig::default(),
            luna: LunaConfig {
                use_gitvc: false,
                gitvc_times_ms: Vec::new(),
                gitvc_wait_ms: 0,
                time_between_gitvc_ms: 100,
            },
        }
    }
}

/// Highest sampling rate the SPI bus can plausibly sustain.
const MAX_SAMPLE_HZ: u32 = 1_000_000;

impl ControllerConfig {
    /// Build and validate from a parsed map.
    pub fn from_map(map: &ConfigMap) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let network = NetworkConfig {
            address: map.get_string("Network", "address")?,
            port: port(map, "port")?,
            listen_address: optional(
                map,
                "Network",
                "listen_address",
                defaults.network.listen_address,
                ConfigMap::get_string,
            )?,
            command_port: if map.is_present("Network", "command_port") {
                port(map, "command_port")?
            } else {
                defaults.network.command_port
            },
        };

        let engine_raw = map.get_string("Main", "engine_type")?;
        let engine = EngineKind::parse(&engine_raw)
            .ok_or_else(|| invalid("Main", "engine_type", &engine_raw))?;

        let worker = WorkerConfig {
            preignite_ms: millis(map, "Worker", "preignite_ms")?,
            hotflow_ms: millis(map, "Worker", "hotflow_ms")?,
            poll_ms: optional(map, "Worker", "poll_ms", defaults.worker.poll_ms, millis)?,
        };

        let pressure = read_pressure(map)?;

        let sampling = SamplingConfig {
            lc_hz: optional(map, "Sampling", "lc_hz", defaults.sampling.lc_hz, hertz)?,
            pt_hz: optional(map, "Sampling", "pt_hz", defaults.sampling.pt_hz, hertz)?,
            tc_hz: optional(map, "Sampling", "tc_hz", defaults.sampling.tc_hz, hertz)?,
        };

        let luna = LunaConfig {
            use_gitvc: optional(map, "Luna", "use_gitvc", false, ConfigMap::get_bool)?,
            gitvc_times_ms: if map.is_present("Luna", "gitvc_times_ms") {
                map.get_vector("Luna", "gitvc_times_ms")?
                    .into_iter()
                    .map(|v| u32::try_from(v).map_err(|_| invalid("Luna", "gitvc_times_ms", &v.to_string())))
                    .collect::<Result<_, _>>()?
            } else {
                Vec::new()
            },
            gitvc_wait_ms: optional(map, "Luna", "gitvc_wait_ms", 0, u32_value)?,
            time_between_gitvc_ms: optional(
                map,
                "Luna",
                "time_between_gitvc_ms",
                defaults.luna.time_between_gitvc_ms,
                u32_value,
            )?,
        };

        let config = Self {
            network,
            engine,
            worker,
            pressure,
            sampling,
            luna,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a file, parse, and validate in one step.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_map(&ConfigMap::load(path)?)
    }

    /// Reject dangerous or nonsensical values.  Never clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pressure;
        if !(p.pressure_min < p.pressure_max) {
            return Err(ConfigError::ValidationFailed(
                "pressure_min must be below pressure_max",
            ));
        }
        if !(p.slope.is_finite() && p.yint.is_finite() && p.nominal.is_finite()) {
            return Err(ConfigError::ValidationFailed(
                "pressure calibration must be finite",
            ));
        }
        if self.worker.hotflow_ms <= self.worker.preignite_ms {
            return Err(ConfigError::ValidationFailed(
                "hotflow_ms must exceed preignite_ms",
            ));
        }
        if self.worker.poll_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll_ms must be non-zero"));
        }
        if self.luna.gitvc_times_ms.len() > MAX_GITVC_PULSES {
            return Err(ConfigError::ValidationFailed("too many GITVC pulses"));
        }
        for hz in [self.sampling.lc_hz, self.sampling.pt_hz, self.sampling.tc_hz] {
            if hz == 0 || hz > MAX_SAMPLE_HZ {
                return Err(ConfigError::ValidationFailed(
                    "sampling frequency must be within 1 Hz..=1 MHz",
                ));
            }
        }
        Ok(())
    }

    /// The immutable engine profile the dispatcher and sequencer run with.
    pub fn engine_profile(&self) -> EngineProfile {
        match self.engine {
            EngineKind::Generic => EngineProfile::Generic,
            EngineKind::Titan => EngineProfile::Titan,
            EngineKind::Luna => EngineProfile::Luna {
                gitvc: self.luna.use_gitvc.then(|| GitvcPlan::from_config(&self.luna)),
            },
        }
    }
}

// ── Field readers ─────────────────────────────────────────────

fn port(map: &ConfigMap, key: &str) -> Result<u16, ConfigError> {
    let v = map.get_int("Network", key)?;
    u16::try_from(v).map_err(|_| invalid("Network", key, &v.to_string()))
}

fn millis(map: &ConfigMap, section: &str, key: &str) -> Result<u64, ConfigError> {
    let v = map.get_int(section, key)?;
    u64::try_from(v).map_err(|_| invalid(section, key, &v.to_string()))
}

fn hertz(map: &ConfigMap, section: &str, key: &str) -> Result<u32, ConfigError> {
    u32_value(map, section, key)
}

fn u32_value(map: &ConfigMap, section: &str, key: &str) -> Result<u32, ConfigError> {
    let v = map.get_int(section, key)?;
    u32::try_from(v).map_err(|_| invalid(section, key, &v.to_string()))
}

/// Read an optional key; a present but invalid value is still an error.
fn optional<T>(
    map: &ConfigMap,
    section: &str,
    key: &str,
    default: T,
    read: impl Fn(&ConfigMap, &str, &str) -> Result<T, ConfigError>,
) -> Result<T, ConfigError> {
    if map.is_present(section, key) {
        read(map, section, key)
    } else {
        Ok(default)
    }
}

/// The four shutoff constants fall back to defaults as a set, with a
/// warning, when any of them is missing.
fn read_pressure(map: &ConfigMap) -> Result<PressureConfig, ConfigError> {
    let defaults = PressureConfig::default();

    let limits = (|| -> Result<(f64, f64, f64, f64), ConfigError> {
        Ok((
            map.get_double("Pressure", "pressure_max")?,
            map.get_double("Pressure", "pressure_min")?,
            map.get_double("Pressure", "slope")?,
            map.get_double("Pressure", "yint")?,
        ))
    })();

    let (pressure_max, pressure_min, slope, yint) = match limits {
        Ok(v) => v,
        Err(ConfigError::KeyNotFound { key, .. }) => {
            warn!("Pressure.{key} missing; using default shutoff limits");
            (
                defaults.pressure_max,
                defaults.pressure_min,
                defaults.slope,
                defaults.yint,
            )
        }
        Err(e) => return Err(e),
    };

    Ok(PressureConfig {
        pressure_max,
        pressure_min,
        slope,
        yint,
        nominal: optional(map, "Pressure", "nominal", defaults.nominal, ConfigMap::get_double)?,
        shutoff_arm_ms: optional(
            map,
            "Pressure",
            "pressureshutoff_ms",
            defaults.shutoff_arm_ms,
            millis,
        )?,
        shutoff_enabled: optional(
            map,
            "Pressure",
            "shutoff_enabled",
            defaults.shutoff_enabled,
            ConfigMap::get_bool,
        )?,
    })
}
