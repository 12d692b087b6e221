//! Pressure guard: running-average shutoff signal.
//!
//! Each guarded transducer keeps an exponential moving average of its
//! calibrated reading:
//!
//! ```text
//! avg' = avg * 0.95 + calibrated * 0.05
//! ```
//!
//! seeded at the configured nominal pressure so the first few samples
//! cannot trip the shutoff.  After every update the shared
//! `pressure_shutoff` flag is recomputed as "any guarded average is
//! outside its bounds".  The flag is a level: it clears on its own once
//! the average is back inside the window.

use heapless::Vec;
use log::{info, trace, warn};

use crate::safety::SafetyState;
use crate::sensors::{MAX_GROUP_SENSORS, PressureLimits, Sensor, SensorSpec};

/// Weight kept from the previous average.
pub const AVG_RETAIN: f64 = 0.95;
/// Weight given to the new sample.
pub const AVG_WEIGHT: f64 = 0.05;

#[derive(Debug, Clone, Copy)]
struct Channel {
    sensor: Sensor,
    limits: PressureLimits,
    avg: f64,
    out_of_bounds: bool,
}

/// Per-group pressure filter.  Owned by the PT sampling thread.
#[derive(Debug, Clone)]
pub struct PressureGuard {
    channels: Vec<Channel, MAX_GROUP_SENSORS>,
}

impl PressureGuard {
    /// Guard every spec that carries [`PressureLimits`].  Returns `None` if
    /// none do.
    pub fn for_sensors(specs: &[SensorSpec]) -> Option<Self> {
        let mut channels = Vec::new();
        for spec in specs {
            if let Some(limits) = spec.pressure {
                // Group size is bounded by MAX_GROUP_SENSORS.
                let _ = channels.push(Channel {
                    sensor: spec.sensor,
                    limits,
                    avg: limits.nominal,
                    out_of_bounds: false,
                });
            }
        }
        (!channels.is_empty()).then_some(Self { channels })
    }

    /// Whether `sensor` feeds this guard.
    pub fn guards(&self, sensor: Sensor) -> bool {
        self.channels.iter().any(|c| c.sensor == sensor)
    }

    /// Current running average for `sensor`.
    pub fn average(&self, sensor: Sensor) -> Option<f64> {
        self.channels
            .iter()
            .find(|c| c.sensor == sensor)
            .map(|c| c.avg)
    }

    /// Fold one raw reading into the average and republish the shutoff
    /// level.  Readings from unguarded sensors are ignored.  Returns the
    /// new average.
    pub fn update(&mut self, sensor: Sensor, raw: u16, safety: &SafetyState) -> Option<f64> {
        let ch = self.channels.iter_mut().find(|c| c.sensor == sensor)?;
        let calibrated = ch.limits.calibrate(raw);
        ch.avg = ch.avg * AVG_RETAIN + calibrated * AVG_WEIGHT;
        let was_out = ch.out_of_bounds;
        ch.out_of_bounds = !ch.limits.in_bounds(ch.avg);
        let avg = ch.avg;
        trace!("{} raw {raw} -> {calibrated:.1}, avg {avg:.1}", sensor.name());

        match (was_out, ch.out_of_bounds) {
            (false, true) => warn!(
                "{} running average {:.1} outside [{:.1}, {:.1}]",
                sensor.name(),
                avg,
                ch.limits.min,
                ch.limits.max
            ),
            (true, false) => info!("{} running average {:.1} back in bounds", sensor.name(), avg),
            _ => {}
        }

        safety.set_pressure_shutoff(self.shutoff());
        Some(avg)
    }

    /// True if any guarded average is out of bounds.
    pub fn shutoff(&self) -> bool {
        self.channels.iter().any(|c| c.out_of_bounds)
    }
}
