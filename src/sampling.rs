//! Periodic sampling loop, one per sensor group.
//!
//! ```text
//!  ┌────────────┐  read_raw_sample   ┌──────────────┐  push   ┌────────────┐
//!  │ SampleReader├──────────────────▶│ SamplingLoop ├────────▶│ RingBuffer │ (one per sensor)
//!  └────────────┘                    └──────┬───────┘         └─────┬──────┘
//!                                           │ PT only                │ Full
//!                                           ▼                        ▼
//!                                    ┌──────────────┐        ┌────────────────┐
//!                                    │ PressureGuard│        │TelemetryFramer │──▶ DatagramSink
//!                                    └──────┬───────┘        └────────────────┘
//!                                           ▼
//!                                   SafetyState.pressure_shutoff
//! ```
//!
//! The loop owns every buffer it fills, so producer and consumer are the
//! same thread and no buffer is ever locked.  The only shared state it
//! touches is the pressure-shutoff flag and the datagram sink.

use std::io;
use std::sync::Arc;

use heapless::Vec;
use log::{debug, trace};

use crate::app::ports::{Clock, DatagramSink, SampleReader, sleep_at_least};
use crate::safety::SafetyState;
use crate::sensors::pressure::PressureGuard;
use crate::sensors::{MAX_GROUP_SENSORS, Sensor, SensorGroup};
use crate::telemetry::{DataItem, PushStatus, SampleBuffer, TelemetryFramer};
use crate::worker::{self, WorkerHandle};

/// Running frame counters for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingStats {
    /// Completed sampling passes over the group.
    pub cycles: u64,
    pub frames_sent: u64,
    pub frames_dropped: u64,
}

pub struct SamplingLoop<R, S, C> {
    group: SensorGroup,
    buffers: Vec<SampleBuffer, MAX_GROUP_SENSORS>,
    guard: Option<PressureGuard>,
    safety: Arc<SafetyState>,
    framer: TelemetryFramer,
    reader: R,
    sink: S,
    clock: C,
    stats: SamplingStats,
}

impl<R, S, C> SamplingLoop<R, S, C>
where
    R: SampleReader,
    S: DatagramSink,
    C: Clock,
{
    /// Build a loop for `group`.  A pressure guard is installed only when
    /// `shutoff_enabled` is set and the group carries calibrated sensors.
    pub fn new(
        group: SensorGroup,
        reader: R,
        sink: S,
        clock: C,
        safety: Arc<SafetyState>,
        shutoff_enabled: bool,
    ) -> Self {
        let guard = if shutoff_enabled {
            PressureGuard::for_sensors(&group.sensors)
        } else {
            None
        };
        let mut buffers = Vec::new();
        for _ in 0..group.sensors.len() {
            // One buffer per sensor; both bounded by MAX_GROUP_SENSORS.
            let _ = buffers.push(SampleBuffer::new());
        }
        Self {
            group,
            buffers,
            guard,
            safety,
            framer: TelemetryFramer::default(),
            reader,
            sink,
            clock,
            stats: SamplingStats::default(),
        }
    }

    pub fn group(&self) -> &SensorGroup {
        &self.group
    }

    pub fn stats(&self) -> SamplingStats {
        self.stats
    }

    pub fn pressure_guard(&self) -> Option<&PressureGuard> {
        self.guard.as_ref()
    }

    /// Items currently buffered for `sensor`, if it belongs to this group.
    pub fn buffered(&self, sensor: Sensor) -> Option<usize> {
        let idx = self.group.sensors.iter().position(|s| s.sensor == sensor)?;
        Some(self.buffers[idx].len())
    }

    /// One pass over the group: read, timestamp, guard, push.  A buffer
    /// that reports Full is framed and sent, then the sample is pushed
    /// into the emptied buffer.
    pub fn sample_once(&mut self) {
        for idx in 0..self.group.sensors.len() {
            let spec = self.group.sensors[idx];
            let reading = self.reader.read_raw_sample(&spec);
            let timestamp = u64::try_from(self.clock.elapsed().as_nanos()).unwrap_or(u64::MAX);

            if let Some(guard) = self.guard.as_mut() {
                guard.update(spec.sensor, reading, &self.safety);
            }

            trace!(target: "telemetry", "{} raw={} t={}", spec.sensor.name(), reading, timestamp);

            let item = DataItem { reading, timestamp };
            if self.buffers[idx].push(item) == PushStatus::Full {
                self.flush(idx);
                // The drain emptied the buffer.
                let _ = self.buffers[idx].push(item);
            }
        }
        self.stats.cycles += 1;
    }

    fn flush(&mut self, idx: usize) {
        let sensor = self.group.sensors[idx].sensor;
        let frame = self.framer.frame(sensor.id(), &mut self.buffers[idx]);
        if self.framer.transmit(&self.sink, sensor.name(), &frame) {
            self.stats.frames_sent += 1;
        } else {
            self.stats.frames_dropped += 1;
        }
    }

    /// Wait out one group period, then sample.  The period is a lower
    /// bound: early wakeups sleep again for the remainder.
    pub fn tick(&mut self) {
        sleep_at_least(&self.clock, self.group.period());
        self.sample_once();
    }

    /// Sample forever at the group rate.
    pub fn run(mut self) -> ! {
        let period = self.group.period();
        debug!(
            "{}: sampling {} sensors every {:?}",
            self.group.name,
            self.group.sensors.len(),
            period
        );
        loop {
            self.tick();
        }
    }
}

impl<R, S, C> SamplingLoop<R, S, C>
where
    R: SampleReader + 'static,
    S: DatagramSink + 'static,
    C: Clock + 'static,
{
    /// Move the loop onto its own thread, named after the group.
    pub fn spawn(self) -> io::Result<WorkerHandle> {
        let name = self.group.name;
        worker::spawn_worker(name, worker::DEFAULT_STACK_KB, move || self.run())
    }
}
