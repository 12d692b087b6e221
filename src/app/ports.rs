//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SamplingLoop / Dispatcher / Sequencer
//! ```
//!
//! Driven adapters (ADC, GPIO, UDP, clock) implement these traits.  The
//! domain consumes them via generics behind `Arc`, so the sampling and
//! sequencer threads never touch hardware directly.
//!
//! Every port takes `&self`: each is shared by several threads and does
//! its own internal serialization where the hardware needs it.

use core::time::Duration;

use embedded_hal::digital::PinState;

use crate::error::CommsError;
use crate::sensors::SensorSpec;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one raw ADC conversion per call.
pub trait SampleReader: Send + Sync {
    /// Raw conversion for `sensor`.  On a hardware fault this returns a
    /// sentinel value rather than failing; callers pass it through.
    fn read_raw_sample(&self, sensor: &SensorSpec) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Digital output port (driven adapter: domain → valves / igniter)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget GPIO writes.  Writes are idempotent.
pub trait DigitalOutput: Send + Sync {
    fn write_pin(&self, pin: u8, level: PinState);
}

// ───────────────────────────────────────────────────────────────
// Telemetry port (driven adapter: domain → network)
// ───────────────────────────────────────────────────────────────

/// Datagram transport for telemetry frames.
///
/// Called concurrently from every sampling thread.  Implementations MUST
/// serialize sends so that two frames never interleave.
pub trait DatagramSink: Send + Sync {
    fn send(&self, frame: &[u8]) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source shared by every loop.
pub trait Clock: Send + Sync {
    /// Time since process start.  Never goes backwards.
    fn elapsed(&self) -> Duration;

    /// Block for roughly `duration`.  May return early.
    fn sleep(&self, duration: Duration);
}

impl<T: SampleReader + ?Sized> SampleReader for std::sync::Arc<T> {
    fn read_raw_sample(&self, sensor: &SensorSpec) -> u16 {
        (**self).read_raw_sample(sensor)
    }
}

impl<T: DigitalOutput + ?Sized> DigitalOutput for std::sync::Arc<T> {
    fn write_pin(&self, pin: u8, level: PinState) {
        (**self).write_pin(pin, level);
    }
}

impl<T: DatagramSink + ?Sized> DatagramSink for std::sync::Arc<T> {
    fn send(&self, frame: &[u8]) -> Result<(), CommsError> {
        (**self).send(frame)
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn elapsed(&self) -> Duration {
        (**self).elapsed()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Sleep until at least `period` has elapsed on `clock`, re-sleeping for
/// the remainder after every early wakeup.  The period is a lower bound.
pub fn sleep_at_least(clock: &impl Clock, period: Duration) {
    let deadline = clock.elapsed() + period;
    loop {
        let now = clock.elapsed();
        if now >= deadline {
            return;
        }
        clock.sleep(deadline - now);
    }
}
