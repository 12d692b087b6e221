//! Sampling loop tests: frames on the wire and the pressure guard
//! feeding the sequencer.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use embedded_hal::digital::PinState::Low;
use resfet::adapters::time::ManualClock;
use resfet::app::ports::sleep_at_least;
use resfet::app::profile::EngineProfile;
use resfet::config::ControllerConfig;
use resfet::fsm::{BurnOutcome, BurnState, BurnTiming, IgnitionSequencer};
use resfet::pins;
use resfet::safety::SafetyState;
use resfet::sampling::SamplingLoop;
use resfet::sensors::{Sensor, SensorGroup};
use resfet::telemetry::{BUFFER_CAPACITY, FRAME_LEN, decode_frame};

use super::mock_hw::{EarlyWakeClock, MockAdc, MockPins, MockSink};

/// Raw count the default calibration maps to -120 psi.
const RAW_UNDERPRESSURE: u16 = 4095;
/// Raw count the default calibration maps to 700 psi.
const RAW_NOMINAL: u16 = 1361;

fn pt_group() -> SensorGroup {
    let [_, pt, _] = SensorGroup::standard_groups(&ControllerConfig::default());
    pt
}

fn pt_loop(
    adc: &Arc<MockAdc>,
    sink: &Arc<MockSink>,
    clock: &ManualClock,
    safety: &Arc<SafetyState>,
) -> SamplingLoop<Arc<MockAdc>, Arc<MockSink>, ManualClock> {
    SamplingLoop::new(
        pt_group(),
        Arc::clone(adc),
        Arc::clone(sink),
        clock.clone(),
        Arc::clone(safety),
        true,
    )
}

// ── Telemetry ──────────────────────────────────────────────────

#[test]
fn frames_carry_ordered_timestamps_per_sensor() {
    let adc = Arc::new(MockAdc::default());
    adc.set(Sensor::Pt1, RAW_NOMINAL);
    adc.set(Sensor::Pt2, 42);
    let sink = Arc::new(MockSink::default());
    let clock = ManualClock::new();
    let safety = Arc::new(SafetyState::new());
    let mut sl = pt_loop(&adc, &sink, &clock, &safety);
    let period = sl.group().period();

    for _ in 0..=BUFFER_CAPACITY {
        sleep_at_least(&clock, period);
        sl.sample_once();
    }

    let frames = sink.frames();
    assert_eq!(frames.len(), 4);
    for frame in &frames {
        assert_eq!(frame.len(), FRAME_LEN);
    }

    let ids: Vec<u8> = frames
        .iter()
        .map(|f| decode_frame(f).unwrap().0.sensor_id)
        .collect();
    assert_eq!(
        ids,
        vec![
            Sensor::Pt1.id(),
            Sensor::Pt2.id(),
            Sensor::Pt3.id(),
            Sensor::Pt4.id()
        ]
    );

    let (_, items) = decode_frame(&frames[1]).unwrap();
    assert_eq!(items.len(), BUFFER_CAPACITY);
    assert!(items.iter().all(|i| i.reading == 42));
    for (n, item) in items.iter().enumerate() {
        let expected = period * (n as u32 + 1);
        assert_eq!(item.timestamp, expected.as_nanos() as u64);
    }
    assert_eq!(sl.buffered(Sensor::Pt2), Some(1));
}

#[test]
fn early_wakeups_never_shorten_the_sample_period() {
    let adc = Arc::new(MockAdc::default());
    adc.set(Sensor::Pt1, RAW_NOMINAL);
    let sink = Arc::new(MockSink::default());
    let clock = Arc::new(EarlyWakeClock::default());
    let safety = Arc::new(SafetyState::new());
    let mut sl = SamplingLoop::new(
        pt_group(),
        Arc::clone(&adc),
        Arc::clone(&sink),
        Arc::clone(&clock),
        safety,
        true,
    );
    let period = sl.group().period();

    for _ in 0..=BUFFER_CAPACITY {
        sl.tick();
    }
    assert!(clock.sleeps.load(Ordering::SeqCst) > (BUFFER_CAPACITY as u64 + 1));

    let frames = sink.frames();
    let (_, items) = decode_frame(&frames[0]).unwrap();
    assert_eq!(items.len(), BUFFER_CAPACITY);
    assert!(items[0].timestamp >= period.as_nanos() as u64);
    for pair in items.windows(2) {
        let gap = pair[1].timestamp - pair[0].timestamp;
        assert!(gap >= period.as_nanos() as u64, "gap {gap} ns < {period:?}");
    }
}

#[test]
fn failed_sends_drop_frames_and_sampling_continues() {
    let adc = Arc::new(MockAdc::default());
    adc.set(Sensor::Pt1, RAW_NOMINAL);
    let sink = Arc::new(MockSink::failing());
    let clock = ManualClock::new();
    let safety = Arc::new(SafetyState::new());
    let mut sl = pt_loop(&adc, &sink, &clock, &safety);

    for _ in 0..(2 * BUFFER_CAPACITY + 1) {
        clock.advance(Duration::from_millis(2));
        sl.sample_once();
    }

    let stats = sl.stats();
    assert_eq!(stats.frames_sent, 0);
    assert_eq!(stats.frames_dropped, 8);
    assert_eq!(stats.cycles, 2 * BUFFER_CAPACITY as u64 + 1);
    assert!(sink.frames().is_empty());
    assert_eq!(sl.buffered(Sensor::Pt1), Some(1));
}

// ── Pressure guard ─────────────────────────────────────────────

#[test]
fn nominal_pressure_never_trips_the_guard() {
    let adc = Arc::new(MockAdc::default());
    adc.set(Sensor::Pt1, RAW_NOMINAL);
    let sink = Arc::new(MockSink::default());
    let clock = ManualClock::new();
    let safety = Arc::new(SafetyState::new());
    let mut sl = pt_loop(&adc, &sink, &clock, &safety);

    for _ in 0..500 {
        sl.sample_once();
    }
    assert!(!safety.pressure_shutoff());
    let avg = sl.pressure_guard().unwrap().average(Sensor::Pt1).unwrap();
    assert!((avg - 700.0).abs() < 1.0, "avg = {avg}");
}

#[test]
fn underpressure_trips_the_guard_and_recovers() {
    let adc = Arc::new(MockAdc::default());
    adc.set(Sensor::Pt1, RAW_UNDERPRESSURE);
    let sink = Arc::new(MockSink::default());
    let clock = ManualClock::new();
    let safety = Arc::new(SafetyState::new());
    let mut sl = pt_loop(&adc, &sink, &clock, &safety);

    // 700 * 0.95^n - 120 * (1 - 0.95^n) drops below 300 at n = 14.
    for _ in 0..13 {
        sl.sample_once();
    }
    assert!(!safety.pressure_shutoff());
    sl.sample_once();
    assert!(safety.pressure_shutoff());

    adc.set(Sensor::Pt1, RAW_NOMINAL);
    for _ in 0..200 {
        sl.sample_once();
    }
    assert!(!safety.pressure_shutoff());
}

#[test]
fn guard_shutoff_ends_a_running_burn() {
    let clock = ManualClock::new();
    let adc = Arc::new(MockAdc::default());
    adc.set(Sensor::Pt1, RAW_NOMINAL);
    let sink = Arc::new(MockSink::default());
    let pins_out = Arc::new(MockPins::new(clock.clone()));
    let safety = Arc::new(SafetyState::new());
    let mut sl = pt_loop(&adc, &sink, &clock, &safety);
    let mut seq = IgnitionSequencer::new(
        EngineProfile::Generic,
        BurnTiming {
            preignite: Duration::from_millis(100),
            hotflow: Duration::from_millis(2000),
            shutoff_arm: Duration::from_millis(200),
            poll: Duration::from_millis(50),
        },
        Arc::clone(&safety),
        Arc::clone(&pins_out),
        clock.clone(),
    );

    assert!(safety.request_ignition());
    seq.step();

    // Interleave 2 ms sampling with 50 ms sequencer polls.
    let mut ending_at = None;
    for tick in 1..=1000u32 {
        if tick == 200 {
            adc.set(Sensor::Pt1, RAW_UNDERPRESSURE);
        }
        clock.advance(Duration::from_millis(2));
        sl.sample_once();
        if tick % 25 == 0 && seq.step() == BurnState::Ending {
            ending_at = Some(tick);
            break;
        }
    }

    let ending_at = ending_at.expect("burn should end on pressure");
    // Trips 14 samples after tick 200; the next poll is tick 225.
    assert_eq!(ending_at, 225);
    assert_eq!(seq.last_outcome(), Some(BurnOutcome::PressureShutoff));
    assert_eq!(pins_out.level(pins::MAIN_VALVE), Some(Low));
    assert_eq!(pins_out.level(pins::IGN_START), Some(Low));
    assert!(!safety.ignition_active());
}
