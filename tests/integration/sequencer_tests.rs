//! Ignition sequencer tests.
//!
//! Drive the sequencer poll by poll on a virtual clock and check the
//! exact time each burn pin changed.

use std::sync::Arc;
use std::time::Duration;

use embedded_hal::digital::PinState::{High, Low};
use resfet::adapters::time::ManualClock;
use resfet::app::ports::Clock;
use resfet::app::profile::{EngineProfile, GitvcPlan};
use resfet::config::LunaConfig;
use resfet::fsm::{BurnOutcome, BurnState, BurnTiming, IgnitionSequencer};
use resfet::pins;
use resfet::safety::SafetyState;

use super::mock_hw::MockPins;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn timing() -> BurnTiming {
    BurnTiming {
        preignite: ms(100),
        hotflow: ms(500),
        shutoff_arm: ms(200),
        poll: ms(50),
    }
}

struct Rig {
    clock: ManualClock,
    pins: Arc<MockPins>,
    safety: Arc<SafetyState>,
    seq: IgnitionSequencer<Arc<MockPins>, ManualClock>,
}

fn rig(profile: EngineProfile) -> Rig {
    let clock = ManualClock::new();
    let pins = Arc::new(MockPins::new(clock.clone()));
    let safety = Arc::new(SafetyState::new());
    let seq = IgnitionSequencer::new(
        profile,
        timing(),
        Arc::clone(&safety),
        Arc::clone(&pins),
        clock.clone(),
    );
    Rig {
        clock,
        pins,
        safety,
        seq,
    }
}

impl Rig {
    /// Step once per poll interval until the sequencer is back in Idle
    /// or `limit` has passed.
    fn run_burn(&mut self, limit: Duration) {
        while self.clock.elapsed() <= limit {
            let state = self.seq.step();
            if state == BurnState::Ending {
                self.seq.step();
                return;
            }
            self.clock.advance(timing().poll);
        }
    }
}

// ── Nominal burn ───────────────────────────────────────────────

#[test]
fn nominal_burn_opens_main_at_preignite_and_closes_at_hotflow() {
    let mut r = rig(EngineProfile::Generic);
    assert!(r.safety.request_ignition());

    r.run_burn(ms(2000));

    let ign_on = r.pins.first(pins::IGN_START, High).expect("igniter on");
    let main_on = r.pins.first(pins::MAIN_VALVE, High).expect("main valve on");
    let main_off = r.pins.first(pins::MAIN_VALVE, Low).expect("main valve off");
    let ign_off = r.pins.first(pins::IGN_START, Low).expect("igniter off");

    assert_eq!(ign_on.at, ms(0));
    assert_eq!(main_on.at, ms(100));
    assert_eq!(main_off.at, ms(500));
    assert_eq!(ign_off.at, ms(500));

    assert!(!r.safety.ignition_active());
    assert_eq!(r.seq.state(), BurnState::Idle);
    assert_eq!(r.seq.burns(), 1);
    assert_eq!(r.seq.last_outcome(), Some(BurnOutcome::Completed));
}

#[test]
fn main_valve_close_is_written_before_igniter_close() {
    let mut r = rig(EngineProfile::Generic);
    assert!(r.safety.request_ignition());
    r.run_burn(ms(2000));

    let history = r.pins.history();
    let main_off = history
        .iter()
        .position(|w| w.pin == pins::MAIN_VALVE && w.level == Low)
        .unwrap();
    let ign_off = history
        .iter()
        .position(|w| w.pin == pins::IGN_START && w.level == Low)
        .unwrap();
    assert!(main_off < ign_off);
}

#[test]
fn titan_burn_vents_and_closes_tank_then_drops_igniter() {
    let mut r = rig(EngineProfile::Titan);
    assert!(r.safety.request_ignition());
    r.run_burn(ms(2000));

    let at = |pin, level| r.pins.first(pin, level).map(|w| w.at);
    assert_eq!(at(pins::IGN_START, High), Some(ms(0)));
    assert_eq!(at(pins::VENT_VALVE, Low), Some(ms(100)));
    assert_eq!(at(pins::TANK_VALVE, High), Some(ms(100)));
    assert_eq!(at(pins::MAIN_VALVE, Low), Some(ms(100)));
    assert_eq!(at(pins::MAIN_VALVE, High), None);
    assert_eq!(at(pins::IGN_START, Low), Some(ms(500)));

    // Burn end changes nothing but the igniter.
    let at_end: Vec<_> = r
        .pins
        .history()
        .into_iter()
        .filter(|w| w.at == ms(500))
        .map(|w| (w.pin, w.level))
        .collect();
    assert_eq!(at_end, vec![(pins::IGN_START, Low)]);
    assert_eq!(r.seq.last_outcome(), Some(BurnOutcome::Completed));
    assert!(!r.safety.ignition_active());
}

#[test]
fn idle_sequencer_writes_nothing() {
    let mut r = rig(EngineProfile::Generic);
    for _ in 0..20 {
        assert_eq!(r.seq.step(), BurnState::Idle);
        r.clock.advance(ms(50));
    }
    assert_eq!(r.pins.count(), 0);
    assert_eq!(r.seq.burns(), 0);
}

#[test]
fn second_burn_runs_after_the_first_completes() {
    let mut r = rig(EngineProfile::Generic);
    assert!(r.safety.request_ignition());
    r.run_burn(ms(2000));
    r.pins.clear();

    let start = r.clock.elapsed();
    assert!(r.safety.request_ignition());
    r.run_burn(start + ms(2000));

    assert_eq!(r.seq.burns(), 2);
    assert_eq!(r.pins.first(pins::MAIN_VALVE, High).unwrap().at, start + ms(100));
    assert_eq!(r.pins.first(pins::MAIN_VALVE, Low).unwrap().at, start + ms(500));
}

// ── Abort paths ────────────────────────────────────────────────

#[test]
fn clearing_the_flag_during_preignite_never_opens_main() {
    let mut r = rig(EngineProfile::Generic);
    assert!(r.safety.request_ignition());
    r.seq.step();
    r.clock.advance(ms(50));
    r.safety.clear_ignition();

    assert_eq!(r.seq.step(), BurnState::Ending);
    assert_eq!(r.pins.first(pins::MAIN_VALVE, High), None);
    assert_eq!(r.pins.level(pins::IGN_START), Some(Low));
    assert_eq!(r.seq.last_outcome(), Some(BurnOutcome::Aborted));
}

#[test]
fn pressure_shutoff_before_arm_delay_is_ignored() {
    let mut r = rig(EngineProfile::Generic);
    assert!(r.safety.request_ignition());
    r.safety.set_pressure_shutoff(true);

    r.seq.step();
    r.clock.advance(ms(150));
    assert_eq!(r.seq.step(), BurnState::MainValveOpen);
    assert!(r.safety.ignition_active());
}

#[test]
fn armed_pressure_shutoff_ends_the_burn_within_one_poll() {
    let mut r = rig(EngineProfile::Generic);
    assert!(r.safety.request_ignition());
    r.seq.step();
    r.clock.advance(ms(250));
    assert_eq!(r.seq.step(), BurnState::MainValveOpen);

    r.safety.set_pressure_shutoff(true);
    r.clock.advance(ms(50));
    assert_eq!(r.seq.step(), BurnState::Ending);

    assert_eq!(r.pins.first(pins::MAIN_VALVE, Low).unwrap().at, ms(300));
    assert!(!r.safety.ignition_active());
    assert_eq!(r.seq.last_outcome(), Some(BurnOutcome::PressureShutoff));
}

// ── Luna GITVC ─────────────────────────────────────────────────

#[test]
fn luna_pulses_gitvc_during_hotflow_and_closes_valves_at_end() {
    let plan = GitvcPlan::from_config(&LunaConfig {
        use_gitvc: true,
        gitvc_times_ms: vec![100, 100],
        gitvc_wait_ms: 50,
        time_between_gitvc_ms: 50,
    });
    let mut r = rig(EngineProfile::Luna { gitvc: Some(plan) });
    assert!(r.safety.request_ignition());
    r.run_burn(ms(2000));

    let gitvc: Vec<_> = r
        .pins
        .history()
        .into_iter()
        .filter(|w| w.pin == pins::GITVC_VALVE)
        .map(|w| (w.at, w.level))
        .collect();

    // Main opens at 100: pulse 1 at 150..250, pulse 2 at 300..400.
    assert_eq!(
        gitvc[..4],
        [
            (ms(150), Low),
            (ms(250), High),
            (ms(300), Low),
            (ms(400), High),
        ]
    );
    // Only end-of-burn closes after that.
    assert!(gitvc[4..].iter().all(|&(at, level)| at == ms(500) && level == High));
    assert_eq!(r.pins.level(pins::WATER_VALVE), Some(Low));
}

#[test]
fn luna_abort_mid_pulse_closes_gitvc() {
    let plan = GitvcPlan::from_config(&LunaConfig {
        use_gitvc: true,
        gitvc_times_ms: vec![1000],
        gitvc_wait_ms: 0,
        time_between_gitvc_ms: 50,
    });
    let mut r = rig(EngineProfile::Luna { gitvc: Some(plan) });
    assert!(r.safety.request_ignition());
    r.seq.step();
    r.clock.advance(ms(100));
    r.seq.step();
    r.clock.advance(ms(50));
    r.seq.step();
    assert_eq!(r.pins.level(pins::GITVC_VALVE), Some(Low));

    r.safety.clear_ignition();
    r.clock.advance(ms(50));
    assert_eq!(r.seq.step(), BurnState::Ending);
    assert_eq!(r.pins.level(pins::GITVC_VALVE), Some(High));
    assert_eq!(r.pins.level(pins::MAIN_VALVE), Some(Low));
}
