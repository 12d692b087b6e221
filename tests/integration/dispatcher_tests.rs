//! Command dispatcher tests against a live sequencer.
//!
//! The dispatcher and the sequencer share one `SafetyState` and one pin
//! recorder, the way the binary wires them.

use std::sync::Arc;
use std::time::Duration;

use embedded_hal::digital::PinState::{High, Low};
use resfet::adapters::time::ManualClock;
use resfet::app::commands::Command;
use resfet::app::dispatcher::{CommandDispatcher, Dispatch};
use resfet::app::profile::EngineProfile;
use resfet::fsm::{BurnOutcome, BurnState, BurnTiming, IgnitionSequencer};
use resfet::pins;
use resfet::safety::SafetyState;

use super::mock_hw::MockPins;

struct Stand {
    clock: ManualClock,
    pins: Arc<MockPins>,
    safety: Arc<SafetyState>,
    dispatcher: CommandDispatcher<Arc<MockPins>>,
    seq: IgnitionSequencer<Arc<MockPins>, ManualClock>,
}

fn stand(profile: EngineProfile) -> Stand {
    let clock = ManualClock::new();
    let pins = Arc::new(MockPins::new(clock.clone()));
    let safety = Arc::new(SafetyState::new());
    let timing = BurnTiming {
        preignite: Duration::from_millis(100),
        hotflow: Duration::from_millis(500),
        shutoff_arm: Duration::from_millis(200),
        poll: Duration::from_millis(50),
    };
    let dispatcher = CommandDispatcher::new(profile.clone(), Arc::clone(&safety), Arc::clone(&pins));
    let seq = IgnitionSequencer::new(
        profile,
        timing,
        Arc::clone(&safety),
        Arc::clone(&pins),
        clock.clone(),
    );
    Stand {
        clock,
        pins,
        safety,
        dispatcher,
        seq,
    }
}

// ── Stop during a burn ─────────────────────────────────────────

#[test]
fn stop_mid_burn_closes_pins_immediately_and_sequencer_follows() {
    let mut s = stand(EngineProfile::Generic);

    assert_eq!(
        s.dispatcher.handle_byte(Command::StartIgnition.opcode()),
        Ok(Dispatch::Applied)
    );
    s.seq.step();
    s.clock.advance(Duration::from_millis(150));
    assert_eq!(s.seq.step(), BurnState::MainValveOpen);
    assert_eq!(s.pins.level(pins::MAIN_VALVE), Some(High));

    s.clock.advance(Duration::from_millis(10));
    assert_eq!(
        s.dispatcher.handle_byte(Command::StopIgnition.opcode()),
        Ok(Dispatch::Applied)
    );

    // Closed by the dispatcher itself, before the sequencer polls again.
    assert_eq!(s.pins.level(pins::IGN_START), Some(Low));
    assert_eq!(s.pins.level(pins::MAIN_VALVE), Some(Low));
    assert_eq!(
        s.pins.first(pins::MAIN_VALVE, Low).unwrap().at,
        Duration::from_millis(160)
    );
    assert!(!s.safety.ignition_active());

    s.clock.advance(Duration::from_millis(40));
    assert_eq!(s.seq.step(), BurnState::Ending);
    assert_eq!(s.seq.last_outcome(), Some(BurnOutcome::Aborted));
    assert_eq!(s.seq.step(), BurnState::Idle);
    assert!(!s.safety.ignition_active());
}

#[test]
fn start_while_burning_is_ignored() {
    let mut s = stand(EngineProfile::Generic);
    assert_eq!(s.dispatcher.handle(Command::StartIgnition), Dispatch::Applied);
    s.seq.step();
    assert_eq!(s.dispatcher.handle(Command::StartIgnition), Dispatch::Ignored);
    assert_eq!(s.seq.burns(), 1);
}

#[test]
fn start_clears_a_stale_pressure_shutoff() {
    let s = stand(EngineProfile::Generic);
    s.safety.set_pressure_shutoff(true);
    s.dispatcher.handle(Command::StartIgnition);
    assert!(!s.safety.pressure_shutoff());
    assert!(s.safety.ignition_active());
}

// ── Unknown and reserved opcodes ───────────────────────────────

#[test]
fn unknown_opcodes_change_nothing() {
    let s = stand(EngineProfile::Titan);
    for byte in [26u8, 31, 47, 49, 200, 255] {
        assert!(s.dispatcher.handle_byte(byte).is_err());
    }
    assert_eq!(s.pins.count(), 0);
    assert!(!s.safety.ignition_active());
    assert!(!s.safety.pressure_shutoff());
}

// ── Drivers ────────────────────────────────────────────────────

#[test]
fn every_driver_opcode_hits_its_pin() {
    let s = stand(EngineProfile::Generic);
    for (k, &pin) in pins::DRIVER_PINS.iter().enumerate() {
        let k = k as u8;
        s.dispatcher.handle_byte(2 * k + 1).unwrap();
        assert_eq!(s.pins.level(pin), Some(High));
        s.dispatcher.handle_byte(2 * k).unwrap();
        assert_eq!(s.pins.level(pin), Some(Low));
    }
    assert_eq!(s.pins.count(), 2 * pins::DRIVER_PINS.len());
}

// ── Profiles ───────────────────────────────────────────────────

#[test]
fn titan_fill_sequence_sets_three_valves() {
    let s = stand(EngineProfile::Titan);
    assert_eq!(s.dispatcher.handle(Command::Fill), Dispatch::Applied);
    assert_eq!(s.pins.level(pins::MAIN_VALVE), Some(High));
    assert_eq!(s.pins.level(pins::VENT_VALVE), Some(High));
    assert_eq!(s.pins.level(pins::TANK_VALVE), Some(Low));

    s.dispatcher.handle(Command::Default);
    assert_eq!(s.pins.level(pins::MAIN_VALVE), Some(Low));
    assert_eq!(s.pins.level(pins::VENT_VALVE), Some(Low));
    assert_eq!(s.pins.level(pins::TANK_VALVE), Some(High));
}

#[test]
fn presets_on_the_wrong_profile_are_ignored() {
    let s = stand(EngineProfile::Generic);
    for cmd in [Command::LeakCheck, Command::TapeOn, Command::SetWater, Command::SetGitvc] {
        assert_eq!(s.dispatcher.handle(cmd), Dispatch::Ignored);
    }
    let luna = stand(EngineProfile::Luna { gitvc: None });
    assert_eq!(luna.dispatcher.handle(Command::Fill), Dispatch::Ignored);
    assert_eq!(s.pins.count() + luna.pins.count(), 0);
}

#[test]
fn luna_manual_gitvc_is_active_low() {
    let s = stand(EngineProfile::Luna { gitvc: None });
    s.dispatcher.handle(Command::SetGitvc);
    assert_eq!(s.pins.level(pins::GITVC_VALVE), Some(Low));
    s.dispatcher.handle(Command::UnsetGitvc);
    assert_eq!(s.pins.level(pins::GITVC_VALVE), Some(High));
}
