//! Fuzz target: command channel byte stream
//!
//! Replays arbitrary operator byte streams through a dispatcher on the
//! simulated pins.  No byte sequence may panic, and only mapped pins may
//! change.
//!
//! cargo fuzz run fuzz_command_session

#![no_main]

use std::io::Cursor;
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use resfet::adapters::sim::SimPins;
use resfet::app::dispatcher::CommandDispatcher;
use resfet::app::profile::EngineProfile;
use resfet::pins;
use resfet::safety::SafetyState;
use resfet::server::serve_session;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, stream)) = data.split_first() else {
        return;
    };
    let profile = match selector % 3 {
        0 => EngineProfile::Generic,
        1 => EngineProfile::Titan,
        _ => EngineProfile::Luna { gitvc: None },
    };

    let outputs = Arc::new(SimPins::new());
    let dispatcher = CommandDispatcher::new(profile, Arc::new(SafetyState::new()), Arc::clone(&outputs));
    let (_, dispatched) = serve_session(Cursor::new(stream), &dispatcher);
    assert!(dispatched <= stream.len());

    let allowed = |pin: u8| {
        pins::DRIVER_PINS.contains(&pin)
            || [
                pins::IGN_START,
                pins::MAIN_VALVE,
                pins::VALVE2,
                pins::VALVE3,
                pins::HEATING_TAPE,
            ]
            .contains(&pin)
    };
    for pin in 0..=u8::MAX {
        if outputs.level(pin).is_some() {
            assert!(allowed(pin), "unexpected write to GPIO{pin}");
        }
    }
});
