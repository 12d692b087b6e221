//! Command server tests over real loopback TCP.

use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

use embedded_hal::digital::PinState::{High, Low};
use resfet::adapters::time::ManualClock;
use resfet::app::commands::{Command, SESSION_END};
use resfet::app::dispatcher::CommandDispatcher;
use resfet::app::profile::EngineProfile;
use resfet::config::{ConfigMap, ControllerConfig};
use resfet::pins;
use resfet::safety::SafetyState;
use resfet::server::{CommandServer, SessionEnd};

use super::mock_hw::MockPins;

type Setup = (
    CommandServer,
    CommandDispatcher<Arc<MockPins>>,
    Arc<MockPins>,
    Arc<SafetyState>,
);

fn setup(profile: EngineProfile) -> Setup {
    let server = CommandServer::bind("127.0.0.1", 0).expect("bind loopback");
    let pins = Arc::new(MockPins::new(ManualClock::new()));
    let safety = Arc::new(SafetyState::new());
    let dispatcher = CommandDispatcher::new(profile, Arc::clone(&safety), Arc::clone(&pins));
    (server, dispatcher, pins, safety)
}

#[test]
fn session_dispatches_until_terminator() {
    let (server, dispatcher, pins_out, safety) = setup(EngineProfile::Titan);
    let addr = server.local_addr().unwrap();

    let end = thread::scope(|s| {
        let handle = s.spawn(|| server.serve_one(&dispatcher));
        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(&[
                Command::SetDriver(2).opcode(),
                Command::TapeOn.opcode(),
                Command::StartIgnition.opcode(),
                SESSION_END,
                Command::StopIgnition.opcode(),
            ])
            .unwrap();
        let end = handle.join().unwrap().unwrap();
        drop(client);
        end
    });

    assert_eq!(end, SessionEnd::ClientClosed);
    assert_eq!(pins_out.level(pins::DRIVER_PINS[2]), Some(High));
    assert_eq!(pins_out.level(pins::HEATING_TAPE), Some(High));
    // The byte after the terminator was never dispatched.
    assert!(safety.ignition_active());
    assert_eq!(pins_out.level(pins::IGN_START), None);
}

#[test]
fn hangup_ends_session_and_server_accepts_again() {
    let (server, dispatcher, pins_out, safety) = setup(EngineProfile::Generic);
    let addr = server.local_addr().unwrap();

    thread::scope(|s| {
        let handle = s.spawn(|| {
            let first = server.serve_one(&dispatcher).unwrap();
            let second = server.serve_one(&dispatcher).unwrap();
            (first, second)
        });

        let mut client = TcpStream::connect(addr).unwrap();
        client.write_all(&[Command::StartIgnition.opcode(), 200]).unwrap();
        drop(client);

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(&[Command::StopIgnition.opcode(), SESSION_END])
            .unwrap();

        let (first, second) = handle.join().unwrap();
        assert_eq!(first, SessionEnd::Disconnected);
        assert_eq!(second, SessionEnd::ClientClosed);
    });

    assert!(!safety.ignition_active());
    assert_eq!(pins_out.level(pins::IGN_START), Some(Low));
    assert_eq!(pins_out.level(pins::MAIN_VALVE), Some(Low));
}

#[test]
fn bind_conflict_is_reported() {
    let (server, ..) = setup(EngineProfile::Generic);
    let port = server.local_addr().unwrap().port();
    assert!(CommandServer::bind("127.0.0.1", port).is_err());
}

#[test]
fn command_port_binds_while_telemetry_goes_to_a_remote_host() {
    let text = "\
[Network]
address=192.0.2.10
port=5005
[Main]
engine_type=generic
[Worker]
preignite_ms=100
hotflow_ms=500
";
    let config = ControllerConfig::from_map(&ConfigMap::parse(text).unwrap()).unwrap();
    assert_eq!(config.network.address, "192.0.2.10");

    let server = CommandServer::bind(&config.network.listen_address, 0).expect("bind wildcard");
    let addr = server.local_addr().unwrap();
    assert!(addr.ip().is_unspecified());

    // Reachable over loopback, since the listener is on every interface.
    let pins_out = Arc::new(MockPins::new(ManualClock::new()));
    let dispatcher = CommandDispatcher::new(
        EngineProfile::Generic,
        Arc::new(SafetyState::new()),
        Arc::clone(&pins_out),
    );
    let end = thread::scope(|s| {
        let handle = s.spawn(|| server.serve_one(&dispatcher));
        let mut client = TcpStream::connect(("127.0.0.1", addr.port())).unwrap();
        client
            .write_all(&[Command::SetDriver(0).opcode(), SESSION_END])
            .unwrap();
        handle.join().unwrap().unwrap()
    });
    assert_eq!(end, SessionEnd::ClientClosed);
    assert_eq!(pins_out.level(pins::DRIVER_PINS[0]), Some(High));
}
