//! RESFET controller main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                       │
//! │                                                                  │
//! │  SimAdc / AdcBank   SimPins / GpioBank   UdpTelemetrySink  Clock │
//! │  (SampleReader)     (DigitalOutput)      (DatagramSink)          │
//! │                                                                  │
//! │  ──────────────── Port Trait Boundary ───────────────────        │
//! │                                                                  │
//! │  3 × SamplingLoop thread ──▶ PressureGuard ──▶ SafetyState       │
//! │  IgnitionSequencer thread ◀───────────────────── SafetyState     │
//! │  CommandServer (main thread) ──▶ CommandDispatcher               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `resfet <config.ini> [--simulate]`.  Without `--simulate` the
//! binary needs the `hardware` feature.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
#[cfg(not(feature = "hardware"))]
use anyhow::bail;
use clap::Parser;
use log::{LevelFilter, info, warn};

use resfet::adapters::sim::{SimAdc, SimPins};
use resfet::adapters::time::MonotonicClock;
use resfet::adapters::udp::UdpTelemetrySink;
use resfet::app::dispatcher::CommandDispatcher;
use resfet::app::ports::{DigitalOutput, SampleReader};
use resfet::config::ControllerConfig;
use resfet::fsm::{BurnTiming, IgnitionSequencer};
use resfet::safety::SafetyState;
use resfet::sampling::SamplingLoop;
use resfet::sensors::{Sensor, SensorGroup};
use resfet::server::CommandServer;
use resfet::worker::WorkerHandle;

/// Engine test-stand controller
#[derive(Parser, Debug)]
#[command(name = "resfet")]
#[command(version)]
#[command(about = "Samples the test stand, streams telemetry, and runs the ignition sequence", long_about = None)]
struct Args {
    /// INI configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Run against simulated ADCs and GPIO
    #[arg(long)]
    simulate: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let config = ControllerConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if args.simulate {
        let pins = SimPins::new();
        for &(pin, level) in config.engine_profile().safe_levels() {
            pins.write_pin(pin, level);
        }
        run(&config, Arc::new(simulated_adc(&config)), Arc::new(pins))
    } else {
        run_board(&config)
    }
}

#[cfg(feature = "hardware")]
fn run_board(config: &ControllerConfig) -> Result<()> {
    let (adc, pins) = resfet::adapters::board::open(&config.engine_profile())
        .context("opening board GPIO/SPI")?;
    run(config, Arc::new(adc), Arc::new(pins))
}

#[cfg(not(feature = "hardware"))]
fn run_board(_config: &ControllerConfig) -> Result<()> {
    bail!("built without the `hardware` feature; rebuild with it or run with --simulate");
}

/// Spawn the sampling and sequencer threads, then serve commands on the
/// calling thread forever.  Pins must already be at their safe levels.
fn run<R, O>(config: &ControllerConfig, adc: Arc<R>, pins: Arc<O>) -> Result<()>
where
    R: SampleReader + 'static,
    O: DigitalOutput + 'static,
{
    let profile = config.engine_profile();
    info!(
        "RESFET starting: engine {}, telemetry {}:{}, commands on {}:{}",
        profile.name(),
        config.network.address,
        config.network.port,
        config.network.listen_address,
        config.network.command_port
    );

    let safety = Arc::new(SafetyState::new());
    let clock = MonotonicClock::new();
    let sink = Arc::new(
        UdpTelemetrySink::connect(&config.network.address, config.network.port)
            .context("opening telemetry socket")?,
    );

    // ── Worker threads ────────────────────────────────────────
    let mut workers: Vec<WorkerHandle> = Vec::new();
    for group in SensorGroup::standard_groups(config) {
        let worker = SamplingLoop::new(
            group,
            Arc::clone(&adc),
            Arc::clone(&sink),
            clock,
            Arc::clone(&safety),
            config.pressure.shutoff_enabled,
        );
        workers.push(worker.spawn().context("spawning sampling thread")?);
    }

    let sequencer = IgnitionSequencer::new(
        profile.clone(),
        BurnTiming::from_config(config),
        Arc::clone(&safety),
        Arc::clone(&pins),
        clock,
    );
    workers.push(sequencer.spawn().context("spawning ignition sequencer")?);

    for w in &workers {
        if w.is_finished() {
            warn!("{} exited during startup", w.name());
        }
    }

    // ── Command loop (main thread, forever) ───────────────────
    let server = CommandServer::bind(&config.network.listen_address, config.network.command_port)
        .context("binding command port")?;
    let dispatcher = CommandDispatcher::new(profile, safety, pins);
    server.serve_forever(&dispatcher)
}

/// Simulated ADCs.  The combustion transducer reads its nominal pressure
/// so the guard stays quiet; everything else counts.
fn simulated_adc(config: &ControllerConfig) -> SimAdc {
    let adc = SimAdc::new();
    let p = &config.pressure;
    let raw = ((p.nominal - p.yint) / p.slope).round();
    if raw.is_finite() && (0.0..=4095.0).contains(&raw) {
        adc.set(Sensor::Pt1, raw as u16);
    } else {
        warn!("Nominal pressure {} has no 12-bit raw value; PT1 free-running", p.nominal);
    }
    adc
}
