//! Ignition state handlers and table builder.
//!
//! ```text
//!  IDLE ──[ignition_active]──▶ IGNITING ──[preignite elapsed]──▶ MAIN_VALVE_OPEN
//!    ▲                            │                                   │
//!    │                 [flag cleared / armed shutoff]   [hotflow elapsed / flag
//!    │                            │                      cleared / armed shutoff]
//!    │                            ▼                                   │
//!    └────────[immediate]────── ENDING ◀──────────────────────────────┘
//! ```

use embedded_hal::digital::PinState;
use log::{debug, error, info, warn};

use super::context::{BurnContext, BurnOutcome};
use super::gitvc::{GITVC_OFF, GitvcSequence};
use super::{BurnState, StateDescriptor};
use crate::app::profile::EngineProfile;
use crate::pins;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor; BurnState::COUNT] {
    [
        StateDescriptor {
            id: BurnState::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        StateDescriptor {
            id: BurnState::Igniting,
            name: "Igniting",
            on_enter: Some(igniting_enter),
            on_exit: None,
            on_update: igniting_update,
        },
        StateDescriptor {
            id: BurnState::MainValveOpen,
            name: "MainValveOpen",
            on_enter: Some(main_valve_open_enter),
            on_exit: Some(main_valve_open_exit),
            on_update: main_valve_open_update,
        },
        StateDescriptor {
            id: BurnState::Ending,
            name: "Ending",
            on_enter: Some(ending_enter),
            on_exit: None,
            on_update: ending_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(_ctx: &mut BurnContext) {
    debug!("IDLE: waiting for ignition");
}

fn idle_update(ctx: &mut BurnContext) -> Option<BurnState> {
    ctx.ignition_active.then_some(BurnState::Igniting)
}

// ═══════════════════════════════════════════════════════════════════════════
//  IGNITING: igniter energized, main valve still closed
// ═══════════════════════════════════════════════════════════════════════════

fn igniting_enter(ctx: &mut BurnContext) {
    ctx.t0 = ctx.now;
    ctx.outcome = None;
    let pin = ctx.profile.ignition_pin();
    ctx.write(pin, PinState::High);
    info!(
        "IGNITING: igniter on (pin {}), main valve in {:?}",
        pin, ctx.timing.preignite
    );
}

fn igniting_update(ctx: &mut BurnContext) -> Option<BurnState> {
    if let Some(reason) = ctx.abort_reason() {
        ctx.outcome = Some(reason);
        return Some(BurnState::Ending);
    }
    (ctx.burn_elapsed() >= ctx.timing.preignite).then_some(BurnState::MainValveOpen)
}

// ═══════════════════════════════════════════════════════════════════════════
//  MAIN_VALVE_OPEN: hotflow; Luna may pulse GITVC
// ═══════════════════════════════════════════════════════════════════════════

fn main_valve_open_enter(ctx: &mut BurnContext) {
    for &(pin, level) in ctx.profile.burn_open_levels() {
        ctx.write(pin, level);
    }
    info!(
        "MAIN_VALVE_OPEN: {} burn valves set at {:?}",
        ctx.profile.name(),
        ctx.burn_elapsed()
    );

    if let EngineProfile::Luna { gitvc: Some(plan) } = &ctx.profile {
        ctx.gitvc = GitvcSequence::start(plan, ctx.now);
        if ctx.gitvc.is_some() {
            info!(
                "GITVC: {} pulses starting after {:?}",
                plan.pulses.len(),
                plan.wait
            );
        }
    }
}

fn main_valve_open_exit(ctx: &mut BurnContext) {
    if ctx.gitvc.take().is_some() {
        ctx.write(pins::GITVC_VALVE, GITVC_OFF);
    }
}

fn main_valve_open_update(ctx: &mut BurnContext) -> Option<BurnState> {
    if let Some(reason) = ctx.abort_reason() {
        ctx.outcome = Some(reason);
        return Some(BurnState::Ending);
    }
    if ctx.burn_elapsed() >= ctx.timing.hotflow {
        ctx.outcome = Some(BurnOutcome::Completed);
        return Some(BurnState::Ending);
    }

    let now = ctx.now;
    if let Some((pin, level)) = ctx.gitvc.as_mut().and_then(|seq| seq.poll(now)) {
        ctx.write(pin, level);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ENDING: everything closed, flag cleared
// ═══════════════════════════════════════════════════════════════════════════

fn ending_enter(ctx: &mut BurnContext) {
    for &(pin, level) in ctx.profile.burn_end_levels() {
        ctx.write(pin, level);
    }
    ctx.clear_ignition = true;

    let elapsed = ctx.burn_elapsed();
    match ctx.outcome.get_or_insert(BurnOutcome::Aborted) {
        BurnOutcome::Completed => info!("ENDING: burn complete after {elapsed:?}"),
        BurnOutcome::Aborted => warn!("ENDING: burn aborted by operator after {elapsed:?}"),
        BurnOutcome::PressureShutoff => {
            error!("ENDING: pressure shutoff after {elapsed:?}, main valve closed")
        }
    }
}

fn ending_update(_ctx: &mut BurnContext) -> Option<BurnState> {
    Some(BurnState::Idle)
}
