//! The ignition sequencer thread.
//!
//! Polls the shared safety flags at a fixed interval, ticks the burn
//! state machine, and applies whatever pin writes the handlers queued.
//! Worst-case reaction latency to a flag change is one poll interval.

use std::io;
use std::sync::Arc;

use log::info;

use super::context::{BurnContext, BurnOutcome, BurnTiming};
use super::{BurnState, Fsm, states};
use crate::app::ports::{Clock, DigitalOutput, sleep_at_least};
use crate::app::profile::EngineProfile;
use crate::safety::SafetyState;
use crate::worker::{self, WorkerHandle};

/// Thread name of the sequencer.
pub const SEQUENCER_THREAD: &str = "Ignition Sequencer";

pub struct IgnitionSequencer<O, C> {
    fsm: Fsm,
    ctx: BurnContext,
    safety: Arc<SafetyState>,
    outputs: O,
    clock: C,
    burns: u32,
    last_outcome: Option<BurnOutcome>,
}

impl<O: DigitalOutput, C: Clock> IgnitionSequencer<O, C> {
    pub fn new(
        profile: EngineProfile,
        timing: BurnTiming,
        safety: Arc<SafetyState>,
        outputs: O,
        clock: C,
    ) -> Self {
        let mut ctx = BurnContext::new(profile, timing);
        let mut fsm = Fsm::new(states::build_state_table(), BurnState::Idle);
        fsm.start(&mut ctx);
        Self {
            fsm,
            ctx,
            safety,
            outputs,
            clock,
            burns: 0,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> BurnState {
        self.fsm.current_state()
    }

    /// Burns started since construction.
    pub fn burns(&self) -> u32 {
        self.burns
    }

    /// Outcome of the most recently finished burn.
    pub fn last_outcome(&self) -> Option<BurnOutcome> {
        self.last_outcome
    }

    /// One poll: snapshot inputs, tick, apply outputs.  Pin writes go out
    /// before the ignition flag is cleared.
    pub fn step(&mut self) -> BurnState {
        self.ctx.now = self.clock.elapsed();
        self.ctx.ignition_active = self.safety.ignition_active();
        self.ctx.pressure_shutoff = self.safety.pressure_shutoff();

        let before = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        let after = self.fsm.current_state();

        for (pin, level) in self.ctx.take_writes() {
            self.outputs.write_pin(pin, level);
        }

        if self.ctx.clear_ignition {
            self.ctx.clear_ignition = false;
            self.safety.clear_ignition();
        }

        if before == BurnState::Idle && after == BurnState::Igniting {
            self.burns += 1;
        }
        if after == BurnState::Ending {
            self.last_outcome = self.ctx.outcome;
        }
        after
    }

    /// Poll forever.  `Ending` falls through to `Idle` without a sleep.
    pub fn run(mut self) -> ! {
        info!(
            "Ignition sequencer ready ({}), polling every {:?}",
            self.ctx.profile.name(),
            self.ctx.timing.poll
        );
        loop {
            if self.step() != BurnState::Ending {
                sleep_at_least(&self.clock, self.ctx.timing.poll);
            }
        }
    }
}

impl<O, C> IgnitionSequencer<O, C>
where
    O: DigitalOutput + 'static,
    C: Clock + 'static,
{
    pub fn spawn(self) -> io::Result<WorkerHandle> {
        worker::spawn_worker(SEQUENCER_THREAD, worker::DEFAULT_STACK_KB, move || {
            self.run()
        })
    }
}
