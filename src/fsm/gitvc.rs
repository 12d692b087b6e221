//! Timed GITVC pulse train for Luna burns.
//!
//! ```text
//!  main valve open
//!        │◀── wait ──▶│◀ pulse[0] ▶│◀ between ▶│◀ pulse[1] ▶│ ... done
//!  GITVC ─────────────┐            ┌───────────┐            ┌──────────
//!  (active low)       └────────────┘           └────────────┘
//! ```
//!
//! Deadlines chain from the previous deadline, not from the tick that
//! observed it, so a late poll does not stretch the whole train.  At
//! most one edge is emitted per poll.

use core::time::Duration;

use embedded_hal::digital::PinState;

use crate::app::profile::GitvcPlan;
use crate::pins;

/// Valve level that opens GITVC.
pub const GITVC_ON: PinState = PinState::Low;
/// Valve level that closes GITVC.
pub const GITVC_OFF: PinState = PinState::High;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Waiting,
    On(usize),
    Off(usize),
    Done,
}

#[derive(Debug, Clone)]
pub struct GitvcSequence {
    plan: GitvcPlan,
    phase: Phase,
    deadline: Duration,
}

impl GitvcSequence {
    /// Start the train at `start` (main valve open).  Returns `None` for
    /// an empty plan.
    pub fn start(plan: &GitvcPlan, start: Duration) -> Option<Self> {
        if plan.pulses.is_empty() {
            return None;
        }
        Some(Self {
            plan: plan.clone(),
            phase: Phase::Waiting,
            deadline: start + plan.wait,
        })
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Number of pulses started so far.
    pub fn pulses_started(&self) -> usize {
        match self.phase {
            Phase::Waiting => 0,
            Phase::On(i) => i + 1,
            Phase::Off(next) => next,
            Phase::Done => self.plan.pulses.len(),
        }
    }

    /// Advance to `now`.  Returns the GITVC level to write if an edge is due.
    pub fn poll(&mut self, now: Duration) -> Option<(u8, PinState)> {
        if self.phase == Phase::Done || now < self.deadline {
            return None;
        }
        let level = match self.phase {
            Phase::Waiting => self.begin_pulse(0),
            Phase::Off(next) => self.begin_pulse(next),
            Phase::On(i) => {
                if i + 1 < self.plan.pulses.len() {
                    self.phase = Phase::Off(i + 1);
                    self.deadline += self.plan.between;
                } else {
                    self.phase = Phase::Done;
                }
                GITVC_OFF
            }
            Phase::Done => return None,
        };
        Some((pins::GITVC_VALVE, level))
    }

    fn begin_pulse(&mut self, index: usize) -> PinState {
        let width = self.plan.pulses.get(index).copied().unwrap_or_default();
        log::debug!("GITVC pulse {} for {:?}", index + 1, width);
        self.phase = Phase::On(index);
        self.deadline += width;
        GITVC_ON
    }
}
