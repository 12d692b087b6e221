//! Function-pointer state machine for the ignition sequence.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  StateTable                                                │
//! │  ┌───────────────┬──────────┬─────────┬──────────────────┐ │
//! │  │ BurnState     │ on_enter │ on_exit │ on_update        │ │
//! │  ├───────────────┼──────────┼─────────┼──────────────────┤ │
//! │  │ Idle          │ fn(ctx)  │    —    │ fn(ctx)->Option<>│ │
//! │  │ Igniting      │ fn(ctx)  │    —    │ fn(ctx)->Option<>│ │
//! │  │ MainValveOpen │ fn(ctx)  │ fn(ctx) │ fn(ctx)->Option<>│ │
//! │  │ Ending        │ fn(ctx)  │    —    │ fn(ctx)->Option<>│ │
//! │  └───────────────┴──────────┴─────────┴──────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the current state.  If it
//! returns `Some(next)`, the engine runs `on_exit` for the current state,
//! then `on_enter` for the next.  Handlers never touch hardware: they
//! read the input snapshot in [`BurnContext`] and queue pin writes on it.
//! [`IgnitionSequencer`] owns the table, feeds the snapshot, and applies
//! the queued writes after every tick.

pub mod context;
pub mod gitvc;
pub mod sequencer;
pub mod states;

use context::BurnContext;
use log::debug;

pub use context::{BurnOutcome, BurnTiming};
pub use sequencer::IgnitionSequencer;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BurnState {
    Idle = 0,
    Igniting = 1,
    MainValveOpen = 2,
    Ending = 3,
}

impl BurnState {
    /// Total number of states; sizes the table array.
    pub const COUNT: usize = 4;

    /// Convert a table index back to `BurnState`.  Out-of-range indices
    /// map to `Ending`, whose entry action makes every output safe.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Igniting,
            2 => Self::MainValveOpen,
            3 => Self::Ending,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Ending
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// `on_enter` / `on_exit` action.  Runs once per transition.
pub type StateActionFn = fn(&mut BurnContext);

/// Per-tick handler.  `Some(next)` requests a transition.
pub type StateUpdateFn = fn(&mut BurnContext) -> Option<BurnState>;

/// One row of the state table.
pub struct StateDescriptor {
    pub id: BurnState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Indexed by `BurnState as usize`.
    table: [StateDescriptor; BurnState::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; BurnState::COUNT], initial: BurnState) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut BurnContext) {
        debug!("Sequencer starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Run `on_update` for the current state and follow any transition.
    pub fn tick(&mut self, ctx: &mut BurnContext) {
        let next = (self.table[self.current].on_update)(ctx);
        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    pub fn current_state(&self) -> BurnState {
        BurnState::from_index(self.current)
    }

    fn transition(&mut self, next_id: BurnState, ctx: &mut BurnContext) {
        let next_idx = next_id as usize;

        debug!(
            "Sequencer transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
