//! Function-pointer finite state machine for the mailbox alarm.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌──────────┬───────────┬──────────┬─────────────────┐   │
//! │  │ StateId  │ on_enter  │ on_exit  │ on_update       │   │
//! │  ├──────────┼───────────┼──────────┼─────────────────┤   │
//! │  │ Disarmed │ fn(state) │ -        │ fn -> Option<>  │   │
//! │  │ Watching │ fn(state) │ -        │ fn -> Option<>  │   │
//! │  │ Latched  │ fn(state) │ fn(state)│ fn -> Option<>  │   │
//! │  └──────────┴───────────┴──────────┴─────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each sample tick the engine calls `on_update` for the **current**
//! state.  If it returns `Some(next_id)`, the engine runs `on_exit` for
//! the current state, then `on_enter` for the next.  Commands (arm,
//! disarm) do not go through `on_update`; the service applies them with
//! [`Fsm::force_transition`].  All handlers receive `&mut DeviceState`.

pub mod context;
pub mod states;

use context::DeviceState;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all alarm states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    /// Not evaluating samples.
    Disarmed = 0,
    /// Armed, comparing each sample against the threshold.
    Watching = 1,
    /// Armed, alarm fired for this arm cycle.
    Latched = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Disarmed` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Disarmed,
            1 => Self::Watching,
            2 => Self::Latched,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Disarmed
            }
        }
    }

    pub fn is_armed(self) -> bool {
        matches!(self, Self::Watching | Self::Latched)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut DeviceState);

/// Signature for the per-sample update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut DeviceState) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table and the current-state pointer; the
/// [`DeviceState`] it acts on is owned by the caller.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, state: &mut DeviceState) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(state);
        }
    }

    /// Advance the FSM by one sample tick.
    pub fn tick(&mut self, state: &mut DeviceState) {
        let next = (self.table[self.current].on_update)(state);

        if let Some(next_id) = next {
            self.transition(next_id, state);
        }
    }

    /// Transition immediately, skipping `on_update`.  A request for the
    /// current state is a no-op.
    pub fn force_transition(&mut self, next: StateId, state: &mut DeviceState) {
        if next as usize != self.current {
            self.transition(next, state);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, state: &mut DeviceState) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(state);
        }

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(state);
        }
    }
}
