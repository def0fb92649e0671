//! # Lifecycle state machine.
//!
//! ```text
//!   Created ──► Starting ──► Started ──► Stopping ──► Stopped
//!                  │  │                                  │
//!                  │  └─ stop() ─► Stopping ─┐           │
//!                  ▼                         ▼           │
//!                Failed ◄──── start finishes ┘           │
//!                  │                                     │
//!                  └────────── start again ◄─────────────┘
//! ```
//!
//! ## Rules
//! - `start` is allowed from `Created`, `Stopped` and `Failed`.
//! - `stop` from `Started` proceeds; from `Created`, `Stopped`, `Failed` and
//!   `Stopping` it is a no-op that leaves the state untouched.
//! - `stop` while `Starting` interrupts the start: the state moves to `Stopping`
//!   and the starter ends in `Failed` instead of `Started`.
//! - `Failed` is equivalent to `Stopped` for later stop calls.

use std::sync::{Mutex, PoisonError};

use crate::error::LifecycleError;

/// Observable lifecycle state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Constructed, never started.
    Created,
    /// Start sequence in progress.
    Starting,
    /// Running.
    Started,
    /// Stop sequence in progress.
    Stopping,
    /// Stopped after running.
    Stopped,
    /// Start sequence failed; holds no resources.
    Failed,
}

impl LifecycleState {
    /// True for states that hold no resources and may be started.
    #[inline]
    pub fn is_at_rest(self) -> bool {
        matches!(
            self,
            LifecycleState::Created | LifecycleState::Stopped | LifecycleState::Failed
        )
    }
}

/// What a [`StateCell::begin_stop`] call found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopFrom {
    /// Nothing to stop: at rest or already stopping.
    Idle,
    /// Was `Started`, now `Stopping`; the caller finishes with [`StateCell::finish_stop`].
    Started,
    /// A start was in flight, now `Stopping`; the starter finishes as `Failed`.
    Starting,
}

/// Composed lifecycle state holder.
///
/// Components embed a `StateCell` and drive it from their `start`/`stop`
/// implementations instead of inheriting shared behavior.
#[derive(Debug)]
pub struct StateCell {
    state: Mutex<LifecycleState>,
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    /// Creates a cell in [`LifecycleState::Created`].
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Created),
        }
    }

    /// Returns the current state.
    pub fn get(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn swap(&self, next: LifecycleState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Moves to `Starting`, or fails if the component is not at rest.
    pub fn begin_start(&self, component: &str) -> Result<(), LifecycleError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.is_at_rest() {
            return Err(LifecycleError::InvalidTransition {
                component: component.to_string(),
                state: *state,
                action: "start",
            });
        }
        *state = LifecycleState::Starting;
        Ok(())
    }

    /// Completes a start sequence: `Started` on success, `Failed` otherwise.
    ///
    /// Returns `false` when a `stop` interrupted the start; the state is then
    /// `Failed` regardless of `ok`.
    pub fn finish_start(&self, ok: bool) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let undisturbed = *state == LifecycleState::Starting;
        *state = if ok && undisturbed {
            LifecycleState::Started
        } else {
            LifecycleState::Failed
        };
        undisturbed
    }

    /// Moves `Started` or `Starting` to `Stopping`; every other state is left as is.
    pub fn begin_stop(&self) -> StopFrom {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let from = match *state {
            LifecycleState::Started => StopFrom::Started,
            LifecycleState::Starting => StopFrom::Starting,
            _ => return StopFrom::Idle,
        };
        *state = LifecycleState::Stopping;
        from
    }

    /// Completes a stop sequence.
    pub fn finish_stop(&self) {
        self.swap(LifecycleState::Stopped);
    }

    /// True while `Started`.
    pub fn is_started(&self) -> bool {
        self.get() == LifecycleState::Started
    }
}
