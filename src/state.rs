//! # Context State Machine
//!
//! A context is single-shot: `NotInitialized → Initializing → Initialized → Used`.
//! `Used` is terminal. The same four states are tracked per registered service.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicI8, Ordering};

/// Lifecycle state of a context or of a single registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    NotInitialized,
    Initializing,
    Initialized,
    /// Terminal. A used context can never be started again.
    Used,
}

impl ContextState {
    /// Numeric code exposed to operational endpoints.
    pub fn code(self) -> i8 {
        match self {
            ContextState::NotInitialized => 0,
            ContextState::Initializing => 1,
            ContextState::Initialized => 2,
            ContextState::Used => -1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ContextState::NotInitialized => "not_initialized",
            ContextState::Initializing => "initialization",
            ContextState::Initialized => "initialized",
            ContextState::Used => "used",
        }
    }

    fn from_code(code: i8) -> Self {
        match code {
            0 => ContextState::NotInitialized,
            1 => ContextState::Initializing,
            2 => ContextState::Initialized,
            _ => ContextState::Used,
        }
    }

    pub fn view(self) -> ContextStateView {
        ContextStateView {
            code: self.code(),
            name: self.name(),
        }
    }
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `(code, name)` pair, the shape external endpoints render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextStateView {
    pub code: i8,
    pub name: &'static str,
}

/// Lock-free mirror of the context state so `state()` never waits on start/stop.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicI8);

impl StateCell {
    pub(crate) fn new(state: ContextState) -> Self {
        Self(AtomicI8::new(state.code()))
    }

    pub(crate) fn get(&self) -> ContextState {
        ContextState::from_code(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ContextState) {
        self.0.store(state.code(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_names_match_operational_contract() {
        let views = [
            (ContextState::NotInitialized, 0, "not_initialized"),
            (ContextState::Initializing, 1, "initialization"),
            (ContextState::Initialized, 2, "initialized"),
        ];
        for (state, code, name) in views {
            assert_eq!(state.view(), ContextStateView { code, name });
        }
        assert_eq!(ContextState::Used.view(), ContextStateView { code: -1, name: "used" });
    }

    #[test]
    fn state_cell_round_trips_every_state() {
        let cell = StateCell::new(ContextState::NotInitialized);
        for state in [
            ContextState::Initializing,
            ContextState::Initialized,
            ContextState::Used,
            ContextState::NotInitialized,
        ] {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }
}
