//! Graph-scoped reentrancy state.
//!
//! Export and import are multi-step mutations; while one is active, further
//! export triggers are dropped and the dynamic-retype cascade is suppressed.
//! The holder of a non-idle state must call [`SessionFlag::end`] on every
//! exit path, including error returns, so a crashed pass never leaves the
//! session wedged.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Exporting,
    Importing,
}

#[derive(Debug, Default)]
pub struct SessionFlag {
    state: SessionState,
}

impl SessionFlag {
    pub fn new() -> Self {
        SessionFlag::default()
    }

    pub fn current(&self) -> SessionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == SessionState::Idle
    }

    /// Transition from `Idle` into `next`. Returns false — the trigger is
    /// dropped — when a pass is already in flight.
    pub fn try_begin(&mut self, next: SessionState) -> bool {
        if self.state != SessionState::Idle || next == SessionState::Idle {
            return false;
        }
        self.state = next;
        true
    }

    pub fn end(&mut self) {
        self.state = SessionState::Idle;
    }
}
