//! Per-request state machine.
//!
//! ```text
//! Received → Validating → Reserving → Dispensing → Committed
//!    │           │            │            └─────→ RolledBack
//!    │           │            └─→ AbortedInsufficient
//!    │           └─→ Rejected
//!    └───────────┴────────────┴─→ Cancelled
//! ```

use dispenser_core::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    /// Accepted by the gateway, waiting for the dispensing head.
    Received,
    /// Profile lookup and volume checks.
    Validating,
    /// Read-only pre-flight over every ingredient.
    Reserving,
    /// Pouring and deducting, one ingredient at a time.
    Dispensing,
    Rejected,
    AbortedInsufficient,
    Committed,
    RolledBack,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::Rejected
                | RequestState::AbortedInsufficient
                | RequestState::Committed
                | RequestState::RolledBack
                | RequestState::Cancelled
        )
    }

    pub fn can_transition_to(self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Received, Validating)
                | (Received, Cancelled)
                | (Validating, Rejected)
                | (Validating, Reserving)
                | (Validating, Cancelled)
                | (Reserving, AbortedInsufficient)
                | (Reserving, Dispensing)
                | (Reserving, Cancelled)
                | (Dispensing, Committed)
                | (Dispensing, RolledBack)
        )
    }
}

/// Tracks one request through the state machine and keeps its path.
#[derive(Debug, Clone)]
pub struct RequestTracker {
    state: RequestState,
    history: Vec<RequestState>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self {
            state: RequestState::Received,
            history: vec![RequestState::Received],
        }
    }
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn history(&self) -> &[RequestState] {
        &self.history
    }

    pub fn advance(&mut self, next: RequestState) -> DomainResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "illegal request transition {:?} -> {next:?}",
                self.state
            )));
        }
        tracing::debug!(from = ?self.state, to = ?next, "request state");
        self.state = next;
        self.history.push(next);
        Ok(())
    }
}
