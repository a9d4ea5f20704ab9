//! Request lifecycle state machine and cooperative cancellation.
//!
//! ```text
//! Received -> Validated -> ConflictChecked -> WorkloadChecked -> Committed
//!     \____________\______________\________________\
//!                                                   -> Rejected | Cancelled
//! ```

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::{AllocationError, AllocationResult};
use crate::models::RequestId;

/// Stage of an allocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationState {
    Received,
    Validated,
    ConflictChecked,
    WorkloadChecked,
    Committed,
    Rejected,
    Cancelled,
}

impl AllocationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationState::Received => "received",
            AllocationState::Validated => "validated",
            AllocationState::ConflictChecked => "conflict_checked",
            AllocationState::WorkloadChecked => "workload_checked",
            AllocationState::Committed => "committed",
            AllocationState::Rejected => "rejected",
            AllocationState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AllocationState::Committed | AllocationState::Rejected | AllocationState::Cancelled
        )
    }

    /// The forward step from this state, if any.
    fn successor(&self) -> Option<AllocationState> {
        match self {
            AllocationState::Received => Some(AllocationState::Validated),
            AllocationState::Validated => Some(AllocationState::ConflictChecked),
            AllocationState::ConflictChecked => Some(AllocationState::WorkloadChecked),
            AllocationState::WorkloadChecked => Some(AllocationState::Committed),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: AllocationState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            AllocationState::Rejected | AllocationState::Cancelled => true,
            other => self.successor() == Some(other),
        }
    }
}

impl fmt::Display for AllocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Illegal lifecycle step. Only reachable through a coordinator bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Illegal transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: AllocationState,
    pub to: AllocationState,
}

/// Tracks one request through the state machine.
#[derive(Debug, Clone)]
pub struct RequestLifecycle {
    request: RequestId,
    state: AllocationState,
    history: Vec<AllocationState>,
}

impl RequestLifecycle {
    pub fn new(request: RequestId) -> Self {
        debug!("Request {} {}", request, AllocationState::Received);
        Self {
            request,
            state: AllocationState::Received,
            history: vec![AllocationState::Received],
        }
    }

    pub fn request(&self) -> RequestId {
        self.request
    }

    pub fn state(&self) -> AllocationState {
        self.state
    }

    /// Every state visited, in order.
    pub fn history(&self) -> &[AllocationState] {
        &self.history
    }

    pub fn advance(&mut self, next: AllocationState) -> Result<(), IllegalTransition> {
        if !self.state.can_transition_to(next) {
            return Err(IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("Request {} {} -> {}", self.request, self.state, next);
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Rejected` unless already terminal.
    pub fn reject(&mut self) {
        if !self.state.is_terminal() {
            debug!("Request {} {} -> rejected", self.request, self.state);
            self.state = AllocationState::Rejected;
            self.history.push(AllocationState::Rejected);
        }
    }

    /// Move to `Cancelled` and build the matching error, naming the stage
    /// the request had reached.
    pub fn cancel(&mut self) -> AllocationError {
        let stage = self.state;
        if !stage.is_terminal() {
            debug!("Request {} {} -> cancelled", self.request, stage);
            self.state = AllocationState::Cancelled;
            self.history.push(AllocationState::Cancelled);
        }
        AllocationError::Cancelled { stage }
    }

    /// Return `Cancelled` if `flag` is raised, otherwise do nothing.
    pub fn checkpoint(&mut self, flag: &CancellationFlag) -> AllocationResult<()> {
        if flag.is_cancelled() {
            return Err(self.cancel());
        }
        Ok(())
    }
}

/// Shared cancellation signal for one in-flight request.
///
/// Clones share the same flag. Raising it is cooperative: the coordinator
/// notices at the next checkpoint and rolls back whatever it has written.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
