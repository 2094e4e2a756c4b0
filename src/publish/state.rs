//! Publish lifecycle
//!
//! ```text
//! Idle -> Cleared -> Loaded -> MoveRequested -> Published
//!   \________\__________\___________\_______-> Failed
//! ```

use serde::{Deserialize, Serialize};

/// Stage a publish has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    /// Nothing has been sent to the store
    Idle,
    /// Staging rows for this publish's scope are deleted (uncommitted)
    Cleared,
    /// Every encoded row is in staging (uncommitted)
    Loaded,
    /// The move operation has been issued
    MoveRequested,
    /// The move succeeded and the transaction committed
    Published,
    /// The transaction was rolled back or never started
    Failed,
}

impl PublishState {
    /// Check whether `next` directly follows this state
    pub fn can_advance_to(&self, next: PublishState) -> bool {
        use PublishState::*;

        matches!(
            (self, next),
            (Idle, Cleared)
                | (Cleared, Loaded)
                | (Loaded, MoveRequested)
                | (MoveRequested, Published)
                | (Idle | Cleared | Loaded | MoveRequested, Failed)
        )
    }

    /// Published or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, PublishState::Published | PublishState::Failed)
    }
}

impl std::fmt::Display for PublishState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PublishState::Idle => "idle",
            PublishState::Cleared => "cleared",
            PublishState::Loaded => "loaded",
            PublishState::MoveRequested => "move requested",
            PublishState::Published => "published",
            PublishState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Tracks one publish through its states
#[derive(Debug, Clone)]
pub(crate) struct StateTracker {
    current: PublishState,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: PublishState::Idle,
        }
    }

    pub(crate) fn current(&self) -> PublishState {
        self.current
    }

    pub(crate) fn advance(&mut self, next: PublishState) {
        debug_assert!(
            self.current.can_advance_to(next),
            "invalid publish transition {} -> {}",
            self.current,
            next
        );
        tracing::trace!(from = %self.current, to = %next, "Publish state");
        self.current = next;
    }
}
