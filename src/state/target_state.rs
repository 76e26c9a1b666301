/// Crawl target state definitions
///
/// Every queued URL moves through these states exactly as the transition table
/// below allows.
use crate::{Result, SitegroveError};
use std::fmt;

/// Represents the current state of a crawl target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    // ===== Active States =====
    /// Enqueued in the frontier, not yet dispatched
    Pending,

    /// Currently being fetched
    Active,

    /// Failed transiently and re-enqueued ahead of fresh targets
    RetryPending,

    // ===== Terminal States =====
    /// Fetched and extracted successfully
    Completed,

    /// Gave up: non-retryable error or retries exhausted
    Failed,
}

impl TargetState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the transition `self -> next` is allowed
    ///
    /// | from          | to                                |
    /// |---------------|-----------------------------------|
    /// | pending       | active                            |
    /// | retry-pending | active                            |
    /// | active        | completed, retry-pending, failed  |
    pub fn can_transition_to(&self, next: TargetState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::RetryPending, Self::Active)
                | (Self::Active, Self::Completed)
                | (Self::Active, Self::RetryPending)
                | (Self::Active, Self::Failed)
        )
    }

    /// Validates and performs a transition for the target identified by `key`
    pub fn transition(self, key: &str, next: TargetState) -> Result<TargetState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SitegroveError::InvalidTransition {
                key: key.to_string(),
                from: self,
                to: next,
            })
        }
    }

    /// Stable string form used in logs and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::RetryPending => "retry-pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible target states
    pub fn all_states() -> [Self; 5] {
        [
            Self::Pending,
            Self::Active,
            Self::RetryPending,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
