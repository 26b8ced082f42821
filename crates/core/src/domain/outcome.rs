// Outcomes of uniqueness-aware operations
//
// Duplicates are an expected business result, not an error.

use serde::{Deserialize, Serialize};

/// Gate decision for a unique job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Lock newly held
    Admitted,
    /// Lock already held by a pending instance
    Duplicate,
}

/// Result of an enqueue call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnqueueOutcome {
    /// Plain job pushed, no uniqueness involved
    Enqueued,
    /// Unique job pushed, lock acquired
    Admitted,
    /// Unique job already pending, nothing pushed
    Duplicate,
}

impl EnqueueOutcome {
    /// Whether a descriptor was pushed to the underlying queue
    pub fn was_pushed(&self) -> bool {
        !matches!(self, EnqueueOutcome::Duplicate)
    }
}

impl From<Admission> for EnqueueOutcome {
    fn from(admission: Admission) -> Self {
        match admission {
            Admission::Admitted => EnqueueOutcome::Admitted,
            Admission::Duplicate => EnqueueOutcome::Duplicate,
        }
    }
}

impl std::fmt::Display for EnqueueOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnqueueOutcome::Enqueued | EnqueueOutcome::Admitted => write!(f, "OK"),
            EnqueueOutcome::Duplicate => write!(f, "EXISTED"),
        }
    }
}

/// Answer to "is this job pending?"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingStatus {
    Pending,
    NotPending,
    /// The job type is not unique, so pending-ness is not tracked
    NotApplicable,
}

impl PendingStatus {
    /// `Some(bool)` for unique job types, `None` otherwise
    pub fn as_option(&self) -> Option<bool> {
        match self {
            PendingStatus::Pending => Some(true),
            PendingStatus::NotPending => Some(false),
            PendingStatus::NotApplicable => None,
        }
    }
}

impl From<bool> for PendingStatus {
    fn from(pending: bool) -> Self {
        if pending {
            PendingStatus::Pending
        } else {
            PendingStatus::NotPending
        }
    }
}

impl std::fmt::Display for PendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingStatus::Pending => write!(f, "PENDING"),
            PendingStatus::NotPending => write!(f, "NOT_PENDING"),
            PendingStatus::NotApplicable => write!(f, "NOT_APPLICABLE"),
        }
    }
}
