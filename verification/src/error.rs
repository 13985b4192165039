use terra_external::UploadError;
use terra_ledger::LedgerError;
use terra_store::StoreError;
use terra_types::{DayKey, TaskId, UserId};
use thiserror::Error;

use crate::records::VerificationStatus;

/// Caller input that can never succeed as given. Not retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("submission contains no tasks")]
    EmptySubmission,

    #[error("task {0} appears more than once in the submission")]
    DuplicateTask(TaskId),

    #[error("task {0} is not in the catalog")]
    UnknownTask(TaskId),

    #[error("task {0} requires photo evidence")]
    EvidenceRequired(TaskId),

    #[error("invalid decision {0:?}: expected \"approved\" or \"rejected\"")]
    InvalidDecision(String),

    #[error("rejection notes must be at least {min_len} characters, got {actual}")]
    NotesRequired { min_len: usize, actual: usize },

    #[error("a user may not verify their own task")]
    SelfVerification,

    #[error("increment amount must be non-zero")]
    ZeroAmount,

    #[error("increment amount {0} is out of range")]
    AmountTooLarge(u64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The store could not be reached. Retry with backoff.
    #[error("record store unavailable: {0}")]
    Transient(StoreError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Idempotent no-op: the task was already credited for the day.
    #[error("task {0} was already completed today")]
    AlreadyCompleted(TaskId),

    /// Idempotent no-op: the entry left `pending` before this call.
    #[error("verification of task {task} is already {status}")]
    AlreadyResolved {
        task: TaskId,
        status: VerificationStatus,
    },

    #[error("no verification entry for task {task} of {owner} on {date}")]
    TaskNotFound {
        owner: UserId,
        task: TaskId,
        date: DayKey,
    },

    /// The task catalog could not be read. Retry; never fall back to a cached set.
    #[error("task catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// Raised before any record is written.
    #[error("evidence upload for task {task} failed: {source}")]
    EvidenceUploadFailed {
        task: TaskId,
        #[source]
        source: UploadError,
    },

    #[error("store error: {0}")]
    Store(StoreError),
}

impl EngineError {
    /// Whether the caller should retry the whole operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient(_) | EngineError::CatalogUnavailable(_))
    }

    /// Whether the request already took effect and should be treated as success.
    pub fn is_idempotent_noop(&self) -> bool {
        matches!(
            self,
            EngineError::AlreadyCompleted(_) | EngineError::AlreadyResolved { .. }
        )
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        if e.is_transient() {
            EngineError::Transient(e)
        } else {
            EngineError::Store(e)
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ZeroAmount => ValidationError::ZeroAmount.into(),
            LedgerError::AmountTooLarge(n) => ValidationError::AmountTooLarge(n).into(),
            LedgerError::Store(s) => s.into(),
        }
    }
}
