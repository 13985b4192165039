use terra_types::TerraError;
use terra_verification::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("config error: {0}")]
    Config(String),

    #[error("{op} timed out after {after_ms} ms")]
    Timeout { op: &'static str, after_ms: u64 },

    #[error("{op} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        op: &'static str,
        attempts: u32,
        #[source]
        last: EngineError,
    },

    /// A timed-out attempt committed after all; the retry found its result.
    #[error("{op} was committed by an earlier timed-out attempt: {outcome}")]
    CommittedByEarlierAttempt {
        op: &'static str,
        #[source]
        outcome: EngineError,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid input: {0}")]
    Input(#[from] TerraError),

    #[error("worker task failed: {0}")]
    Join(String),
}

impl ServiceError {
    /// The request already took effect on an earlier call.
    pub fn is_idempotent_noop(&self) -> bool {
        match self {
            ServiceError::CommittedByEarlierAttempt { .. } => true,
            ServiceError::Engine(e) => e.is_idempotent_noop(),
            _ => false,
        }
    }

    pub fn engine_error(&self) -> Option<&EngineError> {
        match self {
            ServiceError::Engine(e)
            | ServiceError::RetriesExhausted { last: e, .. }
            | ServiceError::CommittedByEarlierAttempt { outcome: e, .. } => Some(e),
            _ => None,
        }
    }
}
