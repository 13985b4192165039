//! Top-level error type shared across crates.

use thiserror::Error;

/// Errors raised while constructing or parsing the fundamental types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TerraError {
    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("invalid task id: {0:?}")]
    InvalidTaskId(String),

    #[error("invalid photo url: {0:?}")]
    InvalidPhotoUrl(String),

    #[error("invalid day key: {0:?} (expected YYYY-MM-DD)")]
    InvalidDayKey(String),

    #[error("invalid quarter key: {0:?} (expected YYYY-Qn)")]
    InvalidQuarterKey(String),

    #[error("utc offset out of range: {0}s")]
    InvalidUtcOffset(i32),

    #[error("timestamp out of range: {0}s")]
    TimestampOutOfRange(u64),
}
