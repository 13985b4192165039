//! Canonical record locations.
//!
//! ```text
//! users/{userId}                                   reward ledger fields
//! users/{userId}/completions/{day}                 completion record
//! users/{userId}/verifications/{day}               verification record + dailyEasyTaskIds
//! users/{userId}/assigned_verifications/{key}      reviewer batches; key starts with the day
//! community_progress/{year}-Q{n}                   shared quarterly counter
//! ```

use crate::error::StoreError;
use crate::path::{CollectionPath, DocPath};
use terra_types::{DayKey, QuarterKey, UserId};

pub const USERS: &str = "users";
pub const COMPLETIONS: &str = "completions";
pub const VERIFICATIONS: &str = "verifications";
pub const ASSIGNED_VERIFICATIONS: &str = "assigned_verifications";
pub const COMMUNITY_PROGRESS: &str = "community_progress";

pub fn user(user: &UserId) -> Result<DocPath, StoreError> {
    DocPath::from_segments([USERS, user.as_str()])
}

pub fn completions(user: &UserId, day: DayKey) -> Result<DocPath, StoreError> {
    DocPath::from_segments([USERS, user.as_str(), COMPLETIONS, &day.to_string()])
}

pub fn verifications(user: &UserId, day: DayKey) -> Result<DocPath, StoreError> {
    DocPath::from_segments([USERS, user.as_str(), VERIFICATIONS, &day.to_string()])
}

pub fn assigned_verifications(user: &UserId, key: &str) -> Result<DocPath, StoreError> {
    DocPath::from_segments([USERS, user.as_str(), ASSIGNED_VERIFICATIONS, key])
}

pub fn assigned_verifications_collection(user: &UserId) -> Result<CollectionPath, StoreError> {
    CollectionPath::from_segments([USERS, user.as_str(), ASSIGNED_VERIFICATIONS])
}

pub fn community_progress(quarter: QuarterKey) -> Result<DocPath, StoreError> {
    DocPath::from_segments([COMMUNITY_PROGRESS, &quarter.to_string()])
}
