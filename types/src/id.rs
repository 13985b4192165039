//! Identifier newtypes.
//!
//! All identifiers are opaque non-empty strings. They end up as path segments in
//! the record store, so a `/` is never allowed inside one.

use crate::error::TerraError;
use serde::{Deserialize, Serialize};
use std::fmt;

fn valid_segment(s: &str) -> bool {
    !s.trim().is_empty() && !s.contains('/')
}

/// An account identifier as issued by the authentication provider.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Result<Self, TerraError> {
        let s = raw.into();
        if !valid_segment(&s) {
            return Err(TerraError::InvalidUserId(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserId {
    type Error = TerraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// A task catalog identifier. Also used as the sub-key of per-day records.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Result<Self, TerraError> {
        let s = raw.into();
        if !valid_segment(&s) {
            return Err(TerraError::InvalidTaskId(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaskId {
    type Error = TerraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

/// Location of an uploaded proof photo on the media host.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhotoUrl(String);

impl PhotoUrl {
    pub fn new(raw: impl Into<String>) -> Result<Self, TerraError> {
        let s = raw.into();
        if s.trim().is_empty() {
            return Err(TerraError::InvalidPhotoUrl(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhotoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PhotoUrl {
    type Error = TerraError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PhotoUrl> for String {
    fn from(url: PhotoUrl) -> Self {
        url.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ids_are_rejected() {
        assert_eq!(UserId::new(""), Err(TerraError::InvalidUserId(String::new())));
        assert!(TaskId::new("   ").is_err());
        assert!(PhotoUrl::new("").is_err());
    }

    #[test]
    fn slash_in_id_is_rejected() {
        assert!(UserId::new("alice/bob").is_err());
        assert!(TaskId::new("bike/commute").is_err());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TaskId::new("recycle").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"recycle\"");
        let back: TaskId = serde_json::from_str("\"recycle\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn deserializing_empty_id_fails() {
        assert!(serde_json::from_str::<UserId>("\"\"").is_err());
    }
}
