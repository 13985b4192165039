//! Per-day record schemas.
//!
//! Each per-day document is a map keyed by task id. The verification record
//! additionally carries the reserved [`DAILY_EASY_TASK_IDS`] key holding the
//! day's proof-required subset.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use terra_store::{DocPath, Document, StoreError};
use terra_types::{DayKey, PhotoUrl, TaskId, Timestamp, UserId};

use crate::error::ValidationError;

/// Reserved verification-record key; never a task id.
pub const DAILY_EASY_TASK_IDS: &str = "dailyEasyTaskIds";

/// Field names inside record entries.
pub mod fields {
    pub const TASK_ID: &str = "taskId";
    pub const OWNER_ID: &str = "ownerId";
    pub const PHOTO_URL: &str = "photoUrl";
    pub const STATUS: &str = "status";
    pub const VERIFIED_BY: &str = "verifiedBy";
    pub const VERIFIED_AT: &str = "verifiedAt";
    pub const NOTES: &str = "notes";
    pub const POINTS_EARNED: &str = "pointsEarned";
    pub const COINS_EARNED: &str = "coinsEarned";
    pub const FINISHED_AT: &str = "finishedAt";
    pub const REWARD_CREDITED: &str = "rewardCredited";
}

/// `pending → approved` or `pending → rejected`; both terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationStatus::Pending)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewer's verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn status(&self) -> VerificationStatus {
        match self {
            Decision::Approved => VerificationStatus::Approved,
            Decision::Rejected => VerificationStatus::Rejected,
        }
    }
}

impl FromStr for Decision {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            other => Err(ValidationError::InvalidDecision(other.to_string())),
        }
    }
}

/// `""` in the store means "nobody yet".
mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};
    use terra_types::UserId;

    pub fn serialize<S: Serializer>(v: &Option<UserId>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(v.as_ref().map(UserId::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<UserId>, D::Error> {
        let raw = String::deserialize(d)?;
        if raw.is_empty() {
            return Ok(None);
        }
        UserId::new(raw).map(Some).map_err(serde::de::Error::custom)
    }
}

/// Audit record of one submitted proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationEntry {
    pub task_id: TaskId,
    pub photo_url: Option<PhotoUrl>,
    pub status: VerificationStatus,
    #[serde(default, with = "empty_as_none")]
    pub verified_by: Option<UserId>,
    #[serde(default)]
    pub verified_at: Option<Timestamp>,
    #[serde(default)]
    pub notes: String,
}

impl VerificationEntry {
    pub fn pending(task_id: TaskId, photo_url: Option<PhotoUrl>) -> Self {
        Self {
            task_id,
            photo_url,
            status: VerificationStatus::Pending,
            verified_by: None,
            verified_at: None,
            notes: String::new(),
        }
    }
}

/// Reviewer-side copy of another user's verification entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedVerificationEntry {
    pub task_id: TaskId,
    pub owner_id: UserId,
    #[serde(default)]
    pub photo_url: Option<PhotoUrl>,
    pub status: VerificationStatus,
    #[serde(default, with = "empty_as_none")]
    pub verified_by: Option<UserId>,
    #[serde(default)]
    pub verified_at: Option<Timestamp>,
    #[serde(default)]
    pub notes: String,
}

/// One credited task in the completion record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEntry {
    pub points_earned: u64,
    pub coins_earned: u64,
    #[serde(default)]
    pub finished_at: Option<Timestamp>,
    #[serde(default)]
    pub photo_url: Option<PhotoUrl>,
    /// False while rewards wait for approval.
    #[serde(default = "credited_by_default")]
    pub reward_credited: bool,
}

fn credited_by_default() -> bool {
    true
}

/// `users/{u}/completions/{day}`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompletionRecord {
    pub entries: BTreeMap<TaskId, CompletionEntry>,
}

impl CompletionRecord {
    pub fn from_doc(doc: Option<&Document>) -> Result<Self, StoreError> {
        let mut entries = BTreeMap::new();
        for (key, value) in doc.into_iter().flatten() {
            let task = TaskId::new(key.clone())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let entry: CompletionEntry = serde_json::from_value(value.clone())
                .map_err(|e| StoreError::Serialization(format!("completion {key}: {e}")))?;
            entries.insert(task, entry);
        }
        Ok(Self { entries })
    }

    pub fn contains(&self, task: &TaskId) -> bool {
        self.entries.contains_key(task)
    }

    pub fn task_ids(&self) -> BTreeSet<TaskId> {
        self.entries.keys().cloned().collect()
    }
}

/// `users/{u}/verifications/{day}`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationRecord {
    /// `None` until the day's assignment has been drawn.
    pub daily_easy_task_ids: Option<BTreeSet<TaskId>>,
    pub entries: BTreeMap<TaskId, VerificationEntry>,
}

impl VerificationRecord {
    pub fn from_doc(doc: Option<&Document>) -> Result<Self, StoreError> {
        let mut record = Self::default();
        for (key, value) in doc.into_iter().flatten() {
            if key == DAILY_EASY_TASK_IDS {
                let ids: BTreeSet<TaskId> = serde_json::from_value(value.clone())
                    .map_err(|e| StoreError::Serialization(format!("{DAILY_EASY_TASK_IDS}: {e}")))?;
                record.daily_easy_task_ids = Some(ids);
                continue;
            }
            let task = TaskId::new(key.clone())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let entry: VerificationEntry = serde_json::from_value(value.clone())
                .map_err(|e| StoreError::Serialization(format!("verification {key}: {e}")))?;
            record.entries.insert(task, entry);
        }
        Ok(record)
    }

    /// Whether a photo for `task` counts toward the day's proof quota: hard
    /// tasks, and easy tasks in the stored daily draw.
    pub fn counts_toward_quota(&self, task: &TaskId, is_hard: bool) -> bool {
        is_hard
            || self
                .daily_easy_task_ids
                .as_ref()
                .is_some_and(|ids| ids.contains(task))
    }

    /// Quota-counting proofs already submitted today. Photos for optional easy
    /// tasks do not count.
    pub fn required_proof_count(&self, is_hard: impl Fn(&TaskId) -> bool) -> usize {
        self.entries
            .values()
            .filter(|e| e.photo_url.is_some())
            .filter(|e| self.counts_toward_quota(&e.task_id, is_hard(&e.task_id)))
            .count()
    }
}

/// A mirrored entry found in one of the reviewer's assigned-verification documents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirrorLocation {
    pub path: DocPath,
    pub key: String,
    pub entry: AssignedVerificationEntry,
}

/// Find the pending sub-entry for `(task, owner)` among a reviewer's batch documents.
///
/// Mirrors that already carry a decision are never matched. Sub-keys that do not
/// decode as assigned entries are skipped; those documents are produced by an
/// outside process and may carry other fields.
pub fn find_mirror(
    docs: &[(DocPath, Document)],
    task: &TaskId,
    owner: &UserId,
) -> Option<MirrorLocation> {
    docs.iter().find_map(|(path, doc)| {
        doc.iter().find_map(|(key, value)| {
            let entry: AssignedVerificationEntry = serde_json::from_value(value.clone()).ok()?;
            let matches = entry.task_id == *task
                && entry.owner_id == *owner
                && entry.status == VerificationStatus::Pending;
            matches.then(|| MirrorLocation {
                path: path.clone(),
                key: key.clone(),
                entry,
            })
        })
    })
}

/// The persisted and derived view of one user's day.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyAssignment {
    pub user_id: UserId,
    pub date: DayKey,
    /// Outstanding easy tasks that need proof today. A subset of the stored draw.
    pub daily_easy_task_ids: BTreeSet<TaskId>,
    pub outstanding_easy: Vec<TaskId>,
    pub outstanding_hard: Vec<TaskId>,
    pub completed: BTreeSet<TaskId>,
    /// Whether this call drew and persisted the subset.
    pub created: bool,
}

impl DailyAssignment {
    pub fn requires_proof(&self, task: &TaskId) -> bool {
        self.daily_easy_task_ids.contains(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        match v {
            serde_json::Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn pending_entry_stores_empty_verifier() {
        let entry = VerificationEntry::pending(TaskId::new("t1").unwrap(), None);
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            v,
            json!({
                "taskId": "t1",
                "photoUrl": null,
                "status": "pending",
                "verifiedBy": "",
                "verifiedAt": null,
                "notes": ""
            })
        );
        let back: VerificationEntry = serde_json::from_value(v).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn verification_record_separates_reserved_key() {
        let d = doc(json!({
            "dailyEasyTaskIds": ["a", "b"],
            "a": {"taskId": "a", "photoUrl": "https://img/1", "status": "pending", "verifiedBy": "", "verifiedAt": null, "notes": ""},
            "h": {"taskId": "h", "photoUrl": null, "status": "approved", "verifiedBy": "rev", "verifiedAt": 12, "notes": ""}
        }));
        let record = VerificationRecord::from_doc(Some(&d)).unwrap();
        assert_eq!(record.daily_easy_task_ids.as_ref().map(|s| s.len()), Some(2));
        assert_eq!(record.entries.len(), 2);
        // "a" is in the draw; "h" would count only if hard, and it has no photo.
        assert_eq!(record.required_proof_count(|_| false), 1);
        assert_eq!(record.required_proof_count(|_| true), 1);
        let h = &record.entries[&TaskId::new("h").unwrap()];
        assert_eq!(h.verified_by.as_ref().map(UserId::as_str), Some("rev"));
        assert_eq!(h.verified_at, Some(Timestamp::new(12)));
    }

    #[test]
    fn optional_easy_photos_do_not_count_toward_quota() {
        let d = doc(json!({
            "dailyEasyTaskIds": ["e0"],
            "e3": {"taskId": "e3", "photoUrl": "https://img/3", "status": "pending", "verifiedBy": "", "verifiedAt": null, "notes": ""},
            "e4": {"taskId": "e4", "photoUrl": "https://img/4", "status": "pending", "verifiedBy": "", "verifiedAt": null, "notes": ""},
            "h0": {"taskId": "h0", "photoUrl": "https://img/h", "status": "pending", "verifiedBy": "", "verifiedAt": null, "notes": ""}
        }));
        let record = VerificationRecord::from_doc(Some(&d)).unwrap();
        let count = record.required_proof_count(|t| t.as_str().starts_with('h'));
        assert_eq!(count, 1);
        assert!(record.counts_toward_quota(&TaskId::new("e0").unwrap(), false));
        assert!(!record.counts_toward_quota(&TaskId::new("e3").unwrap(), false));
    }

    #[test]
    fn missing_docs_decode_empty() {
        assert_eq!(VerificationRecord::from_doc(None).unwrap(), VerificationRecord::default());
        assert!(CompletionRecord::from_doc(None).unwrap().entries.is_empty());
    }

    #[test]
    fn completion_entry_defaults_to_credited() {
        let d = doc(json!({"t1": {"pointsEarned": 10, "coinsEarned": 5, "finishedAt": 9, "photoUrl": null}}));
        let record = CompletionRecord::from_doc(Some(&d)).unwrap();
        assert!(record.entries[&TaskId::new("t1").unwrap()].reward_credited);
    }

    #[test]
    fn decision_parses_only_known_values() {
        assert_eq!("approved".parse::<Decision>().unwrap(), Decision::Approved);
        assert_eq!("rejected".parse::<Decision>().unwrap().status(), VerificationStatus::Rejected);
        assert_eq!(
            "pending".parse::<Decision>().unwrap_err(),
            ValidationError::InvalidDecision("pending".into())
        );
    }

    #[test]
    fn find_mirror_matches_task_and_owner() {
        let docs = vec![
            (
                DocPath::parse("users/rev/assigned_verifications/2026-10-14").unwrap(),
                doc(json!({
                    "batchNote": "generated",
                    "x1": {"taskId": "t1", "ownerId": "bob", "photoUrl": "u", "status": "pending", "verifiedBy": "", "verifiedAt": null}
                })),
            ),
            (
                DocPath::parse("users/rev/assigned_verifications/2026-10-14_2").unwrap(),
                doc(json!({
                    "y1": {"taskId": "t1", "ownerId": "alice", "photoUrl": "u", "status": "pending", "verifiedBy": "", "verifiedAt": null}
                })),
            ),
        ];
        let task = TaskId::new("t1").unwrap();
        let found = find_mirror(&docs, &task, &UserId::new("alice").unwrap()).unwrap();
        assert_eq!(found.key, "y1");
        assert_eq!(found.path.id(), "2026-10-14_2");
        assert!(find_mirror(&docs, &task, &UserId::new("carol").unwrap()).is_none());
    }

    #[test]
    fn find_mirror_skips_decided_entries() {
        let decided = json!({"taskId": "t1", "ownerId": "bob", "photoUrl": "u", "status": "rejected", "verifiedBy": "rev", "verifiedAt": 7});
        let pending = json!({"taskId": "t1", "ownerId": "bob", "photoUrl": "u", "status": "pending", "verifiedBy": "", "verifiedAt": null});
        let task = TaskId::new("t1").unwrap();
        let bob = UserId::new("bob").unwrap();

        let only_decided = vec![(
            DocPath::parse("users/rev/assigned_verifications/2026-10-14").unwrap(),
            doc(json!({ "x1": decided.clone() })),
        )];
        assert!(find_mirror(&only_decided, &task, &bob).is_none());

        let both = vec![
            (
                DocPath::parse("users/rev/assigned_verifications/2026-10-14").unwrap(),
                doc(json!({ "x1": decided })),
            ),
            (
                DocPath::parse("users/rev/assigned_verifications/2026-10-14_2").unwrap(),
                doc(json!({ "y1": pending })),
            ),
        ];
        let found = find_mirror(&both, &task, &bob).unwrap();
        assert_eq!(found.key, "y1");
        assert_eq!(found.entry.status, VerificationStatus::Pending);
    }
}
