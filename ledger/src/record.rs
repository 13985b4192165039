//! Ledger document shapes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A named increment-only field on the user document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LedgerField {
    TerraCoins,
    TerraPoints,
    TasksFinished,
    ProofsSubmitted,
    /// Reviews performed by the user as a verifier.
    VerificationsCompleted,
    TasksApproved,
    TasksRejected,
}

impl LedgerField {
    pub const ALL: [LedgerField; 7] = [
        LedgerField::TerraCoins,
        LedgerField::TerraPoints,
        LedgerField::TasksFinished,
        LedgerField::ProofsSubmitted,
        LedgerField::VerificationsCompleted,
        LedgerField::TasksApproved,
        LedgerField::TasksRejected,
    ];

    /// Field name in the stored user document.
    pub fn key(&self) -> &'static str {
        match self {
            LedgerField::TerraCoins => "terraCoins",
            LedgerField::TerraPoints => "terraPoints",
            LedgerField::TasksFinished => "tasksFinished",
            LedgerField::ProofsSubmitted => "proofsSubmitted",
            LedgerField::VerificationsCompleted => "verificationsCompleted",
            LedgerField::TasksApproved => "tasksApproved",
            LedgerField::TasksRejected => "tasksRejected",
        }
    }
}

impl fmt::Display for LedgerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The ledger fields of a user document. Other profile fields are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewardLedger {
    pub terra_coins: u64,
    pub terra_points: u64,
    pub tasks_finished: u64,
    pub proofs_submitted: u64,
    pub verifications_completed: u64,
    pub tasks_approved: u64,
    pub tasks_rejected: u64,
}

impl RewardLedger {
    pub fn get(&self, field: LedgerField) -> u64 {
        match field {
            LedgerField::TerraCoins => self.terra_coins,
            LedgerField::TerraPoints => self.terra_points,
            LedgerField::TasksFinished => self.tasks_finished,
            LedgerField::ProofsSubmitted => self.proofs_submitted,
            LedgerField::VerificationsCompleted => self.verifications_completed,
            LedgerField::TasksApproved => self.tasks_approved,
            LedgerField::TasksRejected => self.tasks_rejected,
        }
    }
}

/// Shared per-quarter progress across all users.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommunityProgress {
    pub total_tasks: u64,
    /// Tasks contributed, keyed by user id.
    pub contributions: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_keys_are_unique() {
        let mut keys: Vec<&str> = LedgerField::ALL.iter().map(|f| f.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), LedgerField::ALL.len());
    }
}
