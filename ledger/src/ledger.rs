//! Increment-only reward and progress operations.
//!
//! The `stage_*` methods add increments to a caller's [`WriteBatch`] so rewards
//! commit atomically with the records that earned them. `increment` and
//! `increment_community` are the standalone single-commit forms.

use crate::error::LedgerError;
use crate::record::{CommunityProgress, LedgerField, RewardLedger};
use terra_store::{
    decode_doc, paths, CommitReceipt, DocumentStore, FieldPath, WriteBatch, WriteOp,
};
use terra_types::{QuarterKey, RewardAmount, UserId};
use tracing::{debug, info};

pub const COMMUNITY_TOTAL: &str = "totalTasks";
pub const COMMUNITY_CONTRIBUTIONS: &str = "contributions";

fn as_delta(amount: u64) -> Result<i64, LedgerError> {
    i64::try_from(amount).map_err(|_| LedgerError::AmountTooLarge(amount))
}

/// Engine for the reward ledger and the community progress counter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ledger;

impl Ledger {
    /// Stage `field += amount` on the user's document. Zero is a no-op.
    pub fn stage_increment(
        &self,
        batch: &mut WriteBatch,
        user: &UserId,
        field: LedgerField,
        amount: u64,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let op = WriteOp::merge(paths::user(user)?).increment(FieldPath::new(field.key()), as_delta(amount)?);
        batch.push(op);
        Ok(())
    }

    /// Stage the coin and point increments for `reward` in one write.
    pub fn stage_reward(
        &self,
        batch: &mut WriteBatch,
        user: &UserId,
        reward: RewardAmount,
    ) -> Result<(), LedgerError> {
        if reward.is_zero() {
            return Ok(());
        }
        let op = WriteOp::merge(paths::user(user)?)
            .increment(FieldPath::new(LedgerField::TerraCoins.key()), as_delta(reward.coins)?)
            .increment(FieldPath::new(LedgerField::TerraPoints.key()), as_delta(reward.points)?);
        batch.push(op);
        Ok(())
    }

    /// Stage the quarterly community total and the user's contribution.
    pub fn stage_community(
        &self,
        batch: &mut WriteBatch,
        quarter: QuarterKey,
        user: &UserId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Ok(());
        }
        let delta = as_delta(amount)?;
        let op = WriteOp::merge(paths::community_progress(quarter)?)
            .increment(FieldPath::new(COMMUNITY_TOTAL), delta)
            .increment(FieldPath::new(COMMUNITY_CONTRIBUTIONS).child(user.as_str()), delta);
        batch.push(op);
        Ok(())
    }

    /// `field += amount` as its own commit.
    pub fn increment(
        &self,
        store: &dyn DocumentStore,
        user: &UserId,
        field: LedgerField,
        amount: u64,
    ) -> Result<CommitReceipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let mut batch = WriteBatch::new();
        self.stage_increment(&mut batch, user, field, amount)?;
        let receipt = store.commit(batch)?;
        info!(user = %user, %field, amount, "ledger increment");
        Ok(receipt)
    }

    /// Community progress `+= amount` for `quarter`, attributed to `user`.
    pub fn increment_community(
        &self,
        store: &dyn DocumentStore,
        quarter: QuarterKey,
        user: &UserId,
        amount: u64,
    ) -> Result<CommitReceipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let mut batch = WriteBatch::new();
        self.stage_community(&mut batch, quarter, user, amount)?;
        let receipt = store.commit(batch)?;
        info!(%quarter, user = %user, amount, "community progress increment");
        Ok(receipt)
    }

    /// Current balances; all zero for a user with no ledger fields yet.
    pub fn read(&self, store: &dyn DocumentStore, user: &UserId) -> Result<RewardLedger, LedgerError> {
        let doc = store.get(&paths::user(user)?)?;
        debug!(user = %user, found = doc.is_some(), "ledger read");
        match doc {
            Some(doc) => Ok(decode_doc(doc)?),
            None => Ok(RewardLedger::default()),
        }
    }

    pub fn read_community(
        &self,
        store: &dyn DocumentStore,
        quarter: QuarterKey,
    ) -> Result<CommunityProgress, LedgerError> {
        match store.get(&paths::community_progress(quarter)?)? {
            Some(doc) => Ok(decode_doc(doc)?),
            None => Ok(CommunityProgress::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use terra_nullables::NullStore;
    use terra_types::DayKey;

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn quarter() -> QuarterKey {
        DayKey::from_ymd(2026, 10, 14).unwrap().quarter()
    }

    #[test]
    fn increments_accumulate() {
        let store = NullStore::new();
        let alice = user("alice");
        Ledger.increment(&store, &alice, LedgerField::TerraCoins, 5).unwrap();
        Ledger.increment(&store, &alice, LedgerField::TerraCoins, 7).unwrap();
        Ledger.increment(&store, &alice, LedgerField::TasksFinished, 1).unwrap();
        let ledger = Ledger.read(&store, &alice).unwrap();
        assert_eq!(ledger.terra_coins, 12);
        assert_eq!(ledger.get(LedgerField::TasksFinished), 1);
        assert_eq!(ledger.terra_points, 0);
    }

    #[test]
    fn zero_increment_is_rejected() {
        let store = NullStore::new();
        let err = Ledger.increment(&store, &user("a"), LedgerField::TerraPoints, 0).unwrap_err();
        assert_eq!(err, LedgerError::ZeroAmount);
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn oversized_increment_is_rejected() {
        let store = NullStore::new();
        let err = Ledger.increment(&store, &user("a"), LedgerField::TerraPoints, u64::MAX).unwrap_err();
        assert_eq!(err, LedgerError::AmountTooLarge(u64::MAX));
    }

    #[test]
    fn unknown_user_reads_as_zero() {
        let store = NullStore::new();
        assert_eq!(Ledger.read(&store, &user("nobody")).unwrap(), RewardLedger::default());
    }

    #[test]
    fn community_progress_tracks_contributors() {
        let store = NullStore::new();
        Ledger.increment_community(&store, quarter(), &user("alice"), 3).unwrap();
        Ledger.increment_community(&store, quarter(), &user("bob"), 2).unwrap();
        Ledger.increment_community(&store, quarter(), &user("alice"), 1).unwrap();
        let progress = Ledger.read_community(&store, quarter()).unwrap();
        assert_eq!(progress.total_tasks, 6);
        assert_eq!(progress.contributions["alice"], 4);
        assert_eq!(progress.contributions["bob"], 2);
    }

    #[test]
    fn staged_reward_commits_with_batch() {
        let store = NullStore::new();
        let alice = user("alice");
        let mut batch = WriteBatch::new();
        Ledger.stage_reward(&mut batch, &alice, RewardAmount::new(10, 5)).unwrap();
        Ledger.stage_reward(&mut batch, &alice, RewardAmount::ZERO).unwrap();
        assert_eq!(batch.len(), 1);
        store.commit(batch).unwrap();
        let ledger = Ledger.read(&store, &alice).unwrap();
        assert_eq!((ledger.terra_points, ledger.terra_coins), (10, 5));
    }

    #[test]
    fn concurrent_increments_commute() {
        let store = Arc::new(NullStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let u = user(&format!("u{i}"));
                    for _ in 0..10 {
                        Ledger.increment_community(store.as_ref(), quarter(), &u, 1).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let progress = Ledger.read_community(store.as_ref(), quarter()).unwrap();
        assert_eq!(progress.total_tasks, 80);
        assert_eq!(progress.contributions.len(), 8);
    }
}
