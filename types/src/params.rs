//! Engine parameters: reward amounts and proof-requirement policy.
//!
//! These are policy constants, never user input. The service loads overrides
//! from its TOML configuration.

use crate::task::Difficulty;
use serde::{Deserialize, Serialize};

/// Points and coins credited for one completed task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAmount {
    pub points: u64,
    pub coins: u64,
}

impl RewardAmount {
    pub const ZERO: Self = Self { points: 0, coins: 0 };

    pub fn new(points: u64, coins: u64) -> Self {
        Self { points, coins }
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self {
            points: self.points.saturating_add(other.points),
            coins: self.coins.saturating_add(other.coins),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.points == 0 && self.coins == 0
    }
}

/// When submitted rewards reach the user's balances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardTiming {
    /// Credit immediately at submission. A later rejection does not claw back.
    #[default]
    OnSubmission,
    /// Hold rewards for proof-carrying submissions until a reviewer approves.
    /// Submissions without evidence are still credited immediately.
    OnApproval,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Size of the random easy-task subset that needs proof each day.
    pub daily_proof_task_count: usize,

    /// Once a user has submitted this many proofs in a day, easy tasks no
    /// longer require one.
    pub proof_quota: usize,

    /// Minimum length of trimmed reviewer notes on a rejection.
    pub min_rejection_notes_len: usize,

    pub reward_timing: RewardTiming,

    pub easy_reward: RewardAmount,
    pub hard_reward: RewardAmount,
}

impl EngineParams {
    pub fn reward_for(&self, difficulty: Difficulty) -> RewardAmount {
        match difficulty {
            Difficulty::Easy => self.easy_reward,
            Difficulty::Hard => self.hard_reward,
        }
    }
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            daily_proof_task_count: 3,
            proof_quota: 3,
            min_rejection_notes_len: 5,
            easy_reward: RewardAmount::new(10, 5),
            hard_reward: RewardAmount::new(25, 12),
            reward_timing: RewardTiming::OnSubmission,
        }
    }
}
