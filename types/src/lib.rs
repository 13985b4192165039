//! Fundamental types for the Terra task verification engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! user and task identifiers, timestamps, calendar day and quarter keys, task
//! definitions, and the policy parameters that drive rewards and proof requirements.

pub mod error;
pub mod id;
pub mod params;
pub mod task;
pub mod time;

pub use error::TerraError;
pub use id::{PhotoUrl, TaskId, UserId};
pub use params::{EngineParams, RewardAmount, RewardTiming};
pub use task::{Difficulty, Task};
pub use time::{DayKey, QuarterKey, Timestamp};
