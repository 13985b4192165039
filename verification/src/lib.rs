//! Daily task verification.
//!
//! Three flows over a shared document store:
//! 1. **Assignment**: once per user and day, draw the easy tasks that need photo proof.
//! 2. **Submission**: record completions, upload evidence, credit rewards in one batch.
//! 3. **Resolution**: a peer reviewer approves or rejects a pending proof.
//!
//! Rewards and counters go through [`terra_ledger`], which only increments.

pub mod assignment;
pub mod engine;
pub mod error;
pub mod records;
pub mod resolution;
pub mod submission;

pub use assignment::{AssignmentGenerator, DaySnapshot};
pub use engine::VerificationEngine;
pub use error::{EngineError, ValidationError};
pub use records::{
    AssignedVerificationEntry, CompletionEntry, CompletionRecord, DailyAssignment, Decision,
    VerificationEntry, VerificationRecord, VerificationStatus,
};
pub use resolution::{validate_decision, MirrorUpdate, ResolveOutcome, ResolveRequest, Resolver};
pub use submission::{Evidence, SubmissionPipeline, SubmissionReceipt, TaskSubmission};
