//! The caller-facing operations, wired over one store and its collaborators.

use std::sync::Arc;

use terra_external::{EvidenceUploader, RandomSource, TaskCatalog};
use terra_ledger::{CommunityProgress, Ledger, LedgerField, RewardLedger};
use terra_store::{CommitReceipt, DocumentStore};
use terra_types::{DayKey, EngineParams, QuarterKey, UserId};

use crate::assignment::AssignmentGenerator;
use crate::error::EngineError;
use crate::records::DailyAssignment;
use crate::resolution::{ResolveOutcome, ResolveRequest, Resolver};
use crate::submission::{SubmissionPipeline, SubmissionReceipt, TaskSubmission};

/// Every operation is synchronous and independently retryable. Idempotence
/// guards in the store keep retries from duplicating side effects.
#[derive(Clone)]
pub struct VerificationEngine {
    store: Arc<dyn DocumentStore>,
    assignments: AssignmentGenerator,
    submissions: SubmissionPipeline,
    resolver: Resolver,
    ledger: Ledger,
    params: EngineParams,
}

impl VerificationEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        catalog: Arc<dyn TaskCatalog>,
        uploader: Arc<dyn EvidenceUploader>,
        random: Arc<dyn RandomSource>,
        params: EngineParams,
    ) -> Self {
        let assignments = AssignmentGenerator::new(store.clone(), catalog, random, params.clone());
        let submissions =
            SubmissionPipeline::new(store.clone(), uploader, assignments.clone(), params.clone());
        let resolver = Resolver::new(store.clone(), params.clone());
        Self {
            store,
            assignments,
            submissions,
            resolver,
            ledger: Ledger,
            params,
        }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn get_or_create_daily_assignment(
        &self,
        user: &UserId,
        day: DayKey,
    ) -> Result<DailyAssignment, EngineError> {
        self.assignments.get_or_create(user, day)
    }

    pub fn submit_completions(
        &self,
        user: &UserId,
        day: DayKey,
        submissions: Vec<TaskSubmission>,
    ) -> Result<SubmissionReceipt, EngineError> {
        self.submissions.submit(user, day, submissions)
    }

    pub fn resolve(&self, req: &ResolveRequest) -> Result<ResolveOutcome, EngineError> {
        self.resolver.resolve(req)
    }

    /// Standalone counter increment. Zero is rejected as a validation error.
    pub fn increment(
        &self,
        user: &UserId,
        field: LedgerField,
        amount: u64,
    ) -> Result<CommitReceipt, EngineError> {
        Ok(self.ledger.increment(self.store.as_ref(), user, field, amount)?)
    }

    pub fn increment_community(
        &self,
        quarter: QuarterKey,
        user: &UserId,
        amount: u64,
    ) -> Result<CommitReceipt, EngineError> {
        Ok(self
            .ledger
            .increment_community(self.store.as_ref(), quarter, user, amount)?)
    }

    pub fn ledger(&self, user: &UserId) -> Result<RewardLedger, EngineError> {
        Ok(self.ledger.read(self.store.as_ref(), user)?)
    }

    pub fn community_progress(&self, quarter: QuarterKey) -> Result<CommunityProgress, EngineError> {
        Ok(self.ledger.read_community(self.store.as_ref(), quarter)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::records::{Decision, VerificationStatus};
    use terra_nullables::{NullCatalog, NullRandom, NullStore, NullUploader};
    use terra_types::{Difficulty, PhotoUrl, Task, TaskId};

    fn id(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn day() -> DayKey {
        DayKey::from_ymd(2026, 10, 14).unwrap()
    }

    fn engine() -> VerificationEngine {
        let tasks = vec![
            Task::new(id("walk"), Difficulty::Easy, "Walk instead of drive"),
            Task::new(id("bottle"), Difficulty::Easy, "Use a refillable bottle"),
            Task::new(id("lights"), Difficulty::Easy, "Lights off when leaving"),
            Task::new(id("compost"), Difficulty::Easy, "Compost food scraps"),
            Task::new(id("cleanup"), Difficulty::Hard, "Join a beach cleanup"),
        ];
        VerificationEngine::new(
            Arc::new(NullStore::new()),
            Arc::new(NullCatalog::new(tasks)),
            Arc::new(NullUploader::new()),
            Arc::new(NullRandom::first()),
            EngineParams::default(),
        )
    }

    #[test]
    fn submit_then_review_round_trip() {
        let engine = engine();
        let assignment = engine.get_or_create_daily_assignment(&user("bob"), day()).unwrap();
        assert_eq!(assignment.daily_easy_task_ids.len(), 3);

        let url = PhotoUrl::new("https://media.example/cleanup.jpg").unwrap();
        engine
            .submit_completions(
                &user("bob"),
                day(),
                vec![TaskSubmission::with_photo(id("cleanup"), url)],
            )
            .unwrap();

        let outcome = engine
            .resolve(&ResolveRequest {
                verifier: user("carol"),
                owner: user("bob"),
                task_id: id("cleanup"),
                date: day(),
                decision: Decision::Approved,
                notes: String::new(),
            })
            .unwrap();
        assert_eq!(outcome.status, VerificationStatus::Approved);

        let bob = engine.ledger(&user("bob")).unwrap();
        assert_eq!((bob.terra_points, bob.terra_coins, bob.tasks_approved), (25, 12, 1));
        assert_eq!(engine.ledger(&user("carol")).unwrap().verifications_completed, 1);
        assert_eq!(engine.community_progress(day().quarter()).unwrap().total_tasks, 1);
    }

    #[test]
    fn zero_increment_is_validation_error() {
        let engine = engine();
        assert_eq!(
            engine
                .increment(&user("bob"), LedgerField::TerraCoins, 0)
                .unwrap_err(),
            EngineError::Validation(ValidationError::ZeroAmount)
        );
        engine.increment(&user("bob"), LedgerField::TerraCoins, 7).unwrap();
        engine.increment_community(day().quarter(), &user("bob"), 2).unwrap();
        assert_eq!(engine.ledger(&user("bob")).unwrap().terra_coins, 7);
        assert_eq!(
            engine.community_progress(day().quarter()).unwrap().contributions["bob"],
            2
        );
    }
}
