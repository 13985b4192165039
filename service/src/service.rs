//! Async surface over [`VerificationEngine`].
//!
//! Each call runs the blocking engine on tokio's blocking pool, bounded by the
//! configured timeout. Transient failures are retried with exponential backoff;
//! validation errors and idempotent outcomes return on the first attempt.

use std::sync::Arc;

use terra_external::{Clock, EvidenceUploader, RandomSource, TaskCatalog};
use terra_ledger::{CommunityProgress, LedgerField, RewardLedger};
use terra_store::{CommitReceipt, DocumentStore};
use terra_types::{DayKey, QuarterKey, TerraError, UserId};
use terra_verification::{
    DailyAssignment, EngineError, ResolveOutcome, ResolveRequest, SubmissionReceipt,
    TaskSubmission, VerificationEngine,
};
use tracing::{debug, warn};

use crate::{ServiceConfig, ServiceError};

/// The user's current day at `utc_offset_secs`, read from `clock`.
pub fn today(clock: &dyn Clock, utc_offset_secs: i32) -> Result<DayKey, TerraError> {
    DayKey::from_timestamp(clock.now(), utc_offset_secs)
}

#[derive(Clone)]
pub struct VerificationService {
    engine: VerificationEngine,
    clock: Arc<dyn Clock>,
    config: Arc<ServiceConfig>,
}

impl VerificationService {
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn DocumentStore>,
        catalog: Arc<dyn TaskCatalog>,
        uploader: Arc<dyn EvidenceUploader>,
        random: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = VerificationEngine::new(store, catalog, uploader, random, config.params.clone());
        Self {
            engine,
            clock,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn engine(&self) -> &VerificationEngine {
        &self.engine
    }

    /// Today for users at the configured offset.
    pub fn today(&self) -> Result<DayKey, ServiceError> {
        Ok(today(self.clock.as_ref(), self.config.utc_offset_secs)?)
    }

    /// The day is derived once, when the request arrives, and reused across retries.
    pub async fn get_or_create_daily_assignment(
        &self,
        user: &UserId,
    ) -> Result<DailyAssignment, ServiceError> {
        let day = self.today()?;
        let user = user.clone();
        self.run("get_or_create_daily_assignment", move |engine| {
            engine.get_or_create_daily_assignment(&user, day)
        })
        .await
    }

    pub async fn submit_completions(
        &self,
        user: &UserId,
        submissions: Vec<TaskSubmission>,
    ) -> Result<SubmissionReceipt, ServiceError> {
        let day = self.today()?;
        let user = user.clone();
        self.run("submit_completions", move |engine| {
            engine.submit_completions(&user, day, submissions.clone())
        })
        .await
    }

    pub async fn resolve(&self, req: ResolveRequest) -> Result<ResolveOutcome, ServiceError> {
        self.run("resolve", move |engine| engine.resolve(&req)).await
    }

    pub async fn increment(
        &self,
        user: &UserId,
        field: LedgerField,
        amount: u64,
    ) -> Result<CommitReceipt, ServiceError> {
        let user = user.clone();
        self.run("increment", move |engine| engine.increment(&user, field, amount))
            .await
    }

    /// Adds to the current quarter's community progress.
    pub async fn increment_community(
        &self,
        user: &UserId,
        amount: u64,
    ) -> Result<CommitReceipt, ServiceError> {
        let quarter = self.today()?.quarter();
        let user = user.clone();
        self.run("increment_community", move |engine| {
            engine.increment_community(quarter, &user, amount)
        })
        .await
    }

    pub async fn ledger(&self, user: &UserId) -> Result<RewardLedger, ServiceError> {
        let user = user.clone();
        self.run("ledger", move |engine| engine.ledger(&user)).await
    }

    pub async fn community_progress(
        &self,
        quarter: QuarterKey,
    ) -> Result<CommunityProgress, ServiceError> {
        self.run("community_progress", move |engine| engine.community_progress(quarter))
            .await
    }

    /// Run `f` on the blocking pool with timeout and retry.
    ///
    /// A timed-out attempt keeps running and may still commit. When a later
    /// attempt then hits an idempotence guard, the result is
    /// [`ServiceError::CommittedByEarlierAttempt`]. Callers should treat any error
    /// with [`ServiceError::is_idempotent_noop`] as success.
    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: Fn(&VerificationEngine) -> Result<T, EngineError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let max_attempts = self.config.max_attempts.max(1);
        let timeout = self.config.request_timeout();
        let mut attempt = 0;
        let mut timed_out = false;

        loop {
            attempt += 1;
            let engine = self.engine.clone();
            let call = f.clone();
            let task = tokio::task::spawn_blocking(move || call(&engine));

            let failure = match tokio::time::timeout(timeout, task).await {
                Ok(Ok(Ok(value))) => {
                    debug!(op, attempt, "operation succeeded");
                    return Ok(value);
                }
                Ok(Ok(Err(e))) if !e.is_transient() => return Err(settle(op, e, timed_out)),
                Ok(Ok(Err(e))) => {
                    if attempt >= max_attempts {
                        return Err(ServiceError::RetriesExhausted {
                            op,
                            attempts: attempt,
                            last: e,
                        });
                    }
                    warn!(op, attempt, error = %e, "transient failure, retrying");
                    ServiceError::Engine(e)
                }
                Ok(Err(join)) => return Err(ServiceError::Join(join.to_string())),
                Err(_) => {
                    let after_ms = self.config.request_timeout_ms;
                    if attempt >= max_attempts {
                        return Err(ServiceError::Timeout { op, after_ms });
                    }
                    timed_out = true;
                    warn!(op, attempt, after_ms, "attempt timed out, retrying");
                    ServiceError::Timeout { op, after_ms }
                }
            };

            let delay = self.config.backoff(attempt);
            debug!(op, attempt, delay_ms = delay.as_millis() as u64, error = %failure, "backing off");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Map a non-transient engine error, given whether an earlier attempt timed out.
fn settle(op: &'static str, error: EngineError, timed_out_earlier: bool) -> ServiceError {
    if timed_out_earlier && error.is_idempotent_noop() {
        debug!(op, error = %error, "earlier timed-out attempt committed");
        return ServiceError::CommittedByEarlierAttempt { op, outcome: error };
    }
    ServiceError::Engine(error)
}
