//! Submission pipeline. Records completion claims and credits their rewards in one atomic batch.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use terra_external::EvidenceUploader;
use terra_ledger::{Ledger, LedgerField};
use terra_store::{
    paths, to_value, DocumentStore, FieldPath, Precondition, StoreError, WriteBatch, WriteOp,
};
use terra_types::{
    DayKey, EngineParams, PhotoUrl, RewardAmount, RewardTiming, Task, TaskId, Timestamp, UserId,
};
use tracing::{info, warn};

use crate::assignment::AssignmentGenerator;
use crate::error::{EngineError, ValidationError};
use crate::records::{fields, CompletionRecord, DailyAssignment, VerificationEntry};

/// Proof offered for one task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Evidence {
    /// Already uploaded.
    Photo(PhotoUrl),
    /// Raw image bytes, uploaded before anything is written.
    Image(Vec<u8>),
    Skip,
}

impl Evidence {
    pub fn is_present(&self) -> bool {
        !matches!(self, Evidence::Skip)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskSubmission {
    pub task_id: TaskId,
    pub evidence: Evidence,
}

impl TaskSubmission {
    pub fn with_photo(task_id: TaskId, url: PhotoUrl) -> Self {
        Self {
            task_id,
            evidence: Evidence::Photo(url),
        }
    }

    pub fn with_image(task_id: TaskId, image: Vec<u8>) -> Self {
        Self {
            task_id,
            evidence: Evidence::Image(image),
        }
    }

    pub fn without_evidence(task_id: TaskId) -> Self {
        Self {
            task_id,
            evidence: Evidence::Skip,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub user_id: UserId,
    pub date: DayKey,
    pub completed: Vec<TaskId>,
    /// Tasks whose proof now awaits peer review.
    pub pending_verification: Vec<TaskId>,
    pub credited: RewardAmount,
    /// Rewards recorded but not yet credited (approval-gated timing only).
    pub held: RewardAmount,
    pub commit_time: Timestamp,
}

#[derive(Clone)]
pub struct SubmissionPipeline {
    store: Arc<dyn DocumentStore>,
    uploader: Arc<dyn EvidenceUploader>,
    assignments: AssignmentGenerator,
    ledger: Ledger,
    params: EngineParams,
}

impl SubmissionPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        uploader: Arc<dyn EvidenceUploader>,
        assignments: AssignmentGenerator,
        params: EngineParams,
    ) -> Self {
        Self {
            store,
            uploader,
            assignments,
            ledger: Ledger,
            params,
        }
    }

    /// Whether `task` needs a photo given `proofs_so_far` quota-counting proofs today.
    ///
    /// Hard tasks always do. Easy tasks in the daily draw do until the proof quota
    /// is reached. Only photos for hard tasks and drawn easy tasks fill the quota.
    pub fn proof_required(&self, task: &Task, assignment: &DailyAssignment, proofs_so_far: usize) -> bool {
        if task.is_hard() {
            return true;
        }
        assignment.requires_proof(&task.id) && proofs_so_far < self.params.proof_quota
    }

    /// Record `submissions` for `user` on `day`.
    ///
    /// Either every task is credited or nothing is written. A task already in the
    /// day's completion record yields [`EngineError::AlreadyCompleted`] with no
    /// side effects.
    pub fn submit(
        &self,
        user: &UserId,
        day: DayKey,
        submissions: Vec<TaskSubmission>,
    ) -> Result<SubmissionReceipt, EngineError> {
        if submissions.is_empty() {
            return Err(ValidationError::EmptySubmission.into());
        }
        let mut seen = BTreeSet::new();
        for s in &submissions {
            if !seen.insert(s.task_id.clone()) {
                return Err(ValidationError::DuplicateTask(s.task_id.clone()).into());
            }
        }

        let (assignment, snapshot) = self.assignments.load_or_create(user, day)?;
        if let Some(done) = submissions.iter().find(|s| snapshot.completions.contains(&s.task_id)) {
            info!(user = %user, %day, task = %done.task_id, "submission already completed");
            return Err(EngineError::AlreadyCompleted(done.task_id.clone()));
        }

        let mut planned: Vec<(Task, Evidence)> = Vec::with_capacity(submissions.len());
        for s in submissions {
            let task = snapshot
                .task(&s.task_id)
                .cloned()
                .ok_or_else(|| ValidationError::UnknownTask(s.task_id.clone()))?;
            planned.push((task, s.evidence));
        }

        // Proofs anywhere in this submission count, so list order never matters.
        let stored = &snapshot.verifications;
        let proofs = stored
            .required_proof_count(|id| snapshot.task(id).is_some_and(Task::is_hard))
            + planned
                .iter()
                .filter(|(task, evidence)| {
                    evidence.is_present() && stored.counts_toward_quota(&task.id, task.is_hard())
                })
                .count();
        for (task, evidence) in &planned {
            if !evidence.is_present() && self.proof_required(task, &assignment, proofs) {
                return Err(ValidationError::EvidenceRequired(task.id.clone()).into());
            }
        }

        let mut resolved: Vec<(Task, Option<PhotoUrl>)> = Vec::with_capacity(planned.len());
        for (task, evidence) in planned {
            let photo = match evidence {
                Evidence::Photo(url) => Some(url),
                Evidence::Image(bytes) => {
                    let url = self.uploader.upload(&bytes).map_err(|source| {
                        EngineError::EvidenceUploadFailed {
                            task: task.id.clone(),
                            source,
                        }
                    })?;
                    Some(url)
                }
                Evidence::Skip => None,
            };
            resolved.push((task, photo));
        }

        self.commit(user, day, resolved)
    }

    fn commit(
        &self,
        user: &UserId,
        day: DayKey,
        resolved: Vec<(Task, Option<PhotoUrl>)>,
    ) -> Result<SubmissionReceipt, EngineError> {
        let hold_proofs = self.params.reward_timing == RewardTiming::OnApproval;
        let completions_path = paths::completions(user, day)?;
        let mut completion_op = WriteOp::merge(completions_path.clone());
        let mut verification_op = WriteOp::merge(paths::verifications(user, day)?);

        let mut credited = RewardAmount::ZERO;
        let mut held = RewardAmount::ZERO;
        let mut completed = Vec::with_capacity(resolved.len());
        let mut pending = Vec::new();

        for (task, photo) in &resolved {
            let key = FieldPath::new(task.id.as_str());
            let reward = self.params.reward_for(task.difficulty);
            let hold = hold_proofs && photo.is_some();
            if hold {
                held = held.saturating_add(reward);
            } else {
                credited = credited.saturating_add(reward);
            }
            let photo_value = photo
                .as_ref()
                .map(|url| Value::from(url.as_str()))
                .unwrap_or(Value::Null);

            completion_op = completion_op
                .require(Precondition::FieldAbsent(key.clone()))
                .set(key.clone().child(fields::POINTS_EARNED), reward.points)
                .set(key.clone().child(fields::COINS_EARNED), reward.coins)
                .set(key.clone().child(fields::PHOTO_URL), photo_value)
                .set(key.clone().child(fields::REWARD_CREDITED), !hold)
                .server_timestamp(key.clone().child(fields::FINISHED_AT));

            if let Some(url) = photo {
                let entry = VerificationEntry::pending(task.id.clone(), Some(url.clone()));
                verification_op = verification_op.set(key, to_value(&entry)?);
                pending.push(task.id.clone());
            }
            completed.push(task.id.clone());
        }

        let mut batch = WriteBatch::new();
        batch.push(completion_op);
        if !pending.is_empty() {
            batch.push(verification_op);
        }
        self.ledger.stage_reward(&mut batch, user, credited)?;
        self.ledger
            .stage_increment(&mut batch, user, LedgerField::TasksFinished, completed.len() as u64)?;
        self.ledger
            .stage_increment(&mut batch, user, LedgerField::ProofsSubmitted, pending.len() as u64)?;
        self.ledger
            .stage_community(&mut batch, day.quarter(), user, completed.len() as u64)?;

        let receipt = match self.store.commit(batch) {
            Ok(receipt) => receipt,
            Err(StoreError::PreconditionFailed { .. }) => {
                // A concurrent submission credited one of these tasks first.
                let doc = self.store.get(&completions_path)?;
                let record = CompletionRecord::from_doc(doc.as_ref())?;
                let task = completed
                    .iter()
                    .find(|id| record.contains(id))
                    .unwrap_or(&completed[0])
                    .clone();
                warn!(user = %user, %day, task = %task, "submission lost race");
                return Err(EngineError::AlreadyCompleted(task));
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            user = %user,
            %day,
            tasks = completed.len(),
            proofs = pending.len(),
            points = credited.points,
            coins = credited.coins,
            "submission committed"
        );
        Ok(SubmissionReceipt {
            user_id: user.clone(),
            date: day,
            completed,
            pending_verification: pending,
            credited,
            held,
            commit_time: receipt.commit_time,
        })
    }
}
