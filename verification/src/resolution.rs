//! Peer review resolution.
//!
//! The owner's entry, the reviewer's mirrored entry and the ledger counters are
//! written in one batch guarded by the owner entry still being `pending`, so a
//! decision lands on both sides or on neither.

use std::sync::Arc;

use serde_json::Value;
use terra_ledger::{Ledger, LedgerField};
use terra_store::{
    paths, DocPath, DocumentStore, FieldPath, Precondition, StoreError, WriteBatch, WriteOp,
};
use terra_types::{DayKey, EngineParams, RewardAmount, RewardTiming, TaskId, Timestamp, UserId};
use tracing::{debug, info, warn};

use crate::error::{EngineError, ValidationError};
use crate::records::{
    fields, find_mirror, CompletionRecord, Decision, MirrorLocation, VerificationRecord,
    VerificationStatus,
};

/// Commit attempts when the reviewer's mirror moves under us.
const MAX_RESOLVE_ATTEMPTS: usize = 2;

/// Check a decision's notes and return them trimmed.
///
/// Rejections need at least `min_rejection_notes_len` characters after trimming.
/// Approval notes are optional.
pub fn validate_decision(
    decision: Decision,
    notes: &str,
    params: &EngineParams,
) -> Result<String, ValidationError> {
    let trimmed = notes.trim();
    if decision == Decision::Rejected {
        let actual = trimmed.chars().count();
        if actual < params.min_rejection_notes_len {
            return Err(ValidationError::NotesRequired {
                min_len: params.min_rejection_notes_len,
                actual,
            });
        }
    }
    Ok(trimmed.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveRequest {
    pub verifier: UserId,
    pub owner: UserId,
    pub task_id: TaskId,
    pub date: DayKey,
    pub decision: Decision,
    pub notes: String,
}

/// What happened to the reviewer-side copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MirrorUpdate {
    Updated { path: DocPath, key: String },
    /// No mirrored entry in the reviewer's records; the owner side still committed.
    NotFound,
}

impl MirrorUpdate {
    pub fn is_found(&self) -> bool {
        matches!(self, MirrorUpdate::Updated { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub status: VerificationStatus,
    /// Written to both the owner entry and the mirror.
    pub verified_at: Timestamp,
    pub mirror: MirrorUpdate,
    /// Held rewards released by this approval. Zero unless rewards wait for approval.
    pub reward_credited: RewardAmount,
}

#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn DocumentStore>,
    ledger: Ledger,
    params: EngineParams,
}

impl Resolver {
    pub fn new(store: Arc<dyn DocumentStore>, params: EngineParams) -> Self {
        Self {
            store,
            ledger: Ledger,
            params,
        }
    }

    pub fn resolve(&self, req: &ResolveRequest) -> Result<ResolveOutcome, EngineError> {
        if req.verifier == req.owner {
            return Err(ValidationError::SelfVerification.into());
        }
        let notes = validate_decision(req.decision, &req.notes, &self.params)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let owner_path = paths::verifications(&req.owner, req.date)?;
            self.ensure_pending(&owner_path, req)?;
            let mirror = self.locate_mirror(req)?;
            let held = self.held_reward(req)?;

            let batch = self.build_batch(req, &owner_path, mirror.as_ref(), &notes, held)?;
            match self.store.commit(batch) {
                Ok(receipt) => {
                    let mirror = match mirror {
                        Some(m) => MirrorUpdate::Updated {
                            path: m.path,
                            key: m.key,
                        },
                        None => {
                            warn!(
                                verifier = %req.verifier,
                                owner = %req.owner,
                                task = %req.task_id,
                                date = %req.date,
                                "mirrored verification entry not found"
                            );
                            MirrorUpdate::NotFound
                        }
                    };
                    let reward_credited = held.unwrap_or(RewardAmount::ZERO);
                    info!(
                        verifier = %req.verifier,
                        owner = %req.owner,
                        task = %req.task_id,
                        status = %req.decision.status(),
                        mirrored = mirror.is_found(),
                        released_points = reward_credited.points,
                        "verification resolved"
                    );
                    return Ok(ResolveOutcome {
                        status: req.decision.status(),
                        verified_at: receipt.commit_time,
                        mirror,
                        reward_credited,
                    });
                }
                Err(StoreError::PreconditionFailed { path, reason }) => {
                    debug!(%path, %reason, attempt, "resolve precondition failed");
                    // A terminal owner entry surfaces as AlreadyResolved on re-check.
                    self.ensure_pending(&owner_path, req)?;
                    if attempt >= MAX_RESOLVE_ATTEMPTS {
                        return Err(StoreError::PreconditionFailed { path, reason }.into());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn ensure_pending(&self, owner_path: &DocPath, req: &ResolveRequest) -> Result<(), EngineError> {
        let doc = self.store.get(owner_path)?;
        let record = VerificationRecord::from_doc(doc.as_ref())?;
        let entry = record
            .entries
            .get(&req.task_id)
            .ok_or_else(|| EngineError::TaskNotFound {
                owner: req.owner.clone(),
                task: req.task_id.clone(),
                date: req.date,
            })?;
        if entry.status.is_terminal() {
            info!(task = %req.task_id, status = %entry.status, "verification already resolved");
            return Err(EngineError::AlreadyResolved {
                task: req.task_id.clone(),
                status: entry.status,
            });
        }
        Ok(())
    }

    /// Scan every reviewer batch for the day, including suffixed keys like `2026-10-14_2`.
    fn locate_mirror(&self, req: &ResolveRequest) -> Result<Option<MirrorLocation>, EngineError> {
        let collection = paths::assigned_verifications_collection(&req.verifier)?;
        let docs = self.store.list(&collection, &req.date.to_string())?;
        Ok(find_mirror(&docs, &req.task_id, &req.owner))
    }

    /// The reward this approval should release, if it is still being held.
    fn held_reward(&self, req: &ResolveRequest) -> Result<Option<RewardAmount>, EngineError> {
        if self.params.reward_timing != RewardTiming::OnApproval || req.decision != Decision::Approved {
            return Ok(None);
        }
        let doc = self.store.get(&paths::completions(&req.owner, req.date)?)?;
        let record = CompletionRecord::from_doc(doc.as_ref())?;
        Ok(record
            .entries
            .get(&req.task_id)
            .filter(|e| !e.reward_credited)
            .map(|e| RewardAmount::new(e.points_earned, e.coins_earned)))
    }

    fn build_batch(
        &self,
        req: &ResolveRequest,
        owner_path: &DocPath,
        mirror: Option<&MirrorLocation>,
        notes: &str,
        held: Option<RewardAmount>,
    ) -> Result<WriteBatch, EngineError> {
        let status = req.decision.status();
        let task_key = FieldPath::new(req.task_id.as_str());
        let mut batch = WriteBatch::new();

        batch.push(decision_fields(
            WriteOp::merge(owner_path.clone()).require(Precondition::FieldEquals(
                task_key.clone().child(fields::STATUS),
                Value::from(VerificationStatus::Pending.as_str()),
            )),
            &task_key,
            status,
            &req.verifier,
            notes,
        ));

        if let Some(m) = mirror {
            let mirror_key = FieldPath::new(m.key.as_str());
            batch.push(decision_fields(
                WriteOp::merge(m.path.clone()).require(Precondition::FieldEquals(
                    mirror_key.clone().child(fields::STATUS),
                    Value::from(VerificationStatus::Pending.as_str()),
                )),
                &mirror_key,
                status,
                &req.verifier,
                notes,
            ));
        }

        self.ledger
            .stage_increment(&mut batch, &req.verifier, LedgerField::VerificationsCompleted, 1)?;
        let owner_counter = match req.decision {
            Decision::Approved => LedgerField::TasksApproved,
            Decision::Rejected => LedgerField::TasksRejected,
        };
        self.ledger.stage_increment(&mut batch, &req.owner, owner_counter, 1)?;

        if let Some(reward) = held {
            let credited = task_key.clone().child(fields::REWARD_CREDITED);
            batch.push(
                WriteOp::merge(paths::completions(&req.owner, req.date)?)
                    .require(Precondition::FieldEquals(credited.clone(), Value::Bool(false)))
                    .set(credited, true),
            );
            self.ledger.stage_reward(&mut batch, &req.owner, reward)?;
        }
        Ok(batch)
    }
}

fn decision_fields(
    op: WriteOp,
    entry: &FieldPath,
    status: VerificationStatus,
    verifier: &UserId,
    notes: &str,
) -> WriteOp {
    op.set(entry.clone().child(fields::STATUS), status.as_str())
        .set(entry.clone().child(fields::VERIFIED_BY), verifier.as_str())
        .set(entry.clone().child(fields::NOTES), notes)
        .server_timestamp(entry.clone().child(fields::VERIFIED_AT))
}
