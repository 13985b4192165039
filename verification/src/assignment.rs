//! Daily assignment generator. Draws each user's proof-required easy tasks once per day.
//!
//! The draw is persisted under the reserved `dailyEasyTaskIds` key of the day's
//! verification record with an insert-if-absent precondition, so concurrent first
//! calls from several devices converge on whichever draw committed first.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use terra_external::{RandomSource, TaskCatalog};
use terra_store::{paths, DocumentStore, FieldPath, Precondition, StoreError, WriteBatch, WriteOp};
use terra_types::{DayKey, Difficulty, EngineParams, Task, TaskId, UserId};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::records::{CompletionRecord, DailyAssignment, VerificationRecord, DAILY_EASY_TASK_IDS};

/// Everything read about one user's day.
#[derive(Clone, Debug)]
pub struct DaySnapshot {
    pub tasks: Vec<Task>,
    pub completions: CompletionRecord,
    pub verifications: VerificationRecord,
}

impl DaySnapshot {
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    fn outstanding(&self, difficulty: Difficulty) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.difficulty == difficulty && !self.completions.contains(&t.id))
            .map(|t| t.id.clone())
            .collect()
    }
}

#[derive(Clone)]
pub struct AssignmentGenerator {
    store: Arc<dyn DocumentStore>,
    catalog: Arc<dyn TaskCatalog>,
    random: Arc<dyn RandomSource>,
    params: EngineParams,
}

impl AssignmentGenerator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        catalog: Arc<dyn TaskCatalog>,
        random: Arc<dyn RandomSource>,
        params: EngineParams,
    ) -> Self {
        Self {
            store,
            catalog,
            random,
            params,
        }
    }

    /// Read the catalog and both per-day records.
    pub fn snapshot(&self, user: &UserId, day: DayKey) -> Result<DaySnapshot, EngineError> {
        let tasks = self
            .catalog
            .list_tasks()
            .map_err(|e| EngineError::CatalogUnavailable(e.to_string()))?;
        let completions_doc = self.store.get(&paths::completions(user, day)?)?;
        let verifications_doc = self.store.get(&paths::verifications(user, day)?)?;
        Ok(DaySnapshot {
            tasks,
            completions: CompletionRecord::from_doc(completions_doc.as_ref())?,
            verifications: VerificationRecord::from_doc(verifications_doc.as_ref())?,
        })
    }

    /// Return the day's assignment, drawing and persisting it on first access.
    pub fn get_or_create(&self, user: &UserId, day: DayKey) -> Result<DailyAssignment, EngineError> {
        self.load_or_create(user, day).map(|(assignment, _)| assignment)
    }

    /// Like [`get_or_create`](Self::get_or_create), also returning the snapshot it was built from.
    pub fn load_or_create(
        &self,
        user: &UserId,
        day: DayKey,
    ) -> Result<(DailyAssignment, DaySnapshot), EngineError> {
        let mut snapshot = self.snapshot(user, day)?;
        let outstanding_easy = snapshot.outstanding(Difficulty::Easy);

        if let Some(stored) = &snapshot.verifications.daily_easy_task_ids {
            debug!(user = %user, %day, stored = stored.len(), "daily assignment exists");
            let assignment = self.assemble(user, day, &snapshot, stored, false);
            return Ok((assignment, snapshot));
        }

        let picks = self
            .random
            .sample_indices(outstanding_easy.len(), self.params.daily_proof_task_count);
        let drawn: BTreeSet<TaskId> = picks
            .into_iter()
            .filter_map(|i| outstanding_easy.get(i).cloned())
            .collect();

        match self.persist(user, day, &drawn) {
            Ok(()) => {
                info!(user = %user, %day, drawn = drawn.len(), "daily assignment created");
                snapshot.verifications.daily_easy_task_ids = Some(drawn.clone());
                let assignment = self.assemble(user, day, &snapshot, &drawn, true);
                Ok((assignment, snapshot))
            }
            Err(StoreError::PreconditionFailed { .. }) => {
                // Another device drew first; its set is the day's set.
                let doc = self.store.get(&paths::verifications(user, day)?)?;
                snapshot.verifications = VerificationRecord::from_doc(doc.as_ref())?;
                let winner = snapshot
                    .verifications
                    .daily_easy_task_ids
                    .clone()
                    .unwrap_or_default();
                info!(user = %user, %day, "daily assignment raced, using stored draw");
                let assignment = self.assemble(user, day, &snapshot, &winner, false);
                Ok((assignment, snapshot))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, user: &UserId, day: DayKey, drawn: &BTreeSet<TaskId>) -> Result<(), StoreError> {
        let ids: Vec<Value> = drawn.iter().map(|id| Value::from(id.as_str())).collect();
        let mut batch = WriteBatch::new();
        // An empty merge creates the completion record if it is missing.
        batch.push(WriteOp::merge(paths::completions(user, day)?));
        batch.push(
            WriteOp::merge(paths::verifications(user, day)?)
                .require(Precondition::FieldAbsent(FieldPath::new(DAILY_EASY_TASK_IDS)))
                .set(FieldPath::new(DAILY_EASY_TASK_IDS), Value::Array(ids)),
        );
        self.store.commit(batch)?;
        Ok(())
    }

    fn assemble(
        &self,
        user: &UserId,
        day: DayKey,
        snapshot: &DaySnapshot,
        stored: &BTreeSet<TaskId>,
        created: bool,
    ) -> DailyAssignment {
        let outstanding_easy = snapshot.outstanding(Difficulty::Easy);
        let daily_easy_task_ids = stored
            .iter()
            .filter(|id| outstanding_easy.contains(*id))
            .cloned()
            .collect();
        DailyAssignment {
            user_id: user.clone(),
            date: day,
            daily_easy_task_ids,
            outstanding_easy,
            outstanding_hard: snapshot.outstanding(Difficulty::Hard),
            completed: snapshot.completions.task_ids(),
            created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use terra_nullables::{NullCatalog, NullRandom, NullStore};

    fn id(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    fn catalog(easy: usize, hard: usize) -> NullCatalog {
        let mut tasks = Vec::new();
        for i in 0..easy {
            tasks.push(Task::new(id(&format!("e{i}")), Difficulty::Easy, format!("easy {i}")));
        }
        for i in 0..hard {
            tasks.push(Task::new(id(&format!("h{i}")), Difficulty::Hard, format!("hard {i}")));
        }
        NullCatalog::new(tasks)
    }

    fn day() -> DayKey {
        DayKey::from_ymd(2026, 10, 14).unwrap()
    }

    fn user() -> UserId {
        UserId::new("alice").unwrap()
    }

    fn generator(store: Arc<NullStore>, catalog: NullCatalog, random: NullRandom) -> AssignmentGenerator {
        AssignmentGenerator::new(store, Arc::new(catalog), Arc::new(random), EngineParams::default())
    }

    #[test]
    fn draws_three_of_five_and_keeps_them() {
        let store = Arc::new(NullStore::new());
        let gen = generator(store.clone(), catalog(5, 2), NullRandom::seeded(7));
        let first = gen.get_or_create(&user(), day()).unwrap();
        assert!(first.created);
        assert_eq!(first.daily_easy_task_ids.len(), 3);
        assert_eq!(first.outstanding_easy.len(), 5);
        assert_eq!(first.outstanding_hard.len(), 2);

        let second = gen.get_or_create(&user(), day()).unwrap();
        assert!(!second.created);
        assert_eq!(second.daily_easy_task_ids, first.daily_easy_task_ids);
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn fewer_easy_tasks_than_draw_size() {
        let store = Arc::new(NullStore::new());
        let gen = generator(store, catalog(2, 1), NullRandom::seeded(1));
        let a = gen.get_or_create(&user(), day()).unwrap();
        assert_eq!(a.daily_easy_task_ids.len(), 2);
    }

    #[test]
    fn no_easy_tasks_persists_empty_draw() {
        let store = Arc::new(NullStore::new());
        let gen = generator(store.clone(), catalog(0, 3), NullRandom::seeded(1));
        let a = gen.get_or_create(&user(), day()).unwrap();
        assert!(a.daily_easy_task_ids.is_empty());
        let doc = store.get(&paths::verifications(&user(), day()).unwrap()).unwrap().unwrap();
        assert_eq!(doc[DAILY_EASY_TASK_IDS], json!([]));
    }

    #[test]
    fn creates_empty_completion_record() {
        let store = Arc::new(NullStore::new());
        let gen = generator(store.clone(), catalog(3, 0), NullRandom::first());
        gen.get_or_create(&user(), day()).unwrap();
        let doc = store.get(&paths::completions(&user(), day()).unwrap()).unwrap();
        assert_eq!(doc, Some(Default::default()));
    }

    #[test]
    fn completed_tasks_shrink_the_set() {
        let store = Arc::new(NullStore::new());
        let gen = generator(store.clone(), catalog(5, 0), NullRandom::first());
        let first = gen.get_or_create(&user(), day()).unwrap();
        assert_eq!(first.daily_easy_task_ids, [id("e0"), id("e1"), id("e2")].into_iter().collect());

        let mut batch = WriteBatch::new();
        batch.push(
            WriteOp::merge(paths::completions(&user(), day()).unwrap())
                .set(FieldPath::new("e1"), json!({"pointsEarned": 10, "coinsEarned": 5})),
        );
        store.commit(batch).unwrap();

        let after = gen.get_or_create(&user(), day()).unwrap();
        assert_eq!(after.daily_easy_task_ids, [id("e0"), id("e2")].into_iter().collect());
        assert!(after.completed.contains(&id("e1")));
        assert_eq!(after.outstanding_easy.len(), 4);
    }

    #[test]
    fn completed_before_draw_never_drawn() {
        let store = Arc::new(NullStore::new());
        let mut batch = WriteBatch::new();
        batch.push(
            WriteOp::merge(paths::completions(&user(), day()).unwrap())
                .set(FieldPath::new("e0"), json!({"pointsEarned": 10, "coinsEarned": 5})),
        );
        store.commit(batch).unwrap();
        let gen = generator(store, catalog(4, 0), NullRandom::first());
        let a = gen.get_or_create(&user(), day()).unwrap();
        assert!(!a.daily_easy_task_ids.contains(&id("e0")));
        assert_eq!(a.daily_easy_task_ids.len(), 3);
    }

    #[test]
    fn losing_a_race_returns_the_winners_draw() {
        let store = Arc::new(NullStore::new());
        let mut foreign = WriteBatch::new();
        foreign.push(
            WriteOp::merge(paths::verifications(&user(), day()).unwrap())
                .set(FieldPath::new(DAILY_EASY_TASK_IDS), json!(["e3", "e4"])),
        );
        store.interleave_before_next_commit(foreign);

        let gen = generator(store, catalog(5, 0), NullRandom::first());
        let a = gen.get_or_create(&user(), day()).unwrap();
        assert!(!a.created);
        assert_eq!(a.daily_easy_task_ids, [id("e3"), id("e4")].into_iter().collect());
    }

    #[test]
    fn catalog_outage_is_transient() {
        let store = Arc::new(NullStore::new());
        let catalog = catalog(3, 0);
        catalog.set_unavailable(true);
        let gen = generator(store.clone(), catalog, NullRandom::first());
        let err = gen.get_or_create(&user(), day()).unwrap_err();
        assert!(matches!(err, EngineError::CatalogUnavailable(_)));
        assert!(err.is_transient());
        assert!(store.is_empty());
    }

    #[test]
    fn store_outage_is_transient() {
        let store = Arc::new(NullStore::new());
        store.fail_next_reads(1);
        let gen = generator(store, catalog(3, 0), NullRandom::first());
        let err = gen.get_or_create(&user(), day()).unwrap_err();
        assert!(matches!(err, EngineError::Transient(_)));
    }

    #[test]
    fn days_are_independent() {
        let store = Arc::new(NullStore::new());
        let gen = generator(store.clone(), catalog(5, 0), NullRandom::seeded(3));
        gen.get_or_create(&user(), day()).unwrap();
        let tomorrow = gen.get_or_create(&user(), day().next().unwrap()).unwrap();
        assert!(tomorrow.created);
        assert_eq!(store.commit_count(), 2);
    }
}
