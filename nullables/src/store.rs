//! Nullable store: a thread-safe in-memory document store for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use terra_external::Clock;
use terra_store::{
    apply_op, check_preconditions, CollectionPath, CommitReceipt, DocPath, Document,
    DocumentStore, StoreError, WriteBatch,
};

use crate::clock::NullClock;

/// An in-memory [`DocumentStore`] with all-or-nothing batch commits.
///
/// Outages can be injected per operation kind, and a foreign batch can be queued
/// to land just before the next commit to simulate a second device racing.
pub struct NullStore {
    docs: Mutex<BTreeMap<String, Document>>,
    clock: Arc<dyn Clock>,
    failing_reads: AtomicUsize,
    failing_commits: AtomicUsize,
    commits: AtomicUsize,
    interleaved: Mutex<Vec<WriteBatch>>,
    latency_ms: AtomicU64,
}

impl NullStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(NullClock::new(0)))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            docs: Mutex::new(BTreeMap::new()),
            clock,
            failing_reads: AtomicUsize::new(0),
            failing_commits: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            interleaved: Mutex::new(Vec::new()),
            latency_ms: AtomicU64::new(0),
        }
    }

    /// The next `n` reads (`get` or `list`) fail with [`StoreError::Unavailable`].
    pub fn fail_next_reads(&self, n: usize) {
        self.failing_reads.store(n, Ordering::SeqCst);
    }

    /// The next `n` commits fail with [`StoreError::Unavailable`] and apply nothing.
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Apply `batch` immediately before the next commit's preconditions are checked.
    pub fn interleave_before_next_commit(&self, batch: WriteBatch) {
        self.interleaved.lock().unwrap().push(batch);
    }

    /// Every read and commit blocks the calling thread for `latency` first.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    fn simulate_latency(&self) {
        let ms = self.latency_ms.load(Ordering::SeqCst);
        if ms > 0 {
            std::thread::sleep(Duration::from_millis(ms));
        }
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Put a document directly, bypassing batches (fixture setup).
    pub fn insert(&self, path: &DocPath, doc: Document) {
        self.docs.lock().unwrap().insert(path.to_string(), doc);
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.docs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn apply_locked(
        docs: &mut BTreeMap<String, Document>,
        batch: &WriteBatch,
        receipt: CommitReceipt,
    ) -> Result<(), StoreError> {
        for op in batch.ops() {
            check_preconditions(&op.path, docs.get(op.path.as_str()), &op.preconditions)?;
        }
        let mut staged: HashMap<String, Document> = HashMap::new();
        for op in batch.ops() {
            let key = op.path.to_string();
            let current = staged
                .remove(&key)
                .or_else(|| docs.get(&key).cloned());
            staged.insert(key, apply_op(current, op, receipt.commit_time));
        }
        docs.extend(staged);
        Ok(())
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for NullStore {
    fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        self.simulate_latency();
        if Self::take_failure(&self.failing_reads) {
            return Err(StoreError::Unavailable(format!("injected read failure: {path}")));
        }
        Ok(self.docs.lock().unwrap().get(path.as_str()).cloned())
    }

    fn list(
        &self,
        collection: &CollectionPath,
        id_prefix: &str,
    ) -> Result<Vec<(DocPath, Document)>, StoreError> {
        self.simulate_latency();
        if Self::take_failure(&self.failing_reads) {
            return Err(StoreError::Unavailable(format!(
                "injected read failure: {collection}"
            )));
        }
        let prefix = format!("{}/{}", collection.as_str(), id_prefix);
        let docs = self.docs.lock().unwrap();
        let mut out = Vec::new();
        for (key, doc) in docs.range(prefix.clone()..) {
            if !key.starts_with(&prefix) {
                break;
            }
            let path = DocPath::parse(key)?;
            // Only direct children of the collection.
            if path.collection() == *collection {
                out.push((path, doc.clone()));
            }
        }
        Ok(out)
    }

    fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError> {
        self.simulate_latency();
        if Self::take_failure(&self.failing_commits) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }
        let receipt = CommitReceipt {
            commit_time: self.clock.now(),
        };
        let mut docs = self.docs.lock().unwrap();
        let foreign: Vec<WriteBatch> = self.interleaved.lock().unwrap().drain(..).collect();
        for other in &foreign {
            Self::apply_locked(&mut docs, other, receipt)?;
        }
        Self::apply_locked(&mut docs, &batch, receipt)?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use terra_store::{FieldPath, Precondition, WriteOp};
    use terra_types::Timestamp;

    fn p(raw: &str) -> DocPath {
        DocPath::parse(raw).unwrap()
    }

    #[test]
    fn commit_and_get() {
        let store = NullStore::new();
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::merge(p("users/a")).set(FieldPath::new("name"), "a"));
        store.commit(batch).unwrap();
        let doc = store.get(&p("users/a")).unwrap().unwrap();
        assert_eq!(doc["name"], json!("a"));
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn failed_precondition_applies_nothing() {
        let store = NullStore::new();
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::merge(p("users/a")).increment(FieldPath::new("coins"), 5));
        batch.push(WriteOp::merge(p("users/b")).require(Precondition::DocExists));
        let err = store.commit(batch).unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed { .. }));
        assert!(store.get(&p("users/a")).unwrap().is_none());
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn server_timestamps_share_commit_time() {
        let clock = Arc::new(NullClock::new(1_000));
        let store = NullStore::with_clock(clock.clone());
        let mut batch = WriteBatch::new();
        batch.push(WriteOp::merge(p("users/a")).server_timestamp(FieldPath::new("at")));
        batch.push(WriteOp::merge(p("users/b")).server_timestamp(FieldPath::new("at")));
        let receipt = store.commit(batch).unwrap();
        assert_eq!(receipt.commit_time, Timestamp::new(1_000));
        let a = store.get(&p("users/a")).unwrap().unwrap();
        let b = store.get(&p("users/b")).unwrap().unwrap();
        assert_eq!(a["at"], b["at"]);
    }

    #[test]
    fn injected_failures_are_transient_and_consumed() {
        let store = NullStore::new();
        store.fail_next_reads(1);
        let err = store.get(&p("users/a")).unwrap_err();
        assert!(err.is_transient());
        assert!(store.get(&p("users/a")).is_ok());

        store.fail_next_commits(1);
        assert!(store.commit(WriteBatch::new()).is_err());
        assert!(store.commit(WriteBatch::new()).is_ok());
    }

    #[test]
    fn list_filters_by_prefix_and_depth() {
        let store = NullStore::new();
        store.insert(&p("users/v/assigned_verifications/2026-10-14"), Document::new());
        store.insert(&p("users/v/assigned_verifications/2026-10-14_b"), Document::new());
        store.insert(&p("users/v/assigned_verifications/2026-10-15"), Document::new());
        store.insert(&p("users/v/assigned_verifications/2026-10-14/x/y"), Document::new());
        let coll = CollectionPath::from_segments(["users", "v", "assigned_verifications"]).unwrap();
        let found = store.list(&coll, "2026-10-14").unwrap();
        let ids: Vec<&str> = found.iter().map(|(path, _)| path.id()).collect();
        assert_eq!(ids, vec!["2026-10-14", "2026-10-14_b"]);
    }

    #[test]
    fn interleaved_batch_lands_first() {
        let store = NullStore::new();
        let mut foreign = WriteBatch::new();
        foreign.push(WriteOp::merge(p("users/a")).set(FieldPath::new("ids"), json!(["x"])));
        store.interleave_before_next_commit(foreign);

        let mut mine = WriteBatch::new();
        mine.push(
            WriteOp::merge(p("users/a"))
                .require(Precondition::FieldAbsent(FieldPath::new("ids")))
                .set(FieldPath::new("ids"), json!(["y"])),
        );
        assert!(store.commit(mine).is_err());
        let doc = store.get(&p("users/a")).unwrap().unwrap();
        assert_eq!(doc["ids"], json!(["x"]));
    }
}
