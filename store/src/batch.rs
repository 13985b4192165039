//! Write batching: field-level writes across documents, committed atomically.
//!
//! # Usage
//!
//! ```ignore
//! let mut batch = WriteBatch::new();
//! batch.push(
//!     WriteOp::merge(paths::completions(&user, day)?)
//!         .require(Precondition::FieldAbsent(FieldPath::new(task.as_str())))
//!         .set(FieldPath::new(task.as_str()).child("pointsEarned"), 10)
//!         .server_timestamp(FieldPath::new(task.as_str()).child("finishedAt")),
//! );
//! batch.push(WriteOp::merge(paths::user(&user)?).increment(FieldPath::new("terraPoints"), 10));
//! store.commit(batch)?;
//! ```
//!
//! If any precondition fails the store applies nothing.

use crate::path::{DocPath, FieldPath};
use serde_json::Value;
use terra_types::Timestamp;

/// A single field mutation.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Set(Value),
    /// Atomic server-side add; a missing or non-numeric field starts from zero.
    Increment(i64),
    /// Replaced by the commit time.
    ServerTimestamp,
    Delete,
}

/// A condition checked against a document's pre-batch state.
#[derive(Clone, Debug, PartialEq)]
pub enum Precondition {
    DocExists,
    DocAbsent,
    FieldAbsent(FieldPath),
    FieldEquals(FieldPath, Value),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Keep untouched fields; create the document if missing.
    Merge,
    /// Discard the existing document and write only the given fields.
    Replace,
}

/// Field writes to one document.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteOp {
    pub path: DocPath,
    pub mode: WriteMode,
    pub fields: Vec<(FieldPath, FieldValue)>,
    pub preconditions: Vec<Precondition>,
}

impl WriteOp {
    pub fn merge(path: DocPath) -> Self {
        Self {
            path,
            mode: WriteMode::Merge,
            fields: Vec::new(),
            preconditions: Vec::new(),
        }
    }

    pub fn replace(path: DocPath) -> Self {
        Self {
            path,
            mode: WriteMode::Replace,
            fields: Vec::new(),
            preconditions: Vec::new(),
        }
    }

    pub fn set(mut self, field: FieldPath, value: impl Into<Value>) -> Self {
        self.fields.push((field, FieldValue::Set(value.into())));
        self
    }

    pub fn increment(mut self, field: FieldPath, by: i64) -> Self {
        self.fields.push((field, FieldValue::Increment(by)));
        self
    }

    pub fn server_timestamp(mut self, field: FieldPath) -> Self {
        self.fields.push((field, FieldValue::ServerTimestamp));
        self
    }

    pub fn delete(mut self, field: FieldPath) -> Self {
        self.fields.push((field, FieldValue::Delete));
        self
    }

    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }
}

/// An ordered list of writes committed all-or-nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Every document this batch touches, in first-touch order.
    pub fn paths(&self) -> Vec<&DocPath> {
        let mut seen: Vec<&DocPath> = Vec::new();
        for op in &self.ops {
            if !seen.contains(&&op.path) {
                seen.push(&op.path);
            }
        }
        seen
    }
}

/// Returned by a successful commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    /// The value every server timestamp in the batch resolved to.
    pub commit_time: Timestamp,
}
