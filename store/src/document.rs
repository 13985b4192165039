//! Document representation and the field-level write semantics every backend shares.

use crate::batch::{FieldValue, Precondition, WriteMode, WriteOp};
use crate::error::StoreError;
use crate::path::{DocPath, FieldPath};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use terra_types::Timestamp;

/// A stored document: a JSON object of (possibly nested) fields.
pub type Document = Map<String, Value>;

/// Look up a nested field.
pub fn get_field<'a>(doc: &'a Document, field: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = field.segments().split_first()?;
    let mut current = doc.get(first)?;
    for seg in rest {
        current = current.as_object()?.get(seg)?;
    }
    Some(current)
}

/// Decode a nested field into `T`. `Ok(None)` if the field is absent.
pub fn decode_field<T: DeserializeOwned>(
    doc: &Document,
    field: &FieldPath,
) -> Result<Option<T>, StoreError> {
    get_field(doc, field)
        .map(|v| serde_json::from_value(v.clone()))
        .transpose()
        .map_err(|e| StoreError::Serialization(format!("field {field}: {e}")))
}

/// Decode a whole document into `T`.
pub fn decode_doc<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

pub fn to_value<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

fn set_leaf(map: &mut Document, segs: &[String], value: Value) {
    match segs {
        [] => {}
        [last] => {
            map.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let entry = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_leaf(child, rest, value);
            }
        }
    }
}

fn remove_leaf(map: &mut Document, segs: &[String]) {
    match segs {
        [] => {}
        [last] => {
            map.remove(last);
        }
        [head, rest @ ..] => {
            if let Some(Value::Object(child)) = map.get_mut(head) {
                remove_leaf(child, rest);
            }
        }
    }
}

/// Check `preconditions` against the pre-batch state of `path`.
pub fn check_preconditions(
    path: &DocPath,
    current: Option<&Document>,
    preconditions: &[Precondition],
) -> Result<(), StoreError> {
    let fail = |reason: String| StoreError::PreconditionFailed {
        path: path.to_string(),
        reason,
    };
    for pre in preconditions {
        match pre {
            Precondition::DocExists => {
                if current.is_none() {
                    return Err(fail("document does not exist".into()));
                }
            }
            Precondition::DocAbsent => {
                if current.is_some() {
                    return Err(fail("document already exists".into()));
                }
            }
            Precondition::FieldAbsent(field) => {
                if current.and_then(|d| get_field(d, field)).is_some() {
                    return Err(fail(format!("field {field} already set")));
                }
            }
            Precondition::FieldEquals(field, expected) => {
                let actual = current.and_then(|d| get_field(d, field));
                if actual != Some(expected) {
                    return Err(fail(format!(
                        "field {field} is {}, expected {expected}",
                        actual.map(Value::to_string).unwrap_or_else(|| "absent".into())
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Apply one write to the current document state, returning the new state.
///
/// Preconditions are not checked here; see [`check_preconditions`].
pub fn apply_op(current: Option<Document>, op: &WriteOp, commit_time: Timestamp) -> Document {
    let mut doc = match op.mode {
        WriteMode::Merge => current.unwrap_or_default(),
        WriteMode::Replace => Document::new(),
    };
    for (field, value) in &op.fields {
        let segs = field.segments();
        match value {
            FieldValue::Set(v) => set_leaf(&mut doc, segs, v.clone()),
            FieldValue::Increment(by) => {
                let base = get_field(&doc, field).and_then(Value::as_i64).unwrap_or(0);
                set_leaf(&mut doc, segs, Value::from(base.saturating_add(*by)));
            }
            FieldValue::ServerTimestamp => {
                set_leaf(&mut doc, segs, Value::from(commit_time.as_secs()))
            }
            FieldValue::Delete => remove_leaf(&mut doc, segs),
        }
    }
    doc
}
