//! Document, collection, and field paths.

use crate::error::StoreError;
use std::fmt;

fn check_segment(seg: &str, whole: &str) -> Result<(), StoreError> {
    if seg.is_empty() || seg.contains('/') {
        return Err(StoreError::InvalidPath(whole.to_string()));
    }
    Ok(())
}

/// Path to a document: an even number of segments, `collection/id[/collection/id..]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath(String);

impl DocPath {
    pub fn from_segments<I, S>(segments: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segs: Vec<String> = segments.into_iter().map(|s| s.as_ref().to_string()).collect();
        let joined = segs.join("/");
        for seg in &segs {
            check_segment(seg, &joined)?;
        }
        if segs.is_empty() || segs.len() % 2 != 0 {
            return Err(StoreError::InvalidPath(joined));
        }
        Ok(Self(joined))
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        Self::from_segments(raw.split('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final segment.
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The collection this document lives in.
    pub fn collection(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(String::new()),
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path to a collection: an odd number of segments.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn from_segments<I, S>(segments: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segs: Vec<String> = segments.into_iter().map(|s| s.as_ref().to_string()).collect();
        let joined = segs.join("/");
        for seg in &segs {
            check_segment(seg, &joined)?;
        }
        if segs.len() % 2 != 1 {
            return Err(StoreError::InvalidPath(joined));
        }
        Ok(Self(joined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn doc(&self, id: &str) -> Result<DocPath, StoreError> {
        check_segment(id, id)?;
        Ok(DocPath(format!("{}/{}", self.0, id)))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path to a (possibly nested) field inside a document.
///
/// Built segment by segment so keys containing `.` are never split.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn new(first: impl Into<String>) -> Self {
        Self(vec![first.into()])
    }

    /// Split a dotted literal such as `"contributions.total"`.
    pub fn dotted(raw: &str) -> Self {
        Self(raw.split('.').map(str::to_string).collect())
    }

    pub fn child(mut self, seg: impl Into<String>) -> Self {
        self.0.push(seg.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_path_requires_even_segments() {
        assert!(DocPath::parse("users/alice").is_ok());
        assert!(DocPath::parse("users/alice/completions").is_err());
        assert!(DocPath::parse("users//completions/x").is_err());
        assert!(DocPath::parse("").is_err());
    }

    #[test]
    fn doc_path_parts() {
        let p = DocPath::parse("users/alice/completions/2026-10-14").unwrap();
        assert_eq!(p.id(), "2026-10-14");
        assert_eq!(p.collection().as_str(), "users/alice/completions");
    }

    #[test]
    fn collection_doc_joins() {
        let c = CollectionPath::from_segments(["users", "bob", "assigned_verifications"]).unwrap();
        assert_eq!(c.doc("2026-10-14").unwrap().as_str(), "users/bob/assigned_verifications/2026-10-14");
        assert!(c.doc("").is_err());
    }

    #[test]
    fn field_path_keeps_dotted_ids_whole() {
        let fp = FieldPath::new("task.v2").child("status");
        assert_eq!(fp.segments(), &["task.v2".to_string(), "status".to_string()]);
        assert_eq!(FieldPath::dotted("a.b").segments().len(), 2);
    }
}
