//! Abstract document storage for the Terra engine.
//!
//! The record store is a hierarchical keyed document database: documents live at
//! slash-separated paths, hold nested JSON fields, and are written through atomic
//! multi-document batches. Every backend implements [`DocumentStore`]; the rest of
//! the workspace depends only on the trait.

pub mod batch;
pub mod document;
pub mod error;
pub mod path;
pub mod paths;

pub use batch::{CommitReceipt, FieldValue, Precondition, WriteBatch, WriteMode, WriteOp};
pub use document::{apply_op, check_preconditions, decode_doc, decode_field, get_field, to_value, Document};
pub use error::StoreError;
pub use path::{CollectionPath, DocPath, FieldPath};

/// A keyed document database with atomic batched writes.
///
/// Implementations must be safe to share across threads; the engine issues
/// independent short-lived requests from many callers at once.
pub trait DocumentStore: Send + Sync {
    /// Read one document. `Ok(None)` if it does not exist.
    fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    /// List documents directly under `collection` whose id starts with `id_prefix`,
    /// ordered by id.
    fn list(
        &self,
        collection: &CollectionPath,
        id_prefix: &str,
    ) -> Result<Vec<(DocPath, Document)>, StoreError>;

    /// Apply every operation in `batch` or none of them.
    ///
    /// Preconditions are checked against the state before the batch. Every
    /// [`FieldValue::ServerTimestamp`] in one commit resolves to the same instant,
    /// which is returned in the receipt.
    fn commit(&self, batch: WriteBatch) -> Result<CommitReceipt, StoreError>;
}
