//! Storage backend contract
//!
//! This module defines the `StorageBackend` trait that documents persist
//! through. The core never talks to storage any other way, so a backend can
//! be swapped without touching schema or lifecycle code.
//!
//! Backends deal in primitive maps only. Turning stored data into
//! documents is the manager's job.

use crate::document::DocumentType;
use crate::indexer::IndexerRegistry;
use std::fmt;
use std::sync::Arc;
use stratadoc_core::{PrimitiveMap, Result, Value};

/// Shared handle to a storage backend
pub type BackendRef = Arc<dyn StorageBackend>;

/// Snapshot of a collection, as returned by [`StorageBackend::all`]
pub type RecordIter = Box<dyn Iterator<Item = PrimitiveMap> + Send>;

/// Persistence contract for documents
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync). Each call is a single blocking
/// request/response from the caller's point of view.
pub trait StorageBackend: fmt::Debug + Send + Sync {
    /// Hook called once per persistent document type when it is declared
    ///
    /// # Errors
    ///
    /// A failure aborts the declaration.
    fn register_document(&self, document: &DocumentType) -> Result<()>;

    /// Store `data` in `collection`
    ///
    /// The backend may write into `data`, typically to assign an id; the
    /// caller copies the result back into the document.
    ///
    /// # Errors
    ///
    /// Returns `Error::Backend` on I/O or constraint failures.
    fn save(&self, collection: &str, data: &mut PrimitiveMap) -> Result<()>;

    /// Load the record with id `id`
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentNotFound` if there is no such record.
    fn get(&self, collection: &str, id: &Value) -> Result<PrimitiveMap>;

    /// Remove the record with id `id`
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentNotFound` if there is no such record.
    fn delete(&self, collection: &str, id: &Value) -> Result<()>;

    /// Every record of `collection`
    ///
    /// The iterator works on a snapshot taken at call time; call again to
    /// restart.
    fn all(&self, collection: &str) -> Result<RecordIter>;

    /// Name of the field that carries a record's id
    fn id_field_name(&self) -> &str;

    /// Id of a record, if it has one
    fn get_id(&self, data: &PrimitiveMap) -> Option<Value> {
        data.get(self.id_field_name())
            .filter(|id| !id.is_null())
            .cloned()
    }

    /// Indexer implementations available to documents stored here
    fn indexers(&self) -> &IndexerRegistry;
}

/// Render an id for keys and messages
///
/// Text ids render bare, anything else as JSON.
pub fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_json_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_id() {
        assert_eq!(render_id(&Value::from("abc")), "abc");
        assert_eq!(render_id(&Value::Int(42)), "42");
    }
}
