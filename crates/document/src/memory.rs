//! In-memory storage backend
//!
//! Records live in a `DashMap` of collections; each collection keeps its
//! records in insertion order. Records saved without an id get a random
//! UUID v4 under the id field.
//!
//! Nothing is persisted. Used by tests and by the default configuration.

use crate::backend::{render_id, RecordIter, StorageBackend};
use crate::document::DocumentType;
use crate::indexer::IndexerRegistry;
use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use stratadoc_core::{Error, PrimitiveMap, Result, Value};
use tracing::debug;
use uuid::Uuid;

/// Default name of the id field
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Collections held in memory
#[derive(Debug)]
pub struct MemoryBackend {
    id_field: String,
    collections: DashMap<String, IndexMap<String, PrimitiveMap>>,
    registered: RwLock<Vec<String>>,
    indexers: IndexerRegistry,
}

impl MemoryBackend {
    /// Create an empty backend using `_id` as the id field
    pub fn new() -> Self {
        Self::with_id_field(DEFAULT_ID_FIELD)
    }

    /// Create an empty backend using `id_field` as the id field
    pub fn with_id_field(id_field: impl Into<String>) -> Self {
        MemoryBackend {
            id_field: id_field.into(),
            collections: DashMap::new(),
            registered: RwLock::new(Vec::new()),
            indexers: IndexerRegistry::new(),
        }
    }

    /// Number of records in `collection`
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, |c| c.len())
    }

    /// Check if `collection` holds no records
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Qualified names of the document types registered so far
    pub fn registered_documents(&self) -> Vec<String> {
        self.registered.read().clone()
    }

    /// Lossless key of a record: `7` and `"7"` are different ids
    fn record_key(id: &Value) -> String {
        id.to_json_string()
    }

    fn not_found(collection: &str, id: &Value) -> Error {
        Error::DocumentNotFound {
            collection: collection.to_string(),
            id: render_id(id),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryBackend {
    fn register_document(&self, document: &DocumentType) -> Result<()> {
        let name = document.schema().qualified_name();
        let mut registered = self.registered.write();
        if !registered.contains(&name) {
            registered.push(name);
        }
        Ok(())
    }

    fn save(&self, collection: &str, data: &mut PrimitiveMap) -> Result<()> {
        let id = match self.get_id(data) {
            Some(id) => id,
            None => {
                let id = Value::String(Uuid::new_v4().to_string());
                data.insert(self.id_field.clone(), id.clone());
                id
            }
        };
        debug!(collection, id = %render_id(&id), "memory backend save");
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(Self::record_key(&id), data.clone());
        Ok(())
    }

    fn get(&self, collection: &str, id: &Value) -> Result<PrimitiveMap> {
        self.collections
            .get(collection)
            .and_then(|records| records.get(&Self::record_key(id)).cloned())
            .ok_or_else(|| Self::not_found(collection, id))
    }

    fn delete(&self, collection: &str, id: &Value) -> Result<()> {
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|mut records| records.shift_remove(&Self::record_key(id)));
        match removed {
            Some(_) => {
                debug!(collection, id = %render_id(id), "memory backend delete");
                Ok(())
            }
            None => Err(Self::not_found(collection, id)),
        }
    }

    fn all(&self, collection: &str) -> Result<RecordIter> {
        let snapshot: Vec<PrimitiveMap> = self
            .collections
            .get(collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        Ok(Box::new(snapshot.into_iter()))
    }

    fn id_field_name(&self) -> &str {
        &self.id_field
    }

    fn indexers(&self) -> &IndexerRegistry {
        &self.indexers
    }
}
