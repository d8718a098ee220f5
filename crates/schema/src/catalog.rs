//! Schema catalog
//!
//! Maps schema keys to schema types. Registration is append-mostly:
//! re-registering a key with the same type (same qualified name, e.g. a
//! reloaded declaration) replaces the entry, registering it with a
//! different type is an error. The check and the insert happen under the
//! entry lock, so concurrent declarations cannot both win a key.

use crate::schema::SchemaRef;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use stratadoc_core::{Error, Result};
use tracing::{debug, warn};

/// Process-wide schema key -> type table
#[derive(Debug, Default)]
pub struct Catalog {
    schemas: DashMap<String, SchemaRef>,
}

impl Catalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `schema`
    ///
    /// # Errors
    ///
    /// Returns `Error::Registration` if `key` is bound to a different type.
    pub fn register(&self, key: &str, schema: &SchemaRef) -> Result<()> {
        match self.schemas.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get();
                if Arc::ptr_eq(existing, schema) {
                    return Ok(());
                }
                if existing.qualified_name() != schema.qualified_name() {
                    return Err(Error::Registration {
                        key: key.to_string(),
                        existing: existing.qualified_name(),
                        attempted: schema.qualified_name(),
                    });
                }
                warn!(key, schema = %schema.qualified_name(), "replacing redeclared schema");
                entry.insert(schema.clone());
                Ok(())
            }
            Entry::Vacant(entry) => {
                debug!(key, schema = %schema.qualified_name(), "registered schema");
                entry.insert(schema.clone());
                Ok(())
            }
        }
    }

    /// Unbind `key` if it is still bound to this very `schema`
    ///
    /// Returns whether an entry was removed. Used to back out a type whose
    /// declaration failed after it was catalogued.
    pub fn unregister(&self, key: &str, schema: &SchemaRef) -> bool {
        let removed = self
            .schemas
            .remove_if(key, |_, existing| Arc::ptr_eq(existing, schema))
            .is_some();
        if removed {
            debug!(key, schema = %schema.qualified_name(), "unregistered schema");
        }
        removed
    }

    /// Look up a schema by key
    pub fn get(&self, key: &str) -> Option<SchemaRef> {
        self.schemas.get(key).map(|entry| entry.value().clone())
    }

    /// Check whether a key is bound
    pub fn contains_key(&self, key: &str) -> bool {
        self.schemas.contains_key(key)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.schemas.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of registered keys
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
