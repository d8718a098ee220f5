//! Indexers and the per-backend indexer registry
//!
//! An `Indexer` is notified after every successful save and delete of the
//! documents it was enabled on. Indexers are created through named
//! factories registered with a backend's `IndexerRegistry`; the manager
//! looks a factory up by kind when an index is enabled.
//!
//! ## Registration rules
//!
//! Registering a kind again with a factory reporting the same
//! `factory_name` replaces the entry. Registering it with a different
//! factory is an error.

use crate::document::{Document, DocumentRef};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stratadoc_core::{Error, PrimitiveMap, Result};
use tracing::{debug, warn};

/// Shared handle to an indexer
pub type IndexerRef = Arc<dyn Indexer>;

/// Shared handle to an indexer factory
pub type FactoryRef = Arc<dyn IndexerFactory>;

/// Index maintenance hooks
pub trait Indexer: fmt::Debug + Send + Sync {
    /// Index name, unique per document type
    fn name(&self) -> &str;

    /// Called after the backend stored `document`
    fn on_document_save(&self, document: &Document) -> Result<()>;

    /// Called after the backend removed `document`
    fn on_document_delete(&self, document: &Document) -> Result<()>;
}

/// What an indexer is being created for
#[derive(Debug, Clone)]
pub struct IndexSpec {
    /// Document type the index covers
    pub document: DocumentRef,
    /// Index name
    pub name: String,
    /// Kind-specific parameters
    pub params: PrimitiveMap,
}

/// Creates indexers of one kind
pub trait IndexerFactory: fmt::Debug + Send + Sync {
    /// Identity of the implementation, used to detect conflicting registrations
    fn factory_name(&self) -> &str;

    /// Build an indexer for `spec`
    fn create(&self, spec: &IndexSpec) -> Result<IndexerRef>;
}

/// Named indexer factories of one backend
#[derive(Default)]
pub struct IndexerRegistry {
    factories: RwLock<HashMap<String, FactoryRef>>,
}

impl IndexerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `factory` available under `kind`
    ///
    /// # Errors
    ///
    /// Returns `Error::Registration` if `kind` is taken by another factory.
    pub fn register_indexer(&self, kind: &str, factory: FactoryRef) -> Result<()> {
        let mut factories = self.factories.write();
        if let Some(existing) = factories.get(kind) {
            if existing.factory_name() != factory.factory_name() {
                return Err(Error::Registration {
                    key: kind.to_string(),
                    existing: existing.factory_name().to_string(),
                    attempted: factory.factory_name().to_string(),
                });
            }
            warn!(kind, factory = factory.factory_name(), "replacing indexer factory");
        } else {
            debug!(kind, factory = factory.factory_name(), "registered indexer factory");
        }
        factories.insert(kind.to_string(), factory);
        Ok(())
    }

    /// Factory registered under `kind`
    pub fn get_indexer(&self, kind: &str) -> Option<FactoryRef> {
        self.factories.read().get(kind).cloned()
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.read().keys().cloned().collect();
        kinds.sort();
        kinds
    }
}

impl fmt::Debug for IndexerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
