//! Document manager
//!
//! Every document type has exactly one `Manager`, bound to it when the type
//! is built. The manager turns backend records into documents and owns the
//! indexes enabled on the type, in the order they were enabled.

use crate::document::{Document, DocumentRef, DocumentType};
use crate::indexer::{IndexSpec, IndexerRef};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};
use stratadoc_core::{Error, PrimitiveMap, Result, Value};
use tracing::debug;

/// Query collaborator and index table of a document type
#[derive(Default)]
pub struct Manager {
    document: OnceCell<Weak<DocumentType>>,
    indexes: RwLock<IndexMap<String, IndexerRef>>,
}

impl Manager {
    /// Create an unbound manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to `document`; a manager serves a single type
    pub(crate) fn contribute_to(&self, document: &DocumentRef) -> Result<()> {
        self.document
            .set(Arc::downgrade(document))
            .map_err(|_| {
                Error::Declaration(format!(
                    "manager of {} is already bound to another document type",
                    document.name()
                ))
            })
    }

    /// Document type this manager serves
    ///
    /// # Errors
    ///
    /// Returns `Error::Declaration` if the manager is unbound or its type
    /// has been dropped.
    pub fn document(&self) -> Result<DocumentRef> {
        self.document
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::Declaration("manager is not bound to a document type".into()))
    }

    /// Every stored document of this type
    ///
    /// Records are converted as the iterator advances; call again to
    /// restart from a fresh snapshot.
    pub fn all(&self) -> Result<Documents> {
        let document = self.document()?;
        let records = document
            .backend()
            .all(document.schema().options().collection())?;
        Ok(Documents { document, records })
    }

    /// Load the document with id `id`
    pub fn get(&self, id: impl Into<Value>) -> Result<Document> {
        let document = self.document()?;
        let data = document
            .backend()
            .get(document.schema().options().collection(), &id.into())?;
        document.from_primitive(data)
    }

    /// Number of stored documents of this type
    pub fn count(&self) -> Result<usize> {
        let document = self.document()?;
        Ok(document
            .backend()
            .all(document.schema().options().collection())?
            .count())
    }

    /// Create an index of kind `kind` named `name`
    ///
    /// The indexer is built by the factory the backend has registered for
    /// `kind`. Enabling a name again replaces the previous index in place.
    ///
    /// # Errors
    ///
    /// Returns `Error::KeyNotFound` if no factory is registered for `kind`,
    /// or whatever the factory returns.
    pub fn enable_index(
        &self,
        kind: &str,
        name: &str,
        params: PrimitiveMap,
    ) -> Result<IndexerRef> {
        let document = self.document()?;
        let factory = document
            .backend()
            .indexers()
            .get_indexer(kind)
            .ok_or_else(|| Error::KeyNotFound(format!("indexer kind '{}'", kind)))?;
        let indexer = factory.create(&IndexSpec {
            document: document.clone(),
            name: name.to_string(),
            params,
        })?;
        self.indexes
            .write()
            .insert(name.to_string(), indexer.clone());
        debug!(document = %document.name(), kind, index = name, "enabled index");
        Ok(indexer)
    }

    /// Enabled indexes, in the order they were enabled
    pub fn indexes(&self) -> Vec<IndexerRef> {
        self.indexes.read().values().cloned().collect()
    }

    /// Enabled index by name
    pub fn get_index(&self, name: &str) -> Option<IndexerRef> {
        self.indexes.read().get(name).cloned()
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = self
            .document
            .get()
            .and_then(Weak::upgrade)
            .map(|d| d.name().to_string());
        f.debug_struct("Manager")
            .field("document", &bound)
            .field("indexes", &self.indexes.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Lazy sequence of stored documents
pub struct Documents {
    document: DocumentRef,
    records: crate::backend::RecordIter,
}

impl Iterator for Documents {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .next()
            .map(|data| self.document.from_primitive(data))
    }
}

impl fmt::Debug for Documents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Documents")
            .field("document", &self.document.name())
            .finish()
    }
}
