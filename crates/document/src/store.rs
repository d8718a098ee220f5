//! Document store
//!
//! A `DocumentStore` ties a [`SchemaRegistry`] to one storage backend and
//! keeps every document type built against it, keyed by schema key.
//!
//! Stores opened from a directory are process-wide singletons: opening the
//! same path twice returns the same `Arc` while any handle is alive.

use crate::backend::BackendRef;
use crate::config::{StoreConfig, CONFIG_FILE_NAME};
use crate::document::DocumentRef;
use crate::memory::MemoryBackend;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use stratadoc_core::{Error, Result};
use stratadoc_schema::{SchemaRegistry, Signals};
use tracing::{debug, info};

// =============================================================================
// Global Store Registry
// =============================================================================

/// Open stores (canonical path -> weak reference)
pub static OPEN_STORES: Lazy<Mutex<HashMap<PathBuf, Weak<DocumentStore>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Registry, backend and document types of one store
pub struct DocumentStore {
    config: StoreConfig,
    registry: SchemaRegistry,
    backend: BackendRef,
    documents: DashMap<String, DocumentRef>,
    path: Option<PathBuf>,
}

impl DocumentStore {
    /// Create a store over `backend` with a fresh registry
    pub fn new(backend: BackendRef) -> Self {
        DocumentStore {
            config: StoreConfig::default(),
            registry: SchemaRegistry::new(),
            backend,
            documents: DashMap::new(),
            path: None,
        }
    }

    /// Create a store over a fresh [`MemoryBackend`]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Create a store from a configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        let backend = config.build_backend()?;
        let registry =
            SchemaRegistry::with_installed_namespaces(config.installed_namespaces.iter().cloned());
        Ok(DocumentStore {
            config,
            registry,
            backend,
            documents: DashMap::new(),
            path: None,
        })
    }

    /// Open the store rooted at `path`
    ///
    /// Creates the directory and a default `stratadoc.toml` when missing,
    /// then reads the configuration from it. If a store for the same path
    /// is already open, the existing instance is returned.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let dir = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        let canonical_path = dir.canonicalize()?;

        // Held for the whole open so two threads cannot build the same store
        let mut registry = OPEN_STORES.lock();
        if let Some(store) = registry.get(&canonical_path).and_then(Weak::upgrade) {
            debug!(path = ?canonical_path, "returning existing store instance");
            return Ok(store);
        }

        let config_path = canonical_path.join(CONFIG_FILE_NAME);
        StoreConfig::write_default_if_missing(&config_path)?;
        let config = StoreConfig::from_file(&config_path)?;

        let mut store = Self::with_config(config)?;
        store.path = Some(canonical_path.clone());
        let store = Arc::new(store);
        registry.insert(canonical_path.clone(), Arc::downgrade(&store));
        info!(path = ?canonical_path, backend = %store.config.backend, "opened store");
        Ok(store)
    }

    /// Configuration the store was built from
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Directory the store was opened from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Declaration context shared by every type of this store
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Notification hub
    pub fn signals(&self) -> &Arc<Signals> {
        self.registry.signals()
    }

    /// Storage backend
    pub fn backend(&self) -> &BackendRef {
        &self.backend
    }

    /// Document type stored under `key`
    pub fn get_document(&self, key: &str) -> Result<DocumentRef> {
        self.documents
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::KeyNotFound(format!("document '{}'", key)))
    }

    /// Keys of every document type, sorted
    pub fn documents(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.documents.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub(crate) fn record_document(&self, document: &DocumentRef) {
        let options = document.schema().options();
        if options.is_virtual() {
            return;
        }
        // A proxy shares its ancestor's key; the ancestor keeps the slot
        if options.is_proxy() && self.documents.contains_key(options.schema_key()) {
            return;
        }
        self.documents
            .insert(options.schema_key().to_string(), document.clone());
    }
}

impl Drop for DocumentStore {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let mut registry = OPEN_STORES.lock();
            if registry
                .get(&path)
                .map_or(false, |weak| weak.strong_count() == 0)
            {
                registry.remove(&path);
            }
        }
    }
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("config", &self.config)
            .field("path", &self.path)
            .field("documents", &self.documents())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_writes_default_config() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        assert!(dir.path().join(CONFIG_FILE_NAME).exists());
        assert_eq!(store.config(), &StoreConfig::default());
        assert_eq!(store.backend().id_field_name(), "_id");
    }

    #[test]
    fn test_open_same_path_returns_same_instance() {
        let dir = TempDir::new().unwrap();
        let first = DocumentStore::open(dir.path()).unwrap();
        let second = DocumentStore::open(dir.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_reopen_after_drop_builds_new_store() {
        let dir = TempDir::new().unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        drop(store);
        assert!(!OPEN_STORES.lock().contains_key(&canonical));
        assert!(DocumentStore::open(dir.path()).is_ok());
    }

    #[test]
    fn test_open_reads_edited_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "id_field = \"key\"\ninstalled_namespaces = [\"people\"]\n",
        )
        .unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        assert_eq!(store.backend().id_field_name(), "key");
        assert!(store.registry().is_installed("people"));
    }

    #[test]
    fn test_open_rejects_bad_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "backend = \"s3\"\n").unwrap();
        let err = DocumentStore::open(dir.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_document_is_not_found() {
        let store = DocumentStore::in_memory();
        let err = store.get_document("nope").unwrap_err();
        assert!(err.is_not_found());
        assert!(store.documents().is_empty());
    }
}
