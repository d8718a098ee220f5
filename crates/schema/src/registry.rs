//! Declaration context
//!
//! A `SchemaRegistry` bundles the shared state every declaration site needs:
//! the schema catalog, the notification hub and the list of installed
//! namespaces. It is cheap to clone; clones share the same tables.

use crate::catalog::Catalog;
use crate::schema::SchemaRef;
use crate::signals::Signals;
use std::collections::HashSet;
use std::sync::Arc;

/// Shared catalog, signals and installed namespaces
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    catalog: Arc<Catalog>,
    signals: Arc<Signals>,
    installed: Arc<HashSet<String>>,
}

impl SchemaRegistry {
    /// Create a registry with an empty catalog and no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that treats `namespaces` as installed
    pub fn with_installed_namespaces<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SchemaRegistry {
            installed: Arc::new(namespaces.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Schema catalog
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Notification hub
    pub fn signals(&self) -> &Arc<Signals> {
        &self.signals
    }

    /// Check whether a namespace is installed
    pub fn is_installed(&self, namespace: &str) -> bool {
        self.installed.contains(namespace)
    }

    /// Look up a catalogued schema
    pub fn get_schema(&self, key: &str) -> Option<SchemaRef> {
        self.catalog.get(key)
    }
}
