//! Document layer for stratadoc
//!
//! Binds schema types to storage:
//! - **DocumentDeclaration**: builds a schema type, attaches a `Manager` and
//!   registers the type with the backend
//! - **Document**: a schema instance with `save` / `delete`
//! - **Manager**: loads stored records back as documents and owns indexes
//! - **StorageBackend**: pluggable record store; `MemoryBackend` ships here
//! - **DocumentStore**: a registry plus a backend, optionally opened from a
//!   directory holding `stratadoc.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod declaration;
pub mod document;
pub mod indexer;
pub mod manager;
pub mod memory;
pub mod store;

pub use backend::{render_id, BackendRef, RecordIter, StorageBackend};
pub use config::{StoreConfig, CONFIG_FILE_NAME, KNOWN_BACKENDS};
pub use declaration::{create_document, DocumentDeclaration};
pub use document::{Document, DocumentRef, DocumentType};
pub use indexer::{FactoryRef, IndexSpec, Indexer, IndexerFactory, IndexerRef, IndexerRegistry};
pub use manager::{Documents, Manager};
pub use memory::{MemoryBackend, DEFAULT_ID_FIELD};
pub use store::{DocumentStore, OPEN_STORES};
