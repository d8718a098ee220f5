//! stratadoc - schema-driven document mapping
//!
//! Declare typed schemas, build instances that convert lazily between a
//! stored primitive form and typed values, and persist documents through a
//! pluggable storage backend with a fixed save/delete lifecycle.
//!
//! # Quick Start
//!
//! ```
//! use stratadoc::{DocumentDeclaration, DocumentStore, IntegerField, TextField};
//!
//! let store = DocumentStore::in_memory();
//! let person = DocumentDeclaration::new("Person")
//!     .module("people::models")
//!     .field("name", TextField::new())
//!     .field("age", IntegerField::new())
//!     .build(&store)?;
//!
//! let ada = person.create([("name", "Ada"), ("age", "36")])?;
//! ada.save()?;
//!
//! let loaded = person.objects().get(ada.id().unwrap())?;
//! assert_eq!(loaded.get("age")?.as_int(), Some(36));
//! # Ok::<(), stratadoc::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `stratadoc-core`: primitive values, dotted paths, errors
//! - `stratadoc-schema`: field descriptors, schema types, instances, signals
//! - `stratadoc-document`: documents, managers, indexers, backends, stores
//!
//! Everything public in those crates is re-exported here.

pub use stratadoc_core::*;
pub use stratadoc_document::*;
pub use stratadoc_schema::*;
