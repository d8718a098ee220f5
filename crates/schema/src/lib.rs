//! Schema layer for stratadoc
//!
//! Declares typed schemas and the instances built from them:
//! - **SchemaDeclaration**: builder that validates options, merges inherited
//!   fields and registers the resulting `SchemaType`
//! - **SchemaOptions**: per-type field registry (ordered fields, schema key,
//!   collection, flags)
//! - **SchemaInstance**: dual-representation record with lazy, memoized
//!   conversion from stored to typed values
//! - **FieldDescriptor**: conversion contract, with built-in fields for
//!   scalars, timestamps, lists, dicts and nested schemas
//! - **Signals**: synchronous lifecycle notifications
//!
//! ## Two Representations
//!
//! Every instance keeps the primitive map it was loaded from next to a cache
//! of typed values. Reads fill the cache; writes go to the cache only;
//! `to_primitive` writes the cache back. Untouched fields are never
//! converted.
//!
//! ## Shared State
//!
//! A `SchemaRegistry` carries the catalog and signal hub. Pass the same
//! registry to every declaration that should share a schema-key namespace.
//!
//! ```
//! use stratadoc_schema::{IntegerField, SchemaDeclaration, SchemaInstance, SchemaRegistry, TextField};
//!
//! let registry = SchemaRegistry::new();
//! let person = SchemaDeclaration::new("Person")
//!     .field("name", TextField::new())
//!     .field("age", IntegerField::new())
//!     .build(&registry)
//!     .unwrap();
//!
//! let ada = SchemaInstance::new(&person, [("name", "Ada"), ("age", "36")]).unwrap();
//! assert_eq!(ada.get("age").unwrap().as_int(), Some(36));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod dot_notation;
pub mod field;
pub mod fields;
pub mod instance;
pub mod meta;
pub mod options;
pub mod processor;
pub mod registry;
pub mod schema;
pub mod signals;
pub mod typed;

pub use catalog::Catalog;
pub use field::{next_declaration_order, FieldBase, FieldDescriptor, FieldRef};
pub use fields::{
    BooleanField, DateTimeField, DictField, FloatField, IntegerField, ListField, SchemaField,
    TextField,
};
pub use instance::{InstanceRef, SchemaInstance};
pub use meta::{Meta, DEFAULT_NAMES, VERBOSE_NAME_PLURAL};
pub use options::{humanize, FieldLookup, SchemaOptions, DEFAULT_ORDERING};
pub use registry::SchemaRegistry;
pub use schema::{
    create_schema, namespace_from_module, SchemaDeclaration, SchemaRef, SchemaType,
    DEFAULT_MODULE,
};
pub use signals::{Event, Handler, SignalKind, Signals};
pub use typed::TypedValue;
