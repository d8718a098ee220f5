//! Error types for stratadoc
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Errors fall into five families:
//! - declaration errors, raised while a schema type is being built
//! - field errors, raised when a value cannot be converted by its descriptor
//! - lookup errors, raised for unknown fields or keys
//! - backend errors, surfaced verbatim from the storage contract
//! - path errors, raised by the dotted-notation evaluator

use crate::path::PathError;
use std::io;
use thiserror::Error;

/// Result type alias for stratadoc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for stratadoc
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration block named options that are not recognized
    #[error("'Meta' got invalid attribute(s): {}", keys.join(","))]
    InvalidMeta {
        /// Offending option names, in declaration order
        keys: Vec<String>,
    },

    /// Any other fatal problem with a declaration
    #[error("Declaration error: {0}")]
    Declaration(String),

    /// Schema key already bound to a different type
    #[error("Schema key '{key}' is already registered to {existing}, cannot register {attempted}")]
    Registration {
        /// The contested schema key
        key: String,
        /// Qualified name of the registered type
        existing: String,
        /// Qualified name of the rejected type
        attempted: String,
    },

    /// Field lookup on a registry that does not declare it
    #[error("{schema} has no field named '{field}'")]
    FieldDoesNotExist {
        /// Schema type name
        schema: String,
        /// Requested field name
        field: String,
    },

    /// Free-form key absent from both representations
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A descriptor could not convert a value
    #[error("Conversion error: expected {expected}, found {found}")]
    Conversion {
        /// What the descriptor accepts
        expected: &'static str,
        /// Rendering of the offending value
        found: String,
    },

    /// Conversion failure attributed to a declared field
    #[error("Field '{field}' ({descriptor}) rejected value {value}: {source}")]
    Field {
        /// Field name
        field: String,
        /// Descriptor kind
        descriptor: String,
        /// Rendering of the offending value
        value: String,
        /// Underlying conversion failure
        #[source]
        source: Box<Error>,
    },

    /// Dotted-notation resolution failure
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// Backend has no record with this id
    #[error("Document not found in '{collection}': {id}")]
    DocumentNotFound {
        /// Collection searched
        collection: String,
        /// Rendered id (or `<none>` when the document has no id)
        id: String,
    },

    /// Failure reported by a storage backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a conversion error from the offending value's rendering
    pub fn conversion(expected: &'static str, found: impl Into<String>) -> Self {
        Error::Conversion {
            expected,
            found: found.into(),
        }
    }

    /// Check for a not-found condition (missing key, field, document or path)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::KeyNotFound(_)
                | Error::FieldDoesNotExist { .. }
                | Error::DocumentNotFound { .. }
                | Error::Path(PathError::NotFound { .. })
        )
    }
}
