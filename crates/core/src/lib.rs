//! Core types for stratadoc
//!
//! This crate defines the foundational types used throughout the system:
//! - Value / PrimitiveMap: the stored ("primitive") representation
//! - DotPath: dotted-notation paths (`addresses.0.city`)
//! - Error: Error type hierarchy shared by every crate

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod path;
pub mod value;

pub use error::{Error, Result};
pub use path::{DotPath, PathError, PathSegment};
pub use value::{primitive_map_from_json, PrimitiveMap, Value};
