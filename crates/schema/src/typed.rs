//! Typed values
//!
//! `TypedValue` is the in-memory form of a field value, produced by a field
//! descriptor from the stored `Value`. Nested schema values are shared
//! handles, so reading the same nested field twice yields the same instance.

use crate::instance::InstanceRef;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stratadoc_core::Value;

/// In-memory representation of a field value
#[derive(Debug, Clone)]
pub enum TypedValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// UTC timestamp
    DateTime(DateTime<Utc>),
    /// Sequence of typed values
    List(Vec<TypedValue>),
    /// Free-form mapping of typed values
    Dict(HashMap<String, TypedValue>),
    /// Nested schema instance
    Schema(InstanceRef),
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypedValue::Null, TypedValue::Null) => true,
            (TypedValue::Bool(a), TypedValue::Bool(b)) => a == b,
            (TypedValue::Int(a), TypedValue::Int(b)) => a == b,
            (TypedValue::Float(a), TypedValue::Float(b)) => a == b,
            (TypedValue::Text(a), TypedValue::Text(b)) => a == b,
            (TypedValue::Bytes(a), TypedValue::Bytes(b)) => a == b,
            (TypedValue::DateTime(a), TypedValue::DateTime(b)) => a == b,
            (TypedValue::List(a), TypedValue::List(b)) => a == b,
            (TypedValue::Dict(a), TypedValue::Dict(b)) => a == b,
            // Instances compare by identity
            (TypedValue::Schema(a), TypedValue::Schema(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Default for TypedValue {
    fn default() -> Self {
        TypedValue::Null
    }
}

impl TypedValue {
    /// Short lower-case name of the variant, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Bool(_) => "bool",
            TypedValue::Int(_) => "int",
            TypedValue::Float(_) => "float",
            TypedValue::Text(_) => "text",
            TypedValue::Bytes(_) => "bytes",
            TypedValue::DateTime(_) => "datetime",
            TypedValue::List(_) => "list",
            TypedValue::Dict(_) => "dict",
            TypedValue::Schema(_) => "schema",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TypedValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            TypedValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a Text value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the timestamp if this is a DateTime value
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            TypedValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Get as a slice if this is a List value
    pub fn as_list(&self) -> Option<&[TypedValue]> {
        match self {
            TypedValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get the map if this is a Dict value
    pub fn as_dict(&self) -> Option<&HashMap<String, TypedValue>> {
        match self {
            TypedValue::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// Get the nested instance if this is a Schema value
    pub fn as_schema(&self) -> Option<&InstanceRef> {
        match self {
            TypedValue::Schema(instance) => Some(instance),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Null => write!(f, "null"),
            TypedValue::Bool(b) => write!(f, "{}", b),
            TypedValue::Int(i) => write!(f, "{}", i),
            TypedValue::Float(x) => write!(f, "{}", x),
            TypedValue::Text(s) => write!(f, "{:?}", s),
            TypedValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            TypedValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            TypedValue::List(items) => write!(f, "<list of {}>", items.len()),
            TypedValue::Dict(map) => write!(f, "<dict of {}>", map.len()),
            TypedValue::Schema(instance) => write!(f, "<{} instance>", instance.schema().name()),
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for TypedValue {
    fn from(s: &str) -> Self {
        TypedValue::Text(s.to_string())
    }
}

impl From<String> for TypedValue {
    fn from(s: String) -> Self {
        TypedValue::Text(s)
    }
}

impl From<bool> for TypedValue {
    fn from(b: bool) -> Self {
        TypedValue::Bool(b)
    }
}

impl From<i64> for TypedValue {
    fn from(i: i64) -> Self {
        TypedValue::Int(i)
    }
}

impl From<i32> for TypedValue {
    fn from(i: i32) -> Self {
        TypedValue::Int(i as i64)
    }
}

impl From<f64> for TypedValue {
    fn from(f: f64) -> Self {
        TypedValue::Float(f)
    }
}

impl From<DateTime<Utc>> for TypedValue {
    fn from(dt: DateTime<Utc>) -> Self {
        TypedValue::DateTime(dt)
    }
}

impl From<Vec<TypedValue>> for TypedValue {
    fn from(items: Vec<TypedValue>) -> Self {
        TypedValue::List(items)
    }
}

impl From<HashMap<String, TypedValue>> for TypedValue {
    fn from(map: HashMap<String, TypedValue>) -> Self {
        TypedValue::Dict(map)
    }
}

impl From<InstanceRef> for TypedValue {
    fn from(instance: InstanceRef) -> Self {
        TypedValue::Schema(instance)
    }
}

impl<T: Into<TypedValue>> From<Option<T>> for TypedValue {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(TypedValue::Null)
    }
}

/// Primitive-shaped input goes through the generic processor
impl From<Value> for TypedValue {
    fn from(value: Value) -> Self {
        crate::processor::to_typed(&value)
    }
}
