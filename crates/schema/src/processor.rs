//! Generic primitive processor
//!
//! Converts between stored and typed values without a field descriptor.
//! Used for free-form keys on an instance and for `DictField` contents.
//! The mapping is structural: objects become dicts, arrays become lists,
//! scalars map onto their typed counterpart.

use crate::typed::TypedValue;
use stratadoc_core::{Result, Value};

/// Convert a stored value to its typed form
pub fn to_typed(value: &Value) -> TypedValue {
    match value {
        Value::Null => TypedValue::Null,
        Value::Bool(b) => TypedValue::Bool(*b),
        Value::Int(i) => TypedValue::Int(*i),
        Value::Float(f) => TypedValue::Float(*f),
        Value::String(s) => TypedValue::Text(s.clone()),
        Value::Bytes(b) => TypedValue::Bytes(b.clone()),
        Value::Array(items) => TypedValue::List(items.iter().map(to_typed).collect()),
        Value::Object(map) => TypedValue::Dict(
            map.iter()
                .map(|(k, v)| (k.clone(), to_typed(v)))
                .collect(),
        ),
    }
}

/// Convert a typed value back to its stored form
///
/// Nested schema instances are materialized through their own descriptors.
/// Timestamps are stored as RFC 3339 text.
pub fn to_primitive(value: &TypedValue) -> Result<Value> {
    Ok(match value {
        TypedValue::Null => Value::Null,
        TypedValue::Bool(b) => Value::Bool(*b),
        TypedValue::Int(i) => Value::Int(*i),
        TypedValue::Float(f) => Value::Float(*f),
        TypedValue::Text(s) => Value::String(s.clone()),
        TypedValue::Bytes(b) => Value::Bytes(b.clone()),
        TypedValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
        TypedValue::List(items) => {
            Value::Array(items.iter().map(to_primitive).collect::<Result<Vec<_>>>()?)
        }
        TypedValue::Dict(map) => {
            let mut out = stratadoc_core::PrimitiveMap::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), to_primitive(v)?);
            }
            Value::Object(out)
        }
        TypedValue::Schema(instance) => Value::Object(instance.to_primitive()?),
    })
}
