//! Built-in field descriptors
//!
//! Conversions are lenient on the way in (`"31"` becomes `31` for an
//! integer field) and strict on the way out: `to_primitive` only accepts
//! the typed variant the field produces, or null.

use crate::field::{FieldBase, FieldDescriptor, FieldRef};
use crate::instance::{InstanceRef, SchemaInstance};
use crate::processor;
use crate::schema::SchemaRef;
use crate::typed::TypedValue;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use stratadoc_core::{Error, Result, Value};

fn rendered(value: &Value) -> String {
    value.to_json_string()
}

/// Whole floats in `[i64::MIN, i64::MAX]`; `i64::MAX as f64` rounds up to 2^63
fn fits_i64(f: f64) -> bool {
    f >= i64::MIN as f64 && f < i64::MAX as f64
}

macro_rules! base_accessors {
    () => {
        fn declaration_order(&self) -> u64 {
            self.base.order()
        }

        fn bind(&self, _schema: &str, attname: &str) {
            self.base.bind(attname);
        }

        fn attname(&self) -> Option<&str> {
            self.base.attname()
        }
    };
}

macro_rules! with_default {
    ($ty:ty) => {
        impl $ty {
            /// Value returned when the stored value is null or missing
            pub fn with_default(mut self, default: impl Into<TypedValue>) -> Self {
                self.base.set_default(default.into());
                self
            }
        }
    };
}

// =============================================================================
// Scalars
// =============================================================================

/// UTF-8 text
#[derive(Debug, Default)]
pub struct TextField {
    base: FieldBase,
}

impl TextField {
    /// Create a text field
    pub fn new() -> Self {
        TextField {
            base: FieldBase::new(),
        }
    }
}

with_default!(TextField);

impl FieldDescriptor for TextField {
    fn kind(&self) -> &'static str {
        "TextField"
    }

    base_accessors!();

    fn to_primitive(&self, value: &TypedValue) -> Result<Value> {
        match value {
            TypedValue::Null => Ok(Value::Null),
            TypedValue::Text(s) => Ok(Value::String(s.clone())),
            other => Err(Error::conversion("text", other.to_string())),
        }
    }

    fn to_typed(&self, value: &Value, _parent: Option<&InstanceRef>) -> Result<TypedValue> {
        match value {
            Value::Null => Ok(self.base.default_or(TypedValue::Null)),
            Value::String(s) => Ok(TypedValue::Text(s.clone())),
            Value::Int(i) => Ok(TypedValue::Text(i.to_string())),
            Value::Float(f) => Ok(TypedValue::Text(f.to_string())),
            Value::Bool(b) => Ok(TypedValue::Text(b.to_string())),
            other => Err(Error::conversion("text", rendered(other))),
        }
    }

    fn is_instance(&self, value: &TypedValue) -> bool {
        matches!(value, TypedValue::Text(_))
    }
}

/// 64-bit signed integer
#[derive(Debug, Default)]
pub struct IntegerField {
    base: FieldBase,
}

impl IntegerField {
    /// Create an integer field
    pub fn new() -> Self {
        IntegerField {
            base: FieldBase::new(),
        }
    }
}

with_default!(IntegerField);

impl FieldDescriptor for IntegerField {
    fn kind(&self) -> &'static str {
        "IntegerField"
    }

    base_accessors!();

    fn to_primitive(&self, value: &TypedValue) -> Result<Value> {
        match value {
            TypedValue::Null => Ok(Value::Null),
            TypedValue::Int(i) => Ok(Value::Int(*i)),
            other => Err(Error::conversion("integer", other.to_string())),
        }
    }

    fn to_typed(&self, value: &Value, _parent: Option<&InstanceRef>) -> Result<TypedValue> {
        match value {
            Value::Null => Ok(self.base.default_or(TypedValue::Null)),
            Value::Int(i) => Ok(TypedValue::Int(*i)),
            Value::Float(f) if f.fract() == 0.0 && fits_i64(*f) => Ok(TypedValue::Int(*f as i64)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(TypedValue::Int)
                .map_err(|_| Error::conversion("integer", rendered(value))),
            other => Err(Error::conversion("integer", rendered(other))),
        }
    }

    fn is_instance(&self, value: &TypedValue) -> bool {
        matches!(value, TypedValue::Int(_))
    }
}

/// 64-bit float
#[derive(Debug, Default)]
pub struct FloatField {
    base: FieldBase,
}

impl FloatField {
    /// Create a float field
    pub fn new() -> Self {
        FloatField {
            base: FieldBase::new(),
        }
    }
}

with_default!(FloatField);

impl FieldDescriptor for FloatField {
    fn kind(&self) -> &'static str {
        "FloatField"
    }

    base_accessors!();

    fn to_primitive(&self, value: &TypedValue) -> Result<Value> {
        match value {
            TypedValue::Null => Ok(Value::Null),
            TypedValue::Float(f) => Ok(Value::Float(*f)),
            other => Err(Error::conversion("float", other.to_string())),
        }
    }

    fn to_typed(&self, value: &Value, _parent: Option<&InstanceRef>) -> Result<TypedValue> {
        match value {
            Value::Null => Ok(self.base.default_or(TypedValue::Null)),
            Value::Float(f) => Ok(TypedValue::Float(*f)),
            Value::Int(i) => Ok(TypedValue::Float(*i as f64)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(TypedValue::Float)
                .map_err(|_| Error::conversion("float", rendered(value))),
            other => Err(Error::conversion("float", rendered(other))),
        }
    }

    fn is_instance(&self, value: &TypedValue) -> bool {
        matches!(value, TypedValue::Float(_))
    }
}

/// Boolean
#[derive(Debug, Default)]
pub struct BooleanField {
    base: FieldBase,
}

impl BooleanField {
    /// Create a boolean field
    pub fn new() -> Self {
        BooleanField {
            base: FieldBase::new(),
        }
    }
}

with_default!(BooleanField);

impl FieldDescriptor for BooleanField {
    fn kind(&self) -> &'static str {
        "BooleanField"
    }

    base_accessors!();

    fn to_primitive(&self, value: &TypedValue) -> Result<Value> {
        match value {
            TypedValue::Null => Ok(Value::Null),
            TypedValue::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(Error::conversion("boolean", other.to_string())),
        }
    }

    fn to_typed(&self, value: &Value, _parent: Option<&InstanceRef>) -> Result<TypedValue> {
        match value {
            Value::Null => Ok(self.base.default_or(TypedValue::Null)),
            Value::Bool(b) => Ok(TypedValue::Bool(*b)),
            Value::Int(0) => Ok(TypedValue::Bool(false)),
            Value::Int(1) => Ok(TypedValue::Bool(true)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => Ok(TypedValue::Bool(true)),
                "false" | "f" | "0" => Ok(TypedValue::Bool(false)),
                _ => Err(Error::conversion("boolean", rendered(value))),
            },
            other => Err(Error::conversion("boolean", rendered(other))),
        }
    }

    fn is_instance(&self, value: &TypedValue) -> bool {
        matches!(value, TypedValue::Bool(_))
    }
}

/// UTC timestamp, stored as RFC 3339 text
///
/// Integer input is read as seconds since the Unix epoch.
#[derive(Debug, Default)]
pub struct DateTimeField {
    base: FieldBase,
}

impl DateTimeField {
    /// Create a timestamp field
    pub fn new() -> Self {
        DateTimeField {
            base: FieldBase::new(),
        }
    }
}

with_default!(DateTimeField);

impl FieldDescriptor for DateTimeField {
    fn kind(&self) -> &'static str {
        "DateTimeField"
    }

    base_accessors!();

    fn to_primitive(&self, value: &TypedValue) -> Result<Value> {
        match value {
            TypedValue::Null => Ok(Value::Null),
            TypedValue::DateTime(dt) => Ok(Value::String(dt.to_rfc3339())),
            other => Err(Error::conversion("datetime", other.to_string())),
        }
    }

    fn to_typed(&self, value: &Value, _parent: Option<&InstanceRef>) -> Result<TypedValue> {
        match value {
            Value::Null => Ok(self.base.default_or(TypedValue::Null)),
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .map(|dt| TypedValue::DateTime(dt.with_timezone(&Utc)))
                .map_err(|_| Error::conversion("datetime", rendered(value))),
            Value::Int(secs) => Utc
                .timestamp_opt(*secs, 0)
                .single()
                .map(TypedValue::DateTime)
                .ok_or_else(|| Error::conversion("datetime", rendered(value))),
            other => Err(Error::conversion("datetime", rendered(other))),
        }
    }

    fn is_instance(&self, value: &TypedValue) -> bool {
        matches!(value, TypedValue::DateTime(_))
    }
}

// =============================================================================
// Containers
// =============================================================================

/// Sequence of values governed by an element descriptor
///
/// A null stored value reads as an empty list.
#[derive(Debug)]
pub struct ListField {
    base: FieldBase,
    item: FieldRef,
}

impl ListField {
    /// Create a list whose elements use `item`
    pub fn new<F: FieldDescriptor + 'static>(item: F) -> Self {
        Self::of(Arc::new(item))
    }

    /// Create a list around an already shared element descriptor
    pub fn of(item: FieldRef) -> Self {
        ListField {
            base: FieldBase::new(),
            item,
        }
    }
}

with_default!(ListField);

impl FieldDescriptor for ListField {
    fn kind(&self) -> &'static str {
        "ListField"
    }

    base_accessors!();

    fn to_primitive(&self, value: &TypedValue) -> Result<Value> {
        match value {
            TypedValue::Null => Ok(Value::Null),
            TypedValue::List(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|item| self.item.to_primitive(item))
                    .collect::<Result<Vec<_>>>()?,
            )),
            other => Err(Error::conversion("list", other.to_string())),
        }
    }

    fn to_typed(&self, value: &Value, parent: Option<&InstanceRef>) -> Result<TypedValue> {
        match value {
            Value::Null => Ok(self.base.default_or(TypedValue::List(Vec::new()))),
            Value::Array(items) => Ok(TypedValue::List(
                items
                    .iter()
                    .map(|item| self.item.to_typed(item, parent))
                    .collect::<Result<Vec<_>>>()?,
            )),
            other => Err(Error::conversion("list", rendered(other))),
        }
    }

    fn is_instance(&self, value: &TypedValue) -> bool {
        match value {
            TypedValue::List(items) => items.iter().all(|item| self.item.is_instance(item)),
            _ => false,
        }
    }

    fn item_field(&self) -> Option<&FieldRef> {
        Some(&self.item)
    }
}

/// Free-form mapping, converted with the generic primitive processor
///
/// A null stored value reads as an empty dict.
#[derive(Debug, Default)]
pub struct DictField {
    base: FieldBase,
}

impl DictField {
    /// Create a free-form mapping field
    pub fn new() -> Self {
        DictField {
            base: FieldBase::new(),
        }
    }
}

with_default!(DictField);

impl FieldDescriptor for DictField {
    fn kind(&self) -> &'static str {
        "DictField"
    }

    base_accessors!();

    fn to_primitive(&self, value: &TypedValue) -> Result<Value> {
        match value {
            TypedValue::Null => Ok(Value::Null),
            TypedValue::Dict(_) => processor::to_primitive(value),
            other => Err(Error::conversion("dict", other.to_string())),
        }
    }

    fn to_typed(&self, value: &Value, _parent: Option<&InstanceRef>) -> Result<TypedValue> {
        match value {
            Value::Null => Ok(self.base.default_or(TypedValue::Dict(Default::default()))),
            Value::Object(_) => Ok(processor::to_typed(value)),
            other => Err(Error::conversion("dict", rendered(other))),
        }
    }

    fn is_instance(&self, value: &TypedValue) -> bool {
        matches!(value, TypedValue::Dict(_))
    }
}

/// Nested schema instance
///
/// Accepts instances of the declared schema or any of its subtypes.
#[derive(Debug)]
pub struct SchemaField {
    base: FieldBase,
    schema: SchemaRef,
}

impl SchemaField {
    /// Create a field holding instances of `schema`
    pub fn new(schema: &SchemaRef) -> Self {
        SchemaField {
            base: FieldBase::new(),
            schema: schema.clone(),
        }
    }
}

impl FieldDescriptor for SchemaField {
    fn kind(&self) -> &'static str {
        "SchemaField"
    }

    base_accessors!();

    fn to_primitive(&self, value: &TypedValue) -> Result<Value> {
        match value {
            TypedValue::Null => Ok(Value::Null),
            TypedValue::Schema(instance) => Ok(Value::Object(instance.to_primitive()?)),
            other => Err(Error::conversion("schema instance", other.to_string())),
        }
    }

    fn to_typed(&self, value: &Value, parent: Option<&InstanceRef>) -> Result<TypedValue> {
        match value {
            Value::Null => Ok(self.base.default_or(TypedValue::Null)),
            Value::Object(map) => Ok(TypedValue::Schema(SchemaInstance::from_primitive(
                &self.schema,
                Some(map.clone()),
                parent,
            )?)),
            other => Err(Error::conversion("mapping", rendered(other))),
        }
    }

    fn is_instance(&self, value: &TypedValue) -> bool {
        match value {
            TypedValue::Schema(instance) => instance.schema().is_subtype_of(&self.schema),
            _ => false,
        }
    }

    fn schema(&self) -> Option<&SchemaRef> {
        Some(&self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_integer_coerces_numeric_text() {
        let field = IntegerField::new();
        let typed = field.to_typed(&Value::from("31"), None).unwrap();
        assert_eq!(typed, TypedValue::Int(31));
    }

    #[test]
    fn test_integer_rejects_garbage() {
        let field = IntegerField::new();
        let err = field.to_typed(&Value::from("thirty"), None).unwrap_err();
        assert!(matches!(err, Error::Conversion { expected: "integer", .. }));
    }

    #[test]
    fn test_integer_rejects_out_of_range_float() {
        let field = IntegerField::new();
        for raw in [1e20, -1e20, 9_223_372_036_854_775_808.0, f64::INFINITY] {
            let err = field.to_typed(&Value::Float(raw), None).unwrap_err();
            assert!(matches!(err, Error::Conversion { expected: "integer", .. }));
        }
        assert_eq!(
            field.to_typed(&Value::Float(-9_223_372_036_854_775_808.0), None).unwrap(),
            TypedValue::Int(i64::MIN)
        );
        assert_eq!(field.to_typed(&Value::Float(42.0), None).unwrap(), TypedValue::Int(42));
    }

    #[test]
    fn test_integer_default_for_null() {
        let field = IntegerField::new().with_default(0);
        assert_eq!(field.to_typed(&Value::Null, None).unwrap(), TypedValue::Int(0));
    }

    #[test]
    fn test_text_to_primitive_is_strict() {
        let field = TextField::new();
        assert!(field.to_primitive(&TypedValue::Int(3)).is_err());
        assert_eq!(
            field.to_primitive(&TypedValue::from("a")).unwrap(),
            Value::from("a")
        );
    }

    #[test]
    fn test_boolean_accepts_text_forms() {
        let field = BooleanField::new();
        assert_eq!(field.to_typed(&Value::from("True"), None).unwrap(), TypedValue::Bool(true));
        assert_eq!(field.to_typed(&Value::Int(0), None).unwrap(), TypedValue::Bool(false));
        assert!(field.to_typed(&Value::Int(7), None).is_err());
    }

    #[test]
    fn test_datetime_parses_rfc3339_and_epoch() {
        let field = DateTimeField::new();
        let parsed = field
            .to_typed(&Value::from("2024-02-29T10:00:00Z"), None)
            .unwrap();
        assert_eq!(parsed.as_datetime().unwrap().day(), 29);

        let epoch = field.to_typed(&Value::Int(0), None).unwrap();
        assert_eq!(epoch.as_datetime().unwrap().year(), 1970);
    }

    #[test]
    fn test_list_converts_elements_and_checks_instances() {
        let field = ListField::new(IntegerField::new());
        let typed = field
            .to_typed(&Value::Array(vec![Value::Int(1), Value::from("2")]), None)
            .unwrap();
        assert_eq!(typed, TypedValue::List(vec![TypedValue::Int(1), TypedValue::Int(2)]));
        assert!(field.is_instance(&typed));
        assert!(!field.is_instance(&TypedValue::List(vec![TypedValue::from("x")])));
        assert_eq!(field.to_typed(&Value::Null, None).unwrap(), TypedValue::List(vec![]));
    }

    #[test]
    fn test_dict_uses_generic_processor() {
        let field = DictField::new();
        let stored = Value::from(serde_json::json!({"a": [1, 2]}));
        let typed = field.to_typed(&stored, None).unwrap();
        assert_eq!(field.to_primitive(&typed).unwrap(), stored);
    }

    #[test]
    fn test_bind_records_attname() {
        let field = TextField::new();
        field.bind("Person", "name");
        assert_eq!(field.attname(), Some("name"));
    }
}
