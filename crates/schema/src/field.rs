//! Field descriptor contract
//!
//! Every declared field is a `FieldDescriptor`. The descriptor owns the
//! conversion rules between the stored `Value` and the in-memory
//! `TypedValue`, decides which typed values it accepts without coercion,
//! and carries a declaration-order counter used to keep field tables in
//! declaration order across inheritance.

use crate::instance::InstanceRef;
use crate::schema::SchemaRef;
use crate::typed::TypedValue;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use stratadoc_core::{Result, Value};

/// Shared handle to a field descriptor
pub type FieldRef = Arc<dyn FieldDescriptor>;

/// Process-wide creation counter
static CREATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Take the next declaration-order value
///
/// Called once per descriptor at construction time, so descriptors created
/// earlier sort earlier.
pub fn next_declaration_order() -> u64 {
    CREATION_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Conversion contract for a declared field
///
/// Thread safety: descriptors are shared between every schema type that
/// declares or inherits them, so they must be `Send + Sync`.
pub trait FieldDescriptor: fmt::Debug + Send + Sync {
    /// Descriptor name used in diagnostics (`"IntegerField"`)
    fn kind(&self) -> &'static str;

    /// Creation counter value; lower sorts first
    fn declaration_order(&self) -> u64;

    /// Convert a typed value to its stored form
    fn to_primitive(&self, value: &TypedValue) -> Result<Value>;

    /// Convert a stored value (or primitive-shaped input) to its typed form
    ///
    /// `parent` is the instance the value will live in; schema-valued fields
    /// use it as the back-reference of the nested instance.
    fn to_typed(&self, value: &Value, parent: Option<&InstanceRef>) -> Result<TypedValue>;

    /// Whether `value` is already acceptable without coercion
    fn is_instance(&self, value: &TypedValue) -> bool;

    /// Binding step, run once per schema type the field is attached to
    fn bind(&self, _schema: &str, _attname: &str) {}

    /// Name the field was first bound under
    fn attname(&self) -> Option<&str> {
        None
    }

    /// Schema type of a schema-valued field
    fn schema(&self) -> Option<&SchemaRef> {
        None
    }

    /// Element descriptor of a sequence-valued field
    fn item_field(&self) -> Option<&FieldRef> {
        None
    }
}

/// State shared by the built-in descriptors
#[derive(Debug)]
pub struct FieldBase {
    order: u64,
    attname: OnceCell<String>,
    default: Option<TypedValue>,
}

impl FieldBase {
    /// Allocate a new base, taking the next declaration-order value
    pub fn new() -> Self {
        FieldBase {
            order: next_declaration_order(),
            attname: OnceCell::new(),
            default: None,
        }
    }

    /// Creation counter value
    pub fn order(&self) -> u64 {
        self.order
    }

    /// Replace the default returned for a null stored value
    pub fn set_default(&mut self, default: TypedValue) {
        self.default = Some(default);
    }

    /// Value for a null stored value: the default, else `fallback`
    pub fn default_or(&self, fallback: TypedValue) -> TypedValue {
        self.default.clone().unwrap_or(fallback)
    }

    /// Record the attachment name; the first binding wins
    pub fn bind(&self, attname: &str) {
        let _ = self.attname.set(attname.to_string());
    }

    /// Recorded attachment name
    pub fn attname(&self) -> Option<&str> {
        self.attname.get().map(String::as_str)
    }
}

impl Default for FieldBase {
    fn default() -> Self {
        Self::new()
    }
}
