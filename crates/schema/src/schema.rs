//! Schema types and the type builder
//!
//! A `SchemaType` is the runtime description of a declared schema: its
//! field registry, its bases, and any extra attributes attached at
//! declaration time. Types are built once through [`SchemaDeclaration`] and
//! shared as [`SchemaRef`] handles for the rest of the process.
//!
//! ## Build steps
//!
//! 1. Validate the `Meta` block and, for proxies, inherit unset options
//!    from the first base.
//! 2. Resolve the namespace from `app_label` or the module path.
//! 3. Merge base fields with declared fields, sorted by declaration order,
//!    and bind every field.
//! 4. Register the type under its schema key (unless virtual) and fire
//!    `TypeConstructed`.

use crate::field::{FieldDescriptor, FieldRef};
use crate::meta::Meta;
use crate::options::SchemaOptions;
use crate::registry::SchemaRegistry;
use crate::signals::{Event, Signals};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use stratadoc_core::{Error, Result, Value};
use tracing::debug;

/// Module path used when a declaration does not name one
pub const DEFAULT_MODULE: &str = "stratadoc::models";

/// Shared handle to a schema type
pub type SchemaRef = Arc<SchemaType>;

/// A built schema type
pub struct SchemaType {
    options: SchemaOptions,
    module: String,
    bases: Vec<SchemaRef>,
    attributes: IndexMap<String, Value>,
    signals: Arc<Signals>,
}

impl SchemaType {
    /// Declared type name
    pub fn name(&self) -> &str {
        self.options.object_name()
    }

    /// Declaring module path
    pub fn module(&self) -> &str {
        &self.module
    }

    /// `module::Name`, the identity used by the catalog
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.options.object_name())
    }

    /// Field registry and options
    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Direct bases, in declaration order
    pub fn bases(&self) -> &[SchemaRef] {
        &self.bases
    }

    /// Non-field attribute stored at declaration time
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// All non-field attributes, in declaration order
    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.attributes
    }

    /// Notification hub this type fires events on
    pub fn signals(&self) -> &Arc<Signals> {
        &self.signals
    }

    /// True if `self` is `other` or derives from it
    pub fn is_subtype_of(&self, other: &SchemaType) -> bool {
        if std::ptr::eq(self, other) || self.qualified_name() == other.qualified_name() {
            return true;
        }
        self.bases.iter().any(|base| base.is_subtype_of(other))
    }
}

impl fmt::Debug for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaType")
            .field("name", &self.qualified_name())
            .field("schema_key", &self.options.schema_key())
            .field("fields", &self.options.field_names())
            .finish()
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Declaration
// =============================================================================

/// Builder for a schema type
///
/// # Example
///
/// ```
/// use stratadoc_schema::{IntegerField, SchemaDeclaration, SchemaRegistry, TextField};
///
/// let registry = SchemaRegistry::new();
/// let person = SchemaDeclaration::new("Person")
///     .module("people::models")
///     .field("name", TextField::new())
///     .field("age", IntegerField::new())
///     .build(&registry)
///     .unwrap();
///
/// assert_eq!(person.options().schema_key(), "people.person");
/// assert_eq!(person.options().field_names(), vec!["name", "age"]);
/// ```
#[derive(Debug, Clone)]
pub struct SchemaDeclaration {
    name: String,
    module: String,
    bases: Vec<SchemaRef>,
    fields: Vec<(String, FieldRef)>,
    attributes: IndexMap<String, Value>,
    meta: Option<Meta>,
    is_abstract: bool,
}

impl SchemaDeclaration {
    /// Start a declaration of a type called `name` in [`DEFAULT_MODULE`]
    pub fn new(name: impl Into<String>) -> Self {
        SchemaDeclaration {
            name: name.into(),
            module: DEFAULT_MODULE.to_string(),
            bases: Vec::new(),
            fields: Vec::new(),
            attributes: IndexMap::new(),
            meta: None,
            is_abstract: false,
        }
    }

    /// Declaring module path (`app::models` or `app.models`)
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Add a base type; fields are inherited in base order
    pub fn base(mut self, base: &SchemaRef) -> Self {
        self.bases.push(base.clone());
        self
    }

    /// Declare a field
    pub fn field<F: FieldDescriptor + 'static>(self, name: impl Into<String>, field: F) -> Self {
        self.field_ref(name, Arc::new(field))
    }

    /// Declare a field from an already shared descriptor
    pub fn field_ref(mut self, name: impl Into<String>, field: FieldRef) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Attach a non-field attribute
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Attach a configuration block
    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Mark the type abstract: it can be used as a base but not instantiated
    pub fn abstract_schema(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declared type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when the configuration block marks this a proxy
    pub fn is_proxy(&self) -> bool {
        self.meta.as_ref().map_or(false, Meta::is_proxy)
    }

    /// Build the type and register it with `registry`
    ///
    /// # Errors
    ///
    /// - `Error::InvalidMeta` for unrecognized option names
    /// - `Error::Declaration` for malformed options, an invalid proxy or an
    ///   empty module path
    /// - `Error::Registration` if the schema key belongs to another type
    /// - any error raised by a `TypeConstructed` subscriber
    pub fn build(self, registry: &SchemaRegistry) -> Result<SchemaRef> {
        if self.name.is_empty() {
            return Err(Error::Declaration("schema name must not be empty".into()));
        }

        let mut meta = self.meta;
        let ancestor = if meta.as_ref().map_or(false, Meta::is_proxy) {
            let first = self.bases.first().ok_or_else(|| {
                Error::Declaration(format!("proxy schema {} must declare a base", self.name))
            })?;
            let registered = registry.catalog().get(first.options().schema_key());
            if !registered.map_or(false, |r| r.qualified_name() == first.qualified_name()) {
                return Err(Error::Declaration(format!(
                    "proxy schema {} must derive from a registered schema, {} is not registered",
                    self.name,
                    first.qualified_name()
                )));
            }
            if !self.fields.is_empty() {
                return Err(Error::Declaration(format!(
                    "proxy schema {} cannot declare fields",
                    self.name
                )));
            }
            if let Some(meta) = meta.as_mut() {
                SchemaOptions::inherit_into(first.options(), meta);
            }
            Some(first.clone())
        } else {
            None
        };

        let namespace = match meta.as_ref().and_then(|m| m.get("app_label")) {
            Some(Value::String(label)) => label.clone(),
            _ => namespace_from_module(&self.module)?,
        };
        let installed = registry.is_installed(&namespace);
        let mut options = SchemaOptions::resolve(&self.name, &namespace, meta.as_ref(), installed)?;
        options.is_abstract = self.is_abstract;

        let mut fields: IndexMap<String, FieldRef> = IndexMap::new();
        for base in &self.bases {
            for (name, field) in base.options().fields() {
                fields.insert(name.clone(), field.clone());
            }
        }
        for (name, field) in self.fields {
            fields.insert(name, field);
        }
        fields.sort_by(|_, a, _, b| a.declaration_order().cmp(&b.declaration_order()));
        for (name, field) in &fields {
            field.bind(&self.name, name);
        }
        options.fields = fields;

        let schema = Arc::new(SchemaType {
            options,
            module: self.module,
            bases: self.bases,
            attributes: self.attributes,
            signals: registry.signals().clone(),
        });

        if !schema.options.is_virtual() {
            let key = schema.options.schema_key();
            let resolves_to_ancestor = ancestor.is_some()
                && registry.catalog().get(key).map_or(false, |existing| {
                    existing.qualified_name() != schema.qualified_name()
                        && schema.is_subtype_of(&existing)
                });
            if !resolves_to_ancestor {
                registry.catalog().register(key, &schema)?;
            }
        }

        debug!(
            schema = %schema.qualified_name(),
            key = schema.options.schema_key(),
            fields = schema.options.fields().len(),
            proxy = schema.options.is_proxy(),
            "constructed schema type"
        );
        registry
            .signals()
            .send(&Event::TypeConstructed { class: &schema })?;
        Ok(schema)
    }
}

/// Second-to-last segment of a module path, or its only segment
///
/// `app::models` and `app.models` both resolve to `app`.
pub fn namespace_from_module(module: &str) -> Result<String> {
    let segments: Vec<&str> = module
        .split("::")
        .flat_map(|part| part.split('.'))
        .filter(|segment| !segment.is_empty())
        .collect();
    match segments.as_slice() {
        [] => Err(Error::Declaration("module path must not be empty".into())),
        [only] => Ok((*only).to_string()),
        [.., namespace, _] => Ok((*namespace).to_string()),
    }
}

/// Build a schema type from a name and a field list
///
/// `module` defaults to [`DEFAULT_MODULE`].
pub fn create_schema<I, S>(
    registry: &SchemaRegistry,
    name: &str,
    fields: I,
    module: Option<&str>,
) -> Result<SchemaRef>
where
    I: IntoIterator<Item = (S, FieldRef)>,
    S: Into<String>,
{
    let mut declaration =
        SchemaDeclaration::new(name).module(module.unwrap_or(DEFAULT_MODULE));
    for (field_name, field) in fields {
        declaration = declaration.field_ref(field_name, field);
    }
    declaration.build(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{IntegerField, TextField};

    #[test]
    fn test_namespace_from_module() {
        assert_eq!(namespace_from_module("app::models").unwrap(), "app");
        assert_eq!(namespace_from_module("app.models").unwrap(), "app");
        assert_eq!(namespace_from_module("a::b.c").unwrap(), "b");
        assert_eq!(namespace_from_module("single").unwrap(), "single");
        assert!(namespace_from_module("").is_err());
    }

    #[test]
    fn test_build_registers_under_default_key() {
        let registry = SchemaRegistry::new();
        let person = SchemaDeclaration::new("Person")
            .module("app::models")
            .field("name", TextField::new())
            .build(&registry)
            .unwrap();
        assert_eq!(person.qualified_name(), "app::models::Person");
        let found = registry.get_schema("app.person").unwrap();
        assert!(Arc::ptr_eq(&found, &person));
    }

    #[test]
    fn test_app_label_overrides_module() {
        let registry = SchemaRegistry::new();
        let thing = SchemaDeclaration::new("Thing")
            .module("app::models")
            .meta(Meta::new().app_label("inventory"))
            .build(&registry)
            .unwrap();
        assert_eq!(thing.options().namespace(), "inventory");
        assert_eq!(thing.options().schema_key(), "inventory.thing");
    }

    #[test]
    fn test_virtual_types_are_not_catalogued() {
        let registry = SchemaRegistry::new();
        SchemaDeclaration::new("Scratch")
            .meta(Meta::new().virtual_type(true))
            .build(&registry)
            .unwrap();
        assert!(registry.catalog().is_empty());
    }

    #[test]
    fn test_installed_flag() {
        let registry = SchemaRegistry::with_installed_namespaces(["app"]);
        let a = SchemaDeclaration::new("A").module("app::models").build(&registry).unwrap();
        let b = SchemaDeclaration::new("B").module("other::models").build(&registry).unwrap();
        assert!(a.options().is_installed());
        assert!(!b.options().is_installed());
    }

    #[test]
    fn test_attributes_are_kept() {
        let registry = SchemaRegistry::new();
        let schema = SchemaDeclaration::new("WithAttr")
            .attribute("help", "a note")
            .build(&registry)
            .unwrap();
        assert_eq!(schema.attribute("help"), Some(&Value::from("a note")));
        assert_eq!(schema.attribute("missing"), None);
    }

    #[test]
    fn test_subtype_chain() {
        let registry = SchemaRegistry::new();
        let base = SchemaDeclaration::new("Base")
            .field("a", TextField::new())
            .build(&registry)
            .unwrap();
        let child = SchemaDeclaration::new("Child")
            .base(&base)
            .field("b", IntegerField::new())
            .build(&registry)
            .unwrap();
        assert!(child.is_subtype_of(&base));
        assert!(!base.is_subtype_of(&child));
        assert_eq!(child.options().field_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_create_schema_defaults_module() {
        let registry = SchemaRegistry::new();
        let fields: Vec<(&str, FieldRef)> = vec![("title", Arc::new(TextField::new()))];
        let schema = create_schema(&registry, "Note", fields, None).unwrap();
        assert_eq!(schema.module(), DEFAULT_MODULE);
        assert_eq!(schema.options().namespace(), "stratadoc");
        assert!(schema.options().has_field("title"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = SchemaRegistry::new();
        let err = SchemaDeclaration::new("").build(&registry).unwrap_err();
        assert!(matches!(err, Error::Declaration(_)));
    }
}
