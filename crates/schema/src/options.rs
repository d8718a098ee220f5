//! Field registry
//!
//! `SchemaOptions` is the per-type metadata built once when a schema type is
//! declared: the ordered field table, catalog key, storage collection,
//! structural flags and cosmetic names.

use crate::field::FieldRef;
use crate::meta::{Meta, DEFAULT_NAMES, VERBOSE_NAME_PLURAL};
use heck::ToSnakeCase;
use indexmap::IndexMap;
use std::fmt;
use stratadoc_core::{Error, Result, Value};

/// Default sort order: by identity
pub const DEFAULT_ORDERING: &str = "_id";

/// Field registry of one schema type
#[derive(Debug, Clone)]
pub struct SchemaOptions {
    pub(crate) object_name: String,
    pub(crate) module_name: String,
    pub(crate) namespace: String,
    pub(crate) verbose_name: String,
    pub(crate) verbose_name_plural: String,
    pub(crate) db_table: Option<String>,
    pub(crate) ordering: Vec<String>,
    pub(crate) schema_key: String,
    pub(crate) collection: String,
    pub(crate) is_virtual: bool,
    pub(crate) is_proxy: bool,
    pub(crate) is_abstract: bool,
    pub(crate) installed: bool,
    pub(crate) fields: IndexMap<String, FieldRef>,
}

/// Result of [`SchemaOptions::get_field_by_name`]
#[derive(Debug, Clone)]
pub struct FieldLookup {
    /// The descriptor
    pub field: FieldRef,
    /// Always true: every field lives directly on its registry
    pub direct: bool,
    /// Always false: there are no many-to-many relations
    pub many_to_many: bool,
}

impl SchemaOptions {
    /// Derive defaults for a type named `object_name` in `namespace`, then
    /// apply the configuration block
    pub(crate) fn resolve(
        object_name: &str,
        namespace: &str,
        meta: Option<&Meta>,
        installed: bool,
    ) -> Result<Self> {
        let module_name = object_name.to_lowercase();
        let default_key = format!("{}.{}", namespace, module_name);
        let mut options = SchemaOptions {
            object_name: object_name.to_string(),
            module_name,
            namespace: namespace.to_string(),
            verbose_name: humanize(object_name),
            verbose_name_plural: String::new(),
            db_table: None,
            ordering: vec![DEFAULT_ORDERING.to_string()],
            schema_key: default_key,
            collection: String::new(),
            is_virtual: false,
            is_proxy: false,
            is_abstract: false,
            installed,
            fields: IndexMap::new(),
        };

        let mut explicit_collection = None;
        let mut explicit_plural = None;
        if let Some(meta) = meta {
            let mut invalid = Vec::new();
            for (name, value) in meta.iter() {
                if name.starts_with('_') {
                    continue;
                }
                match name.as_str() {
                    "verbose_name" => options.verbose_name = expect_text(name, value)?,
                    "db_table" => {
                        options.db_table = match value {
                            Value::Null => None,
                            other => Some(expect_text(name, other)?),
                        }
                    }
                    "ordering" => options.ordering = expect_ordering(value)?,
                    "schema_key" => options.schema_key = expect_text(name, value)?,
                    // Already consumed by namespace resolution
                    "app_label" => {
                        expect_text(name, value)?;
                    }
                    "collection" => explicit_collection = Some(expect_text(name, value)?),
                    "virtual" => options.is_virtual = expect_flag(name, value)?,
                    "proxy" => options.is_proxy = expect_flag(name, value)?,
                    VERBOSE_NAME_PLURAL => explicit_plural = Some(expect_text(name, value)?),
                    other => invalid.push(other.to_string()),
                }
            }
            if !invalid.is_empty() {
                return Err(Error::InvalidMeta { keys: invalid });
            }
        }

        options.collection = explicit_collection.unwrap_or_else(|| options.schema_key.clone());
        options.verbose_name_plural =
            explicit_plural.unwrap_or_else(|| format!("{}s", options.verbose_name));
        Ok(options)
    }

    /// Current value of a recognized option, in `Meta` form
    ///
    /// Used to carry unset options from an ancestor onto a proxy.
    pub(crate) fn option_value(&self, name: &str) -> Option<Value> {
        match name {
            "verbose_name" => Some(Value::from(self.verbose_name.clone())),
            "db_table" => self.db_table.clone().map(Value::from),
            "ordering" => Some(Value::Array(
                self.ordering.iter().cloned().map(Value::from).collect(),
            )),
            "schema_key" => Some(Value::from(self.schema_key.clone())),
            "app_label" => Some(Value::from(self.namespace.clone())),
            "collection" => Some(Value::from(self.collection.clone())),
            "virtual" => Some(Value::Bool(self.is_virtual)),
            "proxy" => Some(Value::Bool(self.is_proxy)),
            _ => None,
        }
    }

    /// Carry every recognized option not set in `meta` over from `ancestor`
    pub(crate) fn inherit_into(ancestor: &SchemaOptions, meta: &mut Meta) {
        for name in DEFAULT_NAMES {
            if let Some(value) = ancestor.option_value(name) {
                meta.insert_if_absent(name, value);
            }
        }
    }

    /// Ordered field table
    pub fn fields(&self) -> &IndexMap<String, FieldRef> {
        &self.fields
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Check whether a field is declared
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Look up a declared field
    pub fn get_field(&self, name: &str) -> Result<&FieldRef> {
        self.fields.get(name).ok_or_else(|| Error::FieldDoesNotExist {
            schema: self.object_name.clone(),
            field: name.to_string(),
        })
    }

    /// Look up a declared field along with its relation flags
    pub fn get_field_by_name(&self, name: &str) -> Result<FieldLookup> {
        Ok(FieldLookup {
            field: self.get_field(name)?.clone(),
            direct: true,
            many_to_many: false,
        })
    }

    /// Related objects ordered with this type; there are none
    pub fn get_ordered_objects(&self) -> Vec<String> {
        Vec::new()
    }

    /// Declared type name
    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    /// Lower-cased type name
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Owning namespace (app label)
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Human-readable singular name
    pub fn verbose_name(&self) -> &str {
        &self.verbose_name
    }

    /// Untranslated singular name
    pub fn verbose_name_raw(&self) -> &str {
        &self.verbose_name
    }

    /// Human-readable plural name
    pub fn verbose_name_plural(&self) -> &str {
        &self.verbose_name_plural
    }

    /// Storage table name, if configured
    pub fn db_table(&self) -> Option<&str> {
        self.db_table.as_deref()
    }

    /// Default sort order
    pub fn ordering(&self) -> &[String] {
        &self.ordering
    }

    /// Catalog key
    pub fn schema_key(&self) -> &str {
        &self.schema_key
    }

    /// Storage bucket name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Not catalogued and not persisted
    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    /// Reuses an ancestor's structure
    pub fn is_proxy(&self) -> bool {
        self.is_proxy
    }

    /// Declaration-only, never instantiated
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Namespace is listed in the registry's installed namespaces
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

impl fmt::Display for SchemaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.collection)
    }
}

/// `PersonRecord` -> `person record`
pub fn humanize(object_name: &str) -> String {
    object_name.to_snake_case().replace('_', " ")
}

fn expect_text(name: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid_value(name, "a string", value))
}

fn expect_flag(name: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| invalid_value(name, "a boolean", value))
}

fn expect_ordering(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| expect_text("ordering", item))
            .collect(),
        other => Err(invalid_value("ordering", "a string or list of strings", other)),
    }
}

fn invalid_value(name: &str, expected: &str, value: &Value) -> Error {
    Error::Declaration(format!(
        "Meta option '{}' must be {}, got {}",
        name,
        expected,
        value.type_name()
    ))
}
