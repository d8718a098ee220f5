//! Schema instances
//!
//! A `SchemaInstance` holds two views of its data:
//!
//! - the **primitive** map, exactly what storage handed over (or what the
//!   last materialization produced)
//! - the **typed** cache, filled lazily on read and directly on write
//!
//! Reads of a declared field convert the stored value through the field's
//! descriptor once and memoize the result. Writes only touch the typed
//! cache; `to_primitive` pushes every cached entry back into the primitive
//! map. Nothing else moves data between the two views.
//!
//! Instances always live behind an `Arc` (`InstanceRef`) so nested values
//! can keep a back-reference to the instance that holds them.

use crate::field::FieldDescriptor;
use crate::processor;
use crate::schema::SchemaRef;
use crate::signals::Event;
use crate::typed::TypedValue;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use stratadoc_core::{Error, PrimitiveMap, Result, Value};
use tracing::error;

/// Shared handle to a schema instance
pub type InstanceRef = Arc<SchemaInstance>;

#[derive(Debug, Default)]
struct InstanceState {
    primitive: PrimitiveMap,
    typed: HashMap<String, TypedValue>,
}

/// An instance of a schema type
pub struct SchemaInstance {
    schema: SchemaRef,
    this: Weak<SchemaInstance>,
    parent: Option<Weak<SchemaInstance>>,
    state: RwLock<InstanceState>,
}

impl SchemaInstance {
    /// Create an instance and assign `kwargs` through [`set`](Self::set)
    ///
    /// Fires `PreInit` with the assignments before anything is set and
    /// `PostInit` once they all succeeded.
    pub fn new<I, K, V>(schema: &SchemaRef, kwargs: I) -> Result<InstanceRef>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<TypedValue>,
    {
        ensure_instantiable(schema)?;
        let kwargs: Vec<(String, TypedValue)> = kwargs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        schema.signals().send(&Event::PreInit {
            sender: schema,
            kwargs: &kwargs,
        })?;

        let instance = Self::alloc(schema, PrimitiveMap::new(), None);
        for (name, value) in kwargs {
            instance.set(&name, value)?;
        }

        schema.signals().send(&Event::PostInit {
            sender: schema,
            instance: &instance,
        })?;
        Ok(instance)
    }

    /// Wrap stored data without converting any of it
    ///
    /// `None` is treated as an empty map. The typed cache starts empty.
    /// `parent` becomes the instance's back-reference.
    pub fn from_primitive(
        schema: &SchemaRef,
        data: Option<PrimitiveMap>,
        parent: Option<&InstanceRef>,
    ) -> Result<InstanceRef> {
        ensure_instantiable(schema)?;
        schema.signals().send(&Event::PreInit {
            sender: schema,
            kwargs: &[],
        })?;
        let instance = Self::alloc(schema, data.unwrap_or_default(), parent);
        schema.signals().send(&Event::PostInit {
            sender: schema,
            instance: &instance,
        })?;
        Ok(instance)
    }

    fn alloc(schema: &SchemaRef, primitive: PrimitiveMap, parent: Option<&InstanceRef>) -> InstanceRef {
        Arc::new_cyclic(|this| SchemaInstance {
            schema: schema.clone(),
            this: this.clone(),
            parent: parent.map(Arc::downgrade),
            state: RwLock::new(InstanceState {
                primitive,
                typed: HashMap::new(),
            }),
        })
    }

    /// Schema type of this instance
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Instance holding this one, if it is still alive
    pub fn parent(&self) -> Option<InstanceRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Shared handle to this instance
    pub fn handle(&self) -> Option<InstanceRef> {
        self.this.upgrade()
    }

    // =========================================================================
    // Field and key access
    // =========================================================================

    /// Read a declared field or a free-form key
    ///
    /// Declared fields are converted from the stored value on first read and
    /// memoized; a missing stored value is converted as null. Free-form keys
    /// are seeded from the stored value through the generic processor.
    ///
    /// # Errors
    ///
    /// - `Error::Field` if the descriptor rejects the stored value
    /// - `Error::KeyNotFound` for a free-form key present in neither view
    pub fn get(&self, name: &str) -> Result<TypedValue> {
        if let Some(cached) = self.state.read().typed.get(name) {
            return Ok(cached.clone());
        }
        let raw = self.state.read().primitive.get(name).cloned();

        let typed = match self.schema.options().fields().get(name) {
            Some(field) => {
                let raw = raw.unwrap_or(Value::Null);
                let parent = self.this.upgrade();
                field
                    .to_typed(&raw, parent.as_ref())
                    .map_err(|e| self.field_error(name, field.as_ref(), raw.to_json_string(), e))?
            }
            None => match raw {
                Some(raw) => processor::to_typed(&raw),
                None => return Err(Error::KeyNotFound(name.to_string())),
            },
        };

        let mut state = self.state.write();
        Ok(state.typed.entry(name.to_string()).or_insert(typed).clone())
    }

    /// Assign a declared field or a free-form key
    ///
    /// A value the field does not accept as-is is reduced to its stored form
    /// and converted back through the descriptor. Free-form keys store the
    /// value unchanged.
    pub fn set(&self, name: &str, value: impl Into<TypedValue>) -> Result<()> {
        let mut value = value.into();
        if let Some(field) = self.schema.options().fields().get(name) {
            value = self.coerce(name, field.as_ref(), value)?;
        }
        self.state.write().typed.insert(name.to_string(), value);
        Ok(())
    }

    /// Clear a declared field (set it to null) or drop a free-form key
    ///
    /// Dropping a free-form key removes it from both views; a key that does
    /// not exist is ignored.
    pub fn remove(&self, name: &str) -> Result<()> {
        if self.schema.options().has_field(name) {
            return self.set(name, TypedValue::Null);
        }
        let mut state = self.state.write();
        state.typed.remove(name);
        state.primitive.remove(name);
        Ok(())
    }

    /// Declared fields always; free-form keys when either view holds them
    pub fn contains(&self, name: &str) -> bool {
        if self.schema.options().has_field(name) {
            return true;
        }
        let state = self.state.read();
        state.typed.contains_key(name) || state.primitive.contains_key(name)
    }

    /// Declared field names in order, then every other key, sorted
    pub fn keys(&self) -> Vec<String> {
        let fields = self.schema.options().fields();
        let mut keys: Vec<String> = fields.keys().cloned().collect();
        let state = self.state.read();
        let extra: BTreeSet<&String> = state
            .primitive
            .keys()
            .chain(state.typed.keys())
            .filter(|k| !fields.contains_key(k.as_str()))
            .collect();
        keys.extend(extra.into_iter().cloned());
        keys
    }

    /// Whether `name` currently has a typed value cached
    pub fn is_cached(&self, name: &str) -> bool {
        self.state.read().typed.contains_key(name)
    }

    // =========================================================================
    // Materialization
    // =========================================================================

    /// Push every cached typed value into the primitive map
    ///
    /// Declared fields go through their descriptor, free-form keys through
    /// the generic processor. Either every entry is written or, on the first
    /// failure, none is. Returns a copy of the updated primitive map.
    pub fn to_primitive(&self) -> Result<PrimitiveMap> {
        let cached: Vec<(String, TypedValue)> = self
            .state
            .read()
            .typed
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let fields = self.schema.options().fields();
        let mut converted = Vec::with_capacity(cached.len());
        for (name, value) in cached {
            let raw = match fields.get(&name) {
                Some(field) => field
                    .to_primitive(&value)
                    .map_err(|e| self.field_error(&name, field.as_ref(), value.to_string(), e))?,
                None => processor::to_primitive(&value)?,
            };
            converted.push((name, raw));
        }

        let mut state = self.state.write();
        state.primitive.extend(converted);
        Ok(state.primitive.clone())
    }

    /// Stored view as it stands, without materializing cached values
    pub fn primitive_data(&self) -> PrimitiveMap {
        self.state.read().primitive.clone()
    }

    /// Replace the stored view, e.g. after a backend assigned an id
    ///
    /// Cached typed values whose stored form differs between the old and the
    /// new map are evicted so the next read converts the new data. Call
    /// after [`to_primitive`](Self::to_primitive) so the old map reflects
    /// the cache.
    pub fn refresh_primitive(&self, data: PrimitiveMap) {
        let mut state = self.state.write();
        let InstanceState { primitive, typed } = &mut *state;
        typed.retain(|name, _| primitive.get(name) == data.get(name));
        *primitive = data;
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Make `value` acceptable to `field`
    pub(crate) fn coerce(
        &self,
        name: &str,
        field: &dyn FieldDescriptor,
        value: TypedValue,
    ) -> Result<TypedValue> {
        if field.is_instance(&value) {
            return Ok(value);
        }
        let raw = processor::to_primitive(&value)?;
        let parent = self.this.upgrade();
        field
            .to_typed(&raw, parent.as_ref())
            .map_err(|e| self.field_error(name, field, value.to_string(), e))
    }

    fn field_error(
        &self,
        name: &str,
        field: &dyn FieldDescriptor,
        value: String,
        source: Error,
    ) -> Error {
        error!(
            schema = %self.schema.qualified_name(),
            field = name,
            descriptor = field.kind(),
            value = %value,
            error = %source,
            "field conversion failed"
        );
        Error::Field {
            field: name.to_string(),
            descriptor: field.kind().to_string(),
            value,
            source: Box::new(source),
        }
    }
}

fn ensure_instantiable(schema: &SchemaRef) -> Result<()> {
    if schema.options().is_abstract() {
        return Err(Error::Declaration(format!(
            "abstract schema {} cannot be instantiated",
            schema.name()
        )));
    }
    Ok(())
}

impl fmt::Debug for SchemaInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("SchemaInstance")
            .field("schema", &self.schema.qualified_name())
            .field("primitive", &state.primitive)
            .field("cached", &state.typed.keys().collect::<BTreeSet<_>>())
            .finish()
    }
}
