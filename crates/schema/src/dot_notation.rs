//! Dotted-notation access
//!
//! Paths such as `addresses.0.city` or `addresses.*.city` are evaluated
//! against a schema instance. Named segments address fields, free-form keys
//! and dict entries; numeric segments address list elements; `*` fans out
//! over every element of a list.
//!
//! # Write semantics
//!
//! | Situation | Behavior |
//! |-----------|----------|
//! | Missing or null intermediate | Created: child instance, list or dict |
//! | `index == len` | Appends |
//! | `index > len` | `IndexOutOfBounds` |
//! | `*` | Writes every element |
//!
//! Leaves are coerced by the descriptor that governs them, so writing
//! `"31"` at `people.0.age` stores an integer.

use crate::field::FieldRef;
use crate::instance::SchemaInstance;
use crate::schema::SchemaType;
use crate::typed::TypedValue;
use std::collections::HashMap;
use stratadoc_core::{DotPath, Error, PathError, PathSegment, Result, Value};

impl SchemaInstance {
    /// Resolve `path` to a value
    ///
    /// # Errors
    ///
    /// - `PathError::NotFound` for a missing key or a null intermediate
    /// - `PathError::NotASequence` for a numeric or `*` segment applied to
    ///   anything but a list
    /// - `PathError::TypeMismatch` for a named segment applied to a list or
    ///   a scalar
    /// - `PathError::IndexOutOfBounds` for an index past the end
    ///
    /// # Example
    ///
    /// ```
    /// use stratadoc_schema::{SchemaDeclaration, SchemaInstance, SchemaRegistry, TextField};
    /// use stratadoc_core::primitive_map_from_json;
    ///
    /// let registry = SchemaRegistry::new();
    /// let schema = SchemaDeclaration::new("Note").field("title", TextField::new())
    ///     .build(&registry).unwrap();
    /// let data = primitive_map_from_json(serde_json::json!({"tags": {"a": 1}}));
    /// let note = SchemaInstance::from_primitive(&schema, data, None).unwrap();
    ///
    /// assert_eq!(note.dot_notation("tags.a").unwrap().as_int(), Some(1));
    /// ```
    pub fn dot_notation(&self, path: &str) -> Result<TypedValue> {
        let path: DotPath = path.parse()?;
        let (first, rest) = path.split_first();
        let value = self.member(first)?;
        read_at(value, rest)
    }

    /// Write `value` at `path`, creating intermediates as needed
    ///
    /// The top-level entry is replaced through [`set`](Self::set) once the
    /// nested write succeeded.
    pub fn dot_notation_set_value(&self, path: &str, value: impl Into<TypedValue>) -> Result<()> {
        let path: DotPath = path.parse()?;
        let (first, rest) = path.split_first();
        self.write_member(first, rest, value.into())
    }

    fn member(&self, segment: &PathSegment) -> Result<TypedValue> {
        match segment {
            PathSegment::Key(key) => self.get(key).map_err(|e| match e {
                Error::KeyNotFound(_) => PathError::NotFound {
                    segment: key.clone(),
                }
                .into(),
                other => other,
            }),
            positional => Err(not_a_sequence(positional, "schema")),
        }
    }

    fn write_member(
        &self,
        segment: &PathSegment,
        rest: &[PathSegment],
        value: TypedValue,
    ) -> Result<()> {
        let key = match segment {
            PathSegment::Key(key) => key,
            positional => return Err(not_a_sequence(positional, "schema")),
        };
        if rest.is_empty() {
            return self.set(key, value);
        }

        let field = self.schema().options().fields().get(key).cloned();
        let current = match self.get(key) {
            Ok(current) => current,
            Err(Error::KeyNotFound(_)) => TypedValue::Null,
            Err(e) => return Err(e),
        };
        let updated = self.write_into(key, current, field.as_ref(), rest, value)?;
        self.set(key, updated)
    }

    /// Write into `container`, governed by `field` when one is known
    ///
    /// `owner` names the member the container hangs off, for error reports.
    fn write_into(
        &self,
        owner: &str,
        container: TypedValue,
        field: Option<&FieldRef>,
        segments: &[PathSegment],
        value: TypedValue,
    ) -> Result<TypedValue> {
        let (segment, rest) = match segments.split_first() {
            Some(split) => split,
            None => return Ok(value),
        };
        let container = if container.is_null() {
            self.create_intermediate(field, segment)?
        } else {
            container
        };
        let item_field = field.and_then(|f| f.item_field());

        match (container, segment) {
            (TypedValue::Schema(instance), PathSegment::Key(_)) => {
                instance.write_member(segment, rest, value)?;
                Ok(TypedValue::Schema(instance))
            }
            (TypedValue::Dict(mut map), PathSegment::Key(key)) => {
                let current = map.remove(key).unwrap_or_default();
                let updated = self.write_into(key, current, None, rest, value)?;
                map.insert(key.clone(), updated);
                Ok(TypedValue::Dict(map))
            }
            (TypedValue::List(mut items), PathSegment::Index(index)) => {
                let len = items.len();
                if *index > len {
                    return Err(PathError::IndexOutOfBounds { index: *index, len }.into());
                }
                let current = items.get_mut(*index).map(std::mem::take).unwrap_or_default();
                let updated = self.write_leaf_or_deeper(owner, current, item_field, rest, value)?;
                if *index == len {
                    items.push(updated);
                } else {
                    items[*index] = updated;
                }
                Ok(TypedValue::List(items))
            }
            (TypedValue::List(mut items), PathSegment::Wildcard) => {
                for item in items.iter_mut() {
                    let current = std::mem::take(item);
                    *item =
                        self.write_leaf_or_deeper(owner, current, item_field, rest, value.clone())?;
                }
                Ok(TypedValue::List(items))
            }
            (other, PathSegment::Key(key)) => Err(PathError::TypeMismatch {
                segment: key.clone(),
                expected: "mapping",
                found: other.kind_name(),
            }
            .into()),
            (other, positional) => Err(not_a_sequence(positional, other.kind_name())),
        }
    }

    fn write_leaf_or_deeper(
        &self,
        owner: &str,
        current: TypedValue,
        item_field: Option<&FieldRef>,
        rest: &[PathSegment],
        value: TypedValue,
    ) -> Result<TypedValue> {
        if !rest.is_empty() {
            return self.write_into(owner, current, item_field, rest, value);
        }
        match item_field {
            Some(field) => self.coerce(owner, field.as_ref(), value),
            None => Ok(value),
        }
    }

    /// Fresh container for a missing intermediate
    fn create_intermediate(
        &self,
        field: Option<&FieldRef>,
        next: &PathSegment,
    ) -> Result<TypedValue> {
        if let Some(field) = field {
            if let Some(schema) = field.schema() {
                let parent = self.handle();
                return Ok(TypedValue::Schema(SchemaInstance::from_primitive(
                    schema,
                    None,
                    parent.as_ref(),
                )?));
            }
            if field.item_field().is_some() {
                return Ok(TypedValue::List(Vec::new()));
            }
            let parent = self.handle();
            let empty = field.to_typed(&Value::Null, parent.as_ref())?;
            if !empty.is_null() {
                return Ok(empty);
            }
        }
        Ok(match next {
            PathSegment::Key(_) => TypedValue::Dict(HashMap::new()),
            PathSegment::Index(_) | PathSegment::Wildcard => TypedValue::List(Vec::new()),
        })
    }
}

fn read_at(value: TypedValue, segments: &[PathSegment]) -> Result<TypedValue> {
    let (segment, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Ok(value),
    };
    match (value, segment) {
        (TypedValue::Null, _) => Err(PathError::NotFound {
            segment: segment.to_string(),
        }
        .into()),
        (TypedValue::Schema(instance), PathSegment::Key(_)) => {
            read_at(instance.member(segment)?, rest)
        }
        (TypedValue::Dict(mut map), PathSegment::Key(key)) => match map.remove(key) {
            Some(entry) => read_at(entry, rest),
            None => Err(PathError::NotFound {
                segment: key.clone(),
            }
            .into()),
        },
        (TypedValue::List(items), PathSegment::Index(index)) => {
            let len = items.len();
            match items.into_iter().nth(*index) {
                Some(item) => read_at(item, rest),
                None => Err(PathError::IndexOutOfBounds { index: *index, len }.into()),
            }
        }
        (TypedValue::List(items), PathSegment::Wildcard) => Ok(TypedValue::List(
            items
                .into_iter()
                .map(|item| read_at(item, rest))
                .collect::<Result<Vec<_>>>()?,
        )),
        (other, PathSegment::Key(key)) => Err(PathError::TypeMismatch {
            segment: key.clone(),
            expected: "mapping",
            found: other.kind_name(),
        }
        .into()),
        (other, positional) => Err(not_a_sequence(positional, other.kind_name())),
    }
}

fn not_a_sequence(segment: &PathSegment, found: &'static str) -> Error {
    PathError::NotASequence {
        segment: segment.to_string(),
        found,
    }
    .into()
}

impl SchemaType {
    /// Descriptor governing `path`
    ///
    /// Named segments descend into schema-valued fields, numeric and `*`
    /// segments into the element descriptor of list fields.
    pub fn dot_notation_to_field(&self, path: &str) -> Result<FieldRef> {
        let path: DotPath = path.parse()?;
        let (first, rest) = path.split_first();
        let mut field = match first {
            PathSegment::Key(key) => self.options().get_field(key)?.clone(),
            positional => return Err(not_a_sequence(positional, "schema")),
        };
        for segment in rest {
            field = match segment {
                PathSegment::Key(key) => match field.schema() {
                    Some(schema) => schema.options().get_field(key)?.clone(),
                    None => {
                        return Err(PathError::TypeMismatch {
                            segment: key.clone(),
                            expected: "schema",
                            found: field.kind(),
                        }
                        .into())
                    }
                },
                positional => match field.item_field() {
                    Some(item) => item.clone(),
                    None => return Err(not_a_sequence(positional, field.kind())),
                },
            };
        }
        Ok(field)
    }
}
