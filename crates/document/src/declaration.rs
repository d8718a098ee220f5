//! Document type builder
//!
//! Wraps [`SchemaDeclaration`] and adds the document steps: attach a
//! manager, register with the backend, record the type in the store.

use crate::document::{DocumentRef, DocumentType};
use crate::manager::Manager;
use crate::store::DocumentStore;
use std::sync::Arc;
use stratadoc_core::{Result, Value};
use stratadoc_schema::{FieldDescriptor, FieldRef, Meta, SchemaDeclaration, SchemaRef, DEFAULT_MODULE};
use tracing::debug;

/// Builder for a document type
///
/// # Example
///
/// ```
/// use stratadoc_document::{DocumentDeclaration, DocumentStore};
/// use stratadoc_schema::TextField;
///
/// let store = DocumentStore::in_memory();
/// let person = DocumentDeclaration::new("Person")
///     .module("people::models")
///     .field("name", TextField::new())
///     .build(&store)
///     .unwrap();
///
/// let ada = person.create([("name", "Ada")]).unwrap();
/// ada.save().unwrap();
/// assert!(ada.id().is_some());
/// ```
#[derive(Debug)]
pub struct DocumentDeclaration {
    schema: SchemaDeclaration,
    manager: Option<Manager>,
}

impl DocumentDeclaration {
    /// Start a declaration of a document type called `name`
    pub fn new(name: impl Into<String>) -> Self {
        DocumentDeclaration {
            schema: SchemaDeclaration::new(name),
            manager: None,
        }
    }

    /// Declaring module path
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.schema = self.schema.module(module);
        self
    }

    /// Inherit from another document type
    pub fn base(self, base: &DocumentRef) -> Self {
        self.base_schema(base.schema())
    }

    /// Inherit the fields of a plain schema type
    pub fn base_schema(mut self, base: &SchemaRef) -> Self {
        self.schema = self.schema.base(base);
        self
    }

    /// Declare a field
    pub fn field<F: FieldDescriptor + 'static>(mut self, name: impl Into<String>, field: F) -> Self {
        self.schema = self.schema.field(name, field);
        self
    }

    /// Declare a field from an already shared descriptor
    pub fn field_ref(mut self, name: impl Into<String>, field: FieldRef) -> Self {
        self.schema = self.schema.field_ref(name, field);
        self
    }

    /// Attach a non-field attribute
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.schema = self.schema.attribute(name, value);
        self
    }

    /// Attach a configuration block
    pub fn meta(mut self, meta: Meta) -> Self {
        self.schema = self.schema.meta(meta);
        self
    }

    /// Mark the type abstract
    pub fn abstract_document(mut self) -> Self {
        self.schema = self.schema.abstract_schema();
        self
    }

    /// Use `manager` instead of a fresh default one
    pub fn manager(mut self, manager: Manager) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Build the schema type, bind the manager and register with the backend
    ///
    /// Virtual and proxy types are not registered with the backend. If the
    /// backend rejects the type, its catalog entry is removed again.
    pub fn build(self, store: &DocumentStore) -> Result<DocumentRef> {
        let schema = self.schema.build(store.registry())?;
        let manager = Arc::new(self.manager.unwrap_or_default());
        let document = Arc::new(DocumentType::new(
            schema,
            store.backend().clone(),
            manager,
        ));
        document.objects().contribute_to(&document)?;

        let options = document.schema().options();
        if !options.is_virtual() && !options.is_proxy() {
            if let Err(e) = store.backend().register_document(&document) {
                store
                    .registry()
                    .catalog()
                    .unregister(options.schema_key(), document.schema());
                return Err(e);
            }
        }
        store.record_document(&document);
        debug!(
            document = %document.schema().qualified_name(),
            collection = document.collection(),
            "constructed document type"
        );
        Ok(document)
    }
}

/// Build a document type from a name and a field list
///
/// `module` defaults to [`DEFAULT_MODULE`]; `collection`, when given, is
/// set through the configuration block.
pub fn create_document<I, S>(
    store: &DocumentStore,
    name: &str,
    fields: I,
    module: Option<&str>,
    collection: Option<&str>,
) -> Result<DocumentRef>
where
    I: IntoIterator<Item = (S, FieldRef)>,
    S: Into<String>,
{
    let mut declaration =
        DocumentDeclaration::new(name).module(module.unwrap_or(DEFAULT_MODULE));
    for (field_name, field) in fields {
        declaration = declaration.field_ref(field_name, field);
    }
    if let Some(collection) = collection {
        declaration = declaration.meta(Meta::new().collection(collection));
    }
    declaration.build(store)
}
