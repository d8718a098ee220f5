//! Documents
//!
//! A `DocumentType` is a schema type bound to a storage backend and a
//! manager. A `Document` is one instance of it: a schema instance plus the
//! save/delete lifecycle.
//!
//! ## Lifecycle ordering
//!
//! `save()` runs, stopping at the first error:
//!
//! 1. `PreSave`
//! 2. materialize the instance and `backend.save`
//! 3. copy the backend's view of the record back (assigned id)
//! 4. `on_document_save` of every index, in enable order
//! 5. `PostSave { created }`
//!
//! `delete()` mirrors it with `PreDelete`, `backend.delete`,
//! `on_document_delete` and `PostDelete`. Nothing is rolled back when a
//! later step fails.

use crate::backend::{render_id, BackendRef};
use crate::manager::Manager;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use stratadoc_core::{Error, PrimitiveMap, Result, Value};
use stratadoc_schema::{Event, InstanceRef, SchemaInstance, SchemaRef, TypedValue};
use tracing::debug;

/// Shared handle to a document type
pub type DocumentRef = Arc<DocumentType>;

/// A persistent schema type
pub struct DocumentType {
    schema: SchemaRef,
    backend: BackendRef,
    manager: Arc<Manager>,
}

impl DocumentType {
    pub(crate) fn new(schema: SchemaRef, backend: BackendRef, manager: Arc<Manager>) -> Self {
        DocumentType {
            schema,
            backend,
            manager,
        }
    }

    /// Declared type name
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Underlying schema type
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Storage backend
    pub fn backend(&self) -> &BackendRef {
        &self.backend
    }

    /// Manager of this type
    pub fn objects(&self) -> &Arc<Manager> {
        &self.manager
    }

    /// Storage bucket
    pub fn collection(&self) -> &str {
        self.schema.options().collection()
    }

    /// Create a new, unsaved document
    pub fn create<I, K, V>(self: &Arc<Self>, kwargs: I) -> Result<Document>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<TypedValue>,
    {
        let instance = SchemaInstance::new(&self.schema, kwargs)?;
        Ok(Document {
            document: self.clone(),
            instance,
        })
    }

    /// Wrap a stored record
    pub fn from_primitive(self: &Arc<Self>, data: PrimitiveMap) -> Result<Document> {
        let instance = SchemaInstance::from_primitive(&self.schema, Some(data), None)?;
        Ok(Document {
            document: self.clone(),
            instance,
        })
    }
}

impl fmt::Debug for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentType")
            .field("schema", &self.schema.qualified_name())
            .field("collection", &self.collection())
            .finish()
    }
}

// =============================================================================
// Document
// =============================================================================

/// One document
///
/// Dereferences to its [`SchemaInstance`], so field access reads the same as
/// on a plain schema instance.
#[derive(Clone)]
pub struct Document {
    document: DocumentRef,
    instance: InstanceRef,
}

impl Document {
    /// Type of this document
    pub fn document_type(&self) -> &DocumentRef {
        &self.document
    }

    /// Underlying schema instance
    pub fn instance(&self) -> &InstanceRef {
        &self.instance
    }

    /// Id, as the backend reads it from the stored view
    ///
    /// Derived on every call; a freshly created document has none until it
    /// is saved.
    pub fn id(&self) -> Option<Value> {
        self.document
            .backend()
            .get_id(&self.instance.primitive_data())
    }

    /// Alias of [`id`](Self::id)
    pub fn pk(&self) -> Option<Value> {
        self.id()
    }

    /// Store the document
    ///
    /// # Errors
    ///
    /// Subscriber, conversion, backend and indexer errors propagate
    /// unchanged; the steps after the failing one do not run.
    pub fn save(&self) -> Result<()> {
        let schema = self.document.schema();
        let collection = self.document.collection();
        let created = self.id().is_none();

        schema.signals().send(&Event::PreSave {
            sender: schema,
            instance: &self.instance,
        })?;

        let mut data = self.instance.to_primitive()?;
        self.document.backend().save(collection, &mut data)?;
        self.instance.refresh_primitive(data);

        for index in self.document.objects().indexes() {
            index.on_document_save(self)?;
        }

        schema.signals().send(&Event::PostSave {
            sender: schema,
            instance: &self.instance,
            created,
        })?;
        debug!(
            document = %schema.qualified_name(),
            collection,
            created,
            "saved document"
        );
        Ok(())
    }

    /// Remove the document from storage
    ///
    /// # Errors
    ///
    /// Returns `Error::DocumentNotFound` if the document has no id; other
    /// errors propagate as in [`save`](Self::save).
    pub fn delete(&self) -> Result<()> {
        let schema = self.document.schema();
        let collection = self.document.collection();

        schema.signals().send(&Event::PreDelete {
            sender: schema,
            instance: &self.instance,
        })?;

        let id = self.id().ok_or_else(|| Error::DocumentNotFound {
            collection: collection.to_string(),
            id: "<none>".to_string(),
        })?;
        self.document.backend().delete(collection, &id)?;

        for index in self.document.objects().indexes() {
            index.on_document_delete(self)?;
        }

        schema.signals().send(&Event::PostDelete {
            sender: schema,
            instance: &self.instance,
        })?;
        debug!(
            document = %schema.qualified_name(),
            collection,
            id = %render_id(&id),
            "deleted document"
        );
        Ok(())
    }

    /// Value of a field or free-form key, for serializers
    ///
    /// Declared fields are read under their name in this type's registry.
    pub fn serializable_value(&self, name: &str) -> Result<TypedValue> {
        self.instance.get(name)
    }
}

impl Deref for Document {
    type Target = SchemaInstance;

    fn deref(&self) -> &SchemaInstance {
        &self.instance
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} object", self.document.name())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("type", &self.document.name())
            .field("instance", &self.instance)
            .finish()
    }
}
