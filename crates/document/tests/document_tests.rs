//! Document lifecycle tests
//!
//! Save/delete ordering, backend and indexer failures, manager queries and
//! backend registration, through the public API only.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use stratadoc_core::{primitive_map_from_json, Error, PrimitiveMap, Result, Value};
use stratadoc_document::{
    create_document, BackendRef, Document, DocumentDeclaration, DocumentRef, DocumentStore,
    DocumentType, IndexSpec, Indexer, IndexerFactory, IndexerRef, IndexerRegistry, MemoryBackend,
    RecordIter, StorageBackend, StoreConfig,
};
use stratadoc_schema::{Event, FieldRef, IntegerField, Meta, SignalKind, TextField};

// ============================================================================
// Helpers
// ============================================================================

type Log = Arc<Mutex<Vec<String>>>;

fn person(store: &DocumentStore) -> DocumentRef {
    DocumentDeclaration::new("Person")
        .module("people::models")
        .field("name", TextField::new())
        .field("age", IntegerField::new().with_default(0))
        .build(store)
        .unwrap()
}

fn record_signals(store: &DocumentStore, log: &Log) {
    let kinds = [
        (SignalKind::PreSave, "pre_save"),
        (SignalKind::PostSave, "post_save"),
        (SignalKind::PreDelete, "pre_delete"),
        (SignalKind::PostDelete, "post_delete"),
    ];
    for (kind, label) in kinds {
        let log = log.clone();
        store.signals().connect(kind, move |event| {
            let entry = match event {
                Event::PostSave { created, .. } => format!("{}(created={})", label, created),
                _ => label.to_string(),
            };
            log.lock().push(entry);
            Ok(())
        });
    }
}

/// Indexer that appends to a shared log and optionally fails
#[derive(Debug)]
struct RecordingIndexer {
    name: String,
    log: Log,
    fail: bool,
}

impl Indexer for RecordingIndexer {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_document_save(&self, document: &Document) -> Result<()> {
        self.log.lock().push(format!("{}.save", self.name));
        if self.fail {
            return Err(Error::Backend(format!("index {} rejected {}", self.name, document)));
        }
        Ok(())
    }

    fn on_document_delete(&self, _document: &Document) -> Result<()> {
        self.log.lock().push(format!("{}.delete", self.name));
        Ok(())
    }
}

#[derive(Debug)]
struct RecordingFactory {
    log: Log,
}

impl IndexerFactory for RecordingFactory {
    fn factory_name(&self) -> &str {
        "recording"
    }

    fn create(&self, spec: &IndexSpec) -> Result<IndexerRef> {
        let fail = spec.params.get("fail") == Some(&Value::Bool(true));
        Ok(Arc::new(RecordingIndexer {
            name: spec.name.clone(),
            log: self.log.clone(),
            fail,
        }))
    }
}

fn register_recording(store: &DocumentStore, log: &Log) {
    store
        .backend()
        .indexers()
        .register_indexer("recording", Arc::new(RecordingFactory { log: log.clone() }))
        .unwrap();
}

fn params(json: serde_json::Value) -> PrimitiveMap {
    primitive_map_from_json(json).unwrap()
}

/// Backend whose writes always fail
#[derive(Debug, Default)]
struct FailingBackend {
    inner: MemoryBackend,
}

impl StorageBackend for FailingBackend {
    fn register_document(&self, document: &DocumentType) -> Result<()> {
        self.inner.register_document(document)
    }

    fn save(&self, _collection: &str, _data: &mut PrimitiveMap) -> Result<()> {
        Err(Error::Backend("disk full".into()))
    }

    fn get(&self, collection: &str, id: &Value) -> Result<PrimitiveMap> {
        self.inner.get(collection, id)
    }

    fn delete(&self, _collection: &str, _id: &Value) -> Result<()> {
        Err(Error::Backend("disk full".into()))
    }

    fn all(&self, collection: &str) -> Result<RecordIter> {
        self.inner.all(collection)
    }

    fn id_field_name(&self) -> &str {
        self.inner.id_field_name()
    }

    fn indexers(&self) -> &IndexerRegistry {
        self.inner.indexers()
    }
}

/// Memory backend that logs its writes and can refuse document types
#[derive(Debug)]
struct LoggingBackend {
    inner: MemoryBackend,
    log: Log,
    reject_types: bool,
}

impl LoggingBackend {
    fn new(log: &Log) -> Self {
        LoggingBackend {
            inner: MemoryBackend::new(),
            log: log.clone(),
            reject_types: false,
        }
    }
}

impl StorageBackend for LoggingBackend {
    fn register_document(&self, document: &DocumentType) -> Result<()> {
        if self.reject_types {
            return Err(Error::Backend(format!("cannot store {}", document.name())));
        }
        self.inner.register_document(document)
    }

    fn save(&self, collection: &str, data: &mut PrimitiveMap) -> Result<()> {
        self.log.lock().push("backend.save".into());
        self.inner.save(collection, data)
    }

    fn get(&self, collection: &str, id: &Value) -> Result<PrimitiveMap> {
        self.inner.get(collection, id)
    }

    fn delete(&self, collection: &str, id: &Value) -> Result<()> {
        self.log.lock().push("backend.delete".into());
        self.inner.delete(collection, id)
    }

    fn all(&self, collection: &str) -> Result<RecordIter> {
        self.inner.all(collection)
    }

    fn id_field_name(&self) -> &str {
        self.inner.id_field_name()
    }

    fn indexers(&self) -> &IndexerRegistry {
        self.inner.indexers()
    }
}

// ============================================================================
// Lifecycle ordering
// ============================================================================

#[test]
fn test_save_and_delete_ordering() {
    let log: Log = Arc::default();
    let store = DocumentStore::new(Arc::new(LoggingBackend::new(&log)));
    record_signals(&store, &log);
    register_recording(&store, &log);

    let person = person(&store);
    person
        .objects()
        .enable_index("recording", "first", PrimitiveMap::new())
        .unwrap();
    person
        .objects()
        .enable_index("recording", "second", PrimitiveMap::new())
        .unwrap();

    let ada = person.create([("name", "Ada")]).unwrap();
    ada.save().unwrap();
    ada.save().unwrap();
    ada.delete().unwrap();

    assert_eq!(
        *log.lock(),
        vec![
            "pre_save",
            "backend.save",
            "first.save",
            "second.save",
            "post_save(created=true)",
            "pre_save",
            "backend.save",
            "first.save",
            "second.save",
            "post_save(created=false)",
            "pre_delete",
            "backend.delete",
            "first.delete",
            "second.delete",
            "post_delete",
        ]
    );
    assert_eq!(person.objects().count().unwrap(), 0);
}

#[test]
fn test_backend_failure_stops_after_pre_save() {
    let backend: BackendRef = Arc::new(FailingBackend::default());
    let store = DocumentStore::new(backend);
    let log: Log = Arc::default();
    record_signals(&store, &log);

    let person = person(&store);
    let ada = person.create([("name", "Ada")]).unwrap();
    let err = ada.save().unwrap_err();

    assert!(matches!(err, Error::Backend(ref msg) if msg == "disk full"));
    assert_eq!(*log.lock(), vec!["pre_save"]);
    assert_eq!(ada.id(), None);
}

#[test]
fn test_indexer_failure_is_fail_fast() {
    let store = DocumentStore::in_memory();
    let log: Log = Arc::default();
    record_signals(&store, &log);
    register_recording(&store, &log);

    let person = person(&store);
    person
        .objects()
        .enable_index("recording", "strict", params(json!({"fail": true})))
        .unwrap();
    person
        .objects()
        .enable_index("recording", "after", PrimitiveMap::new())
        .unwrap();

    let ada = person.create([("name", "Ada")]).unwrap();
    let err = ada.save().unwrap_err();

    assert!(err.to_string().contains("index strict rejected Person object"));
    assert_eq!(*log.lock(), vec!["pre_save", "strict.save"]);
    // The backend write is not rolled back
    assert_eq!(person.objects().count().unwrap(), 1);
    assert!(ada.id().is_some());
}

#[test]
fn test_pre_save_subscriber_can_veto() {
    let store = DocumentStore::in_memory();
    store.signals().connect(SignalKind::PreSave, |_| {
        Err(Error::Declaration("read-only".into()))
    });
    let person = person(&store);

    let ada = person.create([("name", "Ada")]).unwrap();
    assert!(ada.save().is_err());
    assert_eq!(person.objects().count().unwrap(), 0);
}

#[test]
fn test_delete_without_id() {
    let store = DocumentStore::in_memory();
    let log: Log = Arc::default();
    record_signals(&store, &log);
    let person = person(&store);

    let ada = person.create([("name", "Ada")]).unwrap();
    let err = ada.delete().unwrap_err();

    assert!(matches!(err, Error::DocumentNotFound { ref id, .. } if id == "<none>"));
    assert_eq!(*log.lock(), vec!["pre_delete"]);
}

// ============================================================================
// Manager
// ============================================================================

#[test]
fn test_manager_queries() {
    let store = DocumentStore::in_memory();
    let person = person(&store);
    for (name, age) in [("Ada", 36), ("Grace", 85)] {
        let doc = person.create([("name", name)]).unwrap();
        doc.set("age", age).unwrap();
        doc.save().unwrap();
    }

    assert_eq!(person.objects().count().unwrap(), 2);

    let names: Vec<String> = person
        .objects()
        .all()
        .unwrap()
        .map(|doc| doc.unwrap().get("name").unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Ada", "Grace"]);

    let first = person.objects().all().unwrap().next().unwrap().unwrap();
    let id = first.id().unwrap();
    let loaded = person.objects().get(id.clone()).unwrap();
    assert_eq!(loaded.get("age").unwrap().as_int(), Some(36));
    assert_eq!(loaded.id(), Some(id));
    assert!(!loaded.is_cached("name"));

    let err = person.objects().get("missing").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_loaded_document_updates_in_place() {
    let store = DocumentStore::in_memory();
    let person = person(&store);
    let ada = person.create([("name", "Ada")]).unwrap();
    ada.save().unwrap();

    let loaded = person.objects().get(ada.id().unwrap()).unwrap();
    loaded.set("name", "Ada Lovelace").unwrap();
    loaded.save().unwrap();

    assert_eq!(person.objects().count().unwrap(), 1);
    let again = person.objects().get(ada.id().unwrap()).unwrap();
    assert_eq!(again.get("name").unwrap().as_str(), Some("Ada Lovelace"));
}

#[test]
fn test_enable_index_unknown_kind() {
    let store = DocumentStore::in_memory();
    let person = person(&store);
    let err = person
        .objects()
        .enable_index("fulltext", "body", PrimitiveMap::new())
        .unwrap_err();
    assert!(matches!(err, Error::KeyNotFound(_)));
    assert!(person.objects().indexes().is_empty());
}

#[test]
fn test_enable_index_replaces_by_name() {
    let store = DocumentStore::in_memory();
    let log: Log = Arc::default();
    register_recording(&store, &log);
    let person = person(&store);

    person
        .objects()
        .enable_index("recording", "by_name", PrimitiveMap::new())
        .unwrap();
    person
        .objects()
        .enable_index("recording", "by_name", params(json!({"fail": true})))
        .unwrap();

    assert_eq!(person.objects().indexes().len(), 1);
    assert_eq!(person.objects().get_index("by_name").unwrap().name(), "by_name");
    assert!(person.create([("name", "Ada")]).unwrap().save().is_err());
}

#[test]
fn test_manager_is_bound_once() {
    let store = DocumentStore::in_memory();
    let person = person(&store);
    assert!(Arc::ptr_eq(&person.objects().document().unwrap(), &person));
}

// ============================================================================
// Declaration
// ============================================================================

#[test]
fn test_backend_registration() {
    let backend = Arc::new(MemoryBackend::new());
    let store = DocumentStore::new(backend.clone());

    let person = person(&store);
    DocumentDeclaration::new("Draft")
        .module("people::models")
        .field("body", TextField::new())
        .meta(Meta::new().virtual_type(true))
        .build(&store)
        .unwrap();
    let employee = DocumentDeclaration::new("Employee")
        .module("people::models")
        .base(&person)
        .meta(Meta::new().proxy(true))
        .build(&store)
        .unwrap();

    assert_eq!(backend.registered_documents(), vec!["people::models::Person"]);
    assert_eq!(store.documents(), vec!["people.person"]);
    assert!(Arc::ptr_eq(&store.get_document("people.person").unwrap(), &person));

    // A proxy reads and writes its ancestor's collection
    assert_eq!(employee.collection(), person.collection());
    employee.create([("name", "Ada")]).unwrap().save().unwrap();
    assert_eq!(person.objects().count().unwrap(), 1);
    assert_eq!(backend.len(person.collection()), 1);
}

#[test]
fn test_create_document_with_collection() {
    let store = DocumentStore::in_memory();
    let body: FieldRef = Arc::new(TextField::new());
    let note = create_document(
        &store,
        "Note",
        [("body", body)],
        Some("notes::models"),
        Some("notes_v2"),
    )
    .unwrap();

    assert_eq!(note.collection(), "notes_v2");
    assert_eq!(note.schema().options().schema_key(), "notes.note");

    let doc = note.create([("body", "hello")]).unwrap();
    doc.save().unwrap();
    assert_eq!(note.objects().count().unwrap(), 1);
}

#[test]
fn test_display_and_serializable_value() {
    let store = DocumentStore::in_memory();
    let person = person(&store);
    let ada = person.create([("name", "Ada")]).unwrap();

    assert_eq!(ada.to_string(), "Person object");
    assert_eq!(ada.serializable_value("name").unwrap().as_str(), Some("Ada"));
    assert_eq!(ada.serializable_value("age").unwrap().as_int(), Some(0));
}

#[test]
fn test_custom_id_field() {
    let config = StoreConfig {
        id_field: "key".into(),
        ..StoreConfig::default()
    };
    let store = DocumentStore::with_config(config).unwrap();
    let person = person(&store);

    let ada = person.create([("name", "Ada")]).unwrap();
    ada.set("key", "ada").unwrap();
    ada.save().unwrap();

    assert_eq!(ada.id(), Some(Value::from("ada")));
    assert_eq!(ada.pk(), ada.id());
    assert!(person.objects().get("ada").is_ok());
}

#[test]
fn test_serializable_value_uses_local_field_name() {
    let store = DocumentStore::in_memory();
    let shared: FieldRef = Arc::new(TextField::new());
    DocumentDeclaration::new("Article")
        .module("press::models")
        .field_ref("title", shared.clone())
        .build(&store)
        .unwrap();
    let memo = DocumentDeclaration::new("Memo")
        .module("press::models")
        .field_ref("heading", shared)
        .build(&store)
        .unwrap();

    let doc = memo.create([("heading", "Minutes")]).unwrap();
    assert_eq!(doc.serializable_value("heading").unwrap().as_str(), Some("Minutes"));
}

#[test]
fn test_rejected_type_leaves_no_catalog_entry() {
    let log: Log = Arc::default();
    let backend = LoggingBackend {
        reject_types: true,
        ..LoggingBackend::new(&log)
    };
    let store = DocumentStore::new(Arc::new(backend));

    let err = DocumentDeclaration::new("Person")
        .module("people::models")
        .field("name", TextField::new())
        .build(&store)
        .unwrap_err();

    assert!(matches!(err, Error::Backend(ref msg) if msg == "cannot store Person"));
    assert!(store.registry().get_schema("people.person").is_none());
    assert!(store.get_document("people.person").is_err());
}
