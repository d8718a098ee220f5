//! End-to-end scenarios through the `stratadoc` facade
//!
//! A store opened from a directory, nested documents written through dotted
//! paths, and lifecycle notifications observed by a subscriber.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use stratadoc::{
    DocumentDeclaration, DocumentStore, Error, Event, IntegerField, ListField, PathError,
    SchemaDeclaration, SchemaField, SignalKind, TextField, TypedValue, Value, CONFIG_FILE_NAME,
};
use tempfile::TempDir;

#[test]
fn test_person_scenario() {
    let dir = TempDir::new().unwrap();
    let store = DocumentStore::open(dir.path()).unwrap();
    assert!(dir.path().join(CONFIG_FILE_NAME).exists());

    let created = Arc::new(Mutex::new(Vec::new()));
    let seen = created.clone();
    store.signals().connect(SignalKind::PostSave, move |event| {
        if let Event::PostSave { created, .. } = event {
            seen.lock().push(*created);
        }
        Ok(())
    });

    let person = DocumentDeclaration::new("Person")
        .module("people::models")
        .field("name", TextField::new())
        .field("age", IntegerField::new())
        .build(&store)
        .unwrap();
    assert_eq!(person.collection(), "people.person");
    assert_eq!(person.schema().options().verbose_name_plural(), "persons");

    let ada = person.create([("name", "Ada")]).unwrap();
    ada.set("age", "36").unwrap();
    assert_eq!(ada.get("age").unwrap(), TypedValue::Int(36));
    ada.save().unwrap();
    ada.set("age", 37).unwrap();
    ada.save().unwrap();
    assert_eq!(*created.lock(), vec![true, false]);

    let id = ada.id().unwrap();
    let loaded = person.objects().get(id.clone()).unwrap();
    assert_eq!(
        serde_json::Value::from(Value::Object(loaded.primitive_data())),
        json!({"_id": serde_json::Value::from(id), "name": "Ada", "age": 37})
    );

    // Reopening the directory hands back the same store and its types
    let again = DocumentStore::open(dir.path()).unwrap();
    assert!(Arc::ptr_eq(&store, &again));
    assert!(Arc::ptr_eq(
        &again.get_document("people.person").unwrap(),
        &person
    ));
}

#[test]
fn test_nested_addresses_scenario() {
    let store = DocumentStore::in_memory();
    let address = SchemaDeclaration::new("Address")
        .module("people::models")
        .field("city", TextField::new())
        .build(store.registry())
        .unwrap();
    let resident = DocumentDeclaration::new("Resident")
        .module("people::models")
        .field("name", TextField::new())
        .field("addresses", ListField::new(SchemaField::new(&address)))
        .build(&store)
        .unwrap();

    let doc = resident.create([("name", "Ada")]).unwrap();
    doc.dot_notation_set_value("addresses.0.city", "Rome").unwrap();
    doc.dot_notation_set_value("addresses.1.city", "Turin").unwrap();
    doc.save().unwrap();

    let loaded = resident.objects().get(doc.id().unwrap()).unwrap();
    assert_eq!(
        loaded.dot_notation("addresses.0.city").unwrap(),
        TypedValue::from("Rome")
    );
    assert_eq!(
        loaded.dot_notation("addresses.*.city").unwrap(),
        TypedValue::List(vec![TypedValue::from("Rome"), TypedValue::from("Turin")])
    );
    match loaded.dot_notation("addresses.5.city").unwrap_err() {
        Error::Path(PathError::IndexOutOfBounds { index, len }) => {
            assert_eq!(index, 5);
            assert_eq!(len, 2);
        }
        other => panic!("unexpected error: {other}"),
    }

    let city = resident
        .schema()
        .dot_notation_to_field("addresses.0.city")
        .unwrap();
    assert_eq!(city.kind(), "TextField");
}
