//! Entities
//!
//! An entity is one record of a declared type: field values plus, once saved,
//! the key of its row.
//!
//! Lifecycle:
//! - New: no key, no row
//! - Persisted: key assigned by the first save, row exists
//! - Deleted: key detached, row removed; further saves are refused

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::database::Database;
use crate::errors::{OdmError, OdmResult};
use crate::key::Key;
use crate::schema::{EntityType, FieldValue};
use crate::store::{Document, FindRequest, StoredDocument, ID_FIELD};

static NULL_VALUE: FieldValue = FieldValue::Null;
static NULL_WIRE: Value = Value::Null;

/// Where an entity is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    New,
    Persisted,
    Deleted,
}

/// A record of a declared entity type
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    model: Arc<EntityType>,
    key: Option<Key>,
    values: BTreeMap<String, FieldValue>,
    state: EntityState,
}

impl Entity {
    /// New, unsaved entity with every field unset
    pub fn new(model: &Arc<EntityType>) -> Self {
        Self {
            model: Arc::clone(model),
            key: None,
            values: BTreeMap::new(),
            state: EntityState::New,
        }
    }

    /// New entity with some fields filled in
    pub fn with_values<I, N, V>(model: &Arc<EntityType>, values: I) -> OdmResult<Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: Into<FieldValue>,
    {
        let mut entity = Self::new(model);
        for (name, value) in values {
            entity.set(name.as_ref(), value)?;
        }
        Ok(entity)
    }

    /// Loads the row a key points to.
    ///
    /// Fails with `EntityNotFound` if the row does not exist, and with
    /// `UnknownModel` if the key's type is not registered.
    pub fn load(db: &Database, key: &Key) -> OdmResult<Self> {
        let model = key.resolve(db.registry())?;
        let collection = db.collection_name(&model);

        let mut filter = serde_json::Map::new();
        filter.insert(ID_FIELD.to_string(), serde_json::json!({ "$eq": key.id() }));
        let request = FindRequest::new(Value::Object(filter)).with_limit(Some(1));

        let row = db
            .store()
            .find(&collection, &request)?
            .next()
            .transpose()?
            .ok_or_else(|| OdmError::EntityNotFound {
                kind: key.kind().to_string(),
                id: key.id().to_string(),
            })?;

        Self::from_stored(&model, row)
    }

    /// Hydrates a row returned by the store.
    ///
    /// Fields missing from the row unpack as `null`; unknown stored fields
    /// are ignored.
    pub(crate) fn from_stored(model: &Arc<EntityType>, row: StoredDocument) -> OdmResult<Self> {
        let mut values = BTreeMap::new();
        for field in model.fields() {
            let wire = row.body.get(field.name()).unwrap_or(&NULL_WIRE);
            let value = field.unpack(wire)?;
            if !value.is_null() {
                values.insert(field.name().to_string(), value);
            }
        }

        Ok(Self {
            key: Some(Key::new(model.name(), row.id)?),
            model: Arc::clone(model),
            values,
            state: EntityState::Persisted,
        })
    }

    pub fn model(&self) -> &Arc<EntityType> {
        &self.model
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Current value of a field; unset fields read as their default or `Null`
    pub fn get(&self, name: &str) -> OdmResult<&FieldValue> {
        let field = self.model.field(name)?;
        Ok(self
            .values
            .get(name)
            .or(field.default_value())
            .unwrap_or(&NULL_VALUE))
    }

    /// Sets a field, type-checking the value now rather than at save.
    ///
    /// Setting `Null` unsets the field.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> OdmResult<()> {
        let field = self.model.field(name)?;
        let value = value.into();

        if value.is_null() {
            self.values.remove(name);
            return Ok(());
        }

        field.pack(&value)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Wire form of every declared field; unset fields pack through their
    /// descriptor (default, `null`, or an error when required).
    pub fn packed(&self) -> OdmResult<Document> {
        let mut document = Document::new();
        for field in self.model.fields() {
            let value = self.values.get(field.name()).unwrap_or(&NULL_VALUE);
            document.insert(field.name().to_string(), field.pack(value)?);
        }
        Ok(document)
    }

    /// Packed fields, optionally with `key` (serialized) and `id` when saved
    pub fn to_document(&self, include_meta: bool) -> OdmResult<Document> {
        let mut document = self.packed()?;
        if include_meta {
            if let Some(key) = &self.key {
                document.insert("key".to_string(), Value::String(key.serialize()));
                document.insert("id".to_string(), Value::String(key.id().to_string()));
            }
        }
        Ok(document)
    }

    /// Writes the entity.
    ///
    /// The first save inserts a row and assigns the key. Later saves replace
    /// the whole row, so unset fields are overwritten with their packed
    /// defaults. Fails with `EntityNotFound` if the row was removed since.
    pub fn save(&mut self, db: &Database) -> OdmResult<Key> {
        if self.state == EntityState::Deleted {
            return Err(OdmError::EntityDeleted(self.model.name().to_string()));
        }

        let document = self.packed()?;
        let collection = db.collection_name(&self.model);

        match &self.key {
            Some(key) => {
                let matched = db.store().replace(&collection, key.id(), document)?;
                if matched == 0 {
                    return Err(OdmError::EntityNotFound {
                        kind: key.kind().to_string(),
                        id: key.id().to_string(),
                    });
                }
                debug!(key = %key, "Entity replaced");
                Ok(key.clone())
            }
            None => {
                let id = db.store().insert(&collection, document)?;
                let key = Key::new(self.model.name(), id)?;
                info!(key = %key, "Entity created");
                self.key = Some(key.clone());
                self.state = EntityState::Persisted;
                Ok(key)
            }
        }
    }

    /// Removes the row and detaches the key; returns rows removed.
    ///
    /// Deleting an entity that was never saved removes nothing.
    pub fn delete(&mut self, db: &Database) -> OdmResult<u64> {
        let removed = match &self.key {
            Some(key) => key.delete(db)?,
            None => 0,
        };
        self.key = None;
        self.state = EntityState::Deleted;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldKind, ModelRegistry};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn setup() -> (Database, Arc<EntityType>) {
        let registry = ModelRegistry::new();
        let person = EntityType::builder("Person")
            .field(FieldDescriptor::string("name"))
            .field(FieldDescriptor::float("age"))
            .field(
                FieldDescriptor::builder("things", FieldKind::String)
                    .multiple()
                    .default(FieldValue::List(vec![]))
                    .build()
                    .unwrap(),
            )
            .register(&registry)
            .unwrap();
        let db = Database::new(Arc::new(MemoryStore::new()), Arc::new(registry));
        (db, person)
    }

    #[test]
    fn test_new_entity() {
        let (_, person) = setup();
        let entity = Entity::new(&person);
        assert_eq!(entity.state(), EntityState::New);
        assert!(entity.key().is_none());
        assert_eq!(entity.get("name").unwrap(), &FieldValue::Null);
        assert_eq!(entity.get("things").unwrap(), &FieldValue::List(vec![]));
    }

    #[test]
    fn test_set_checks_types_and_names() {
        let (_, person) = setup();
        let mut entity = Entity::new(&person);

        assert!(entity.set("age", "old").is_err());
        assert!(entity.set("height", 1.8).is_err());
        entity.set("age", 18.2).unwrap();
        assert_eq!(entity.get("age").unwrap(), &FieldValue::Float(18.2));

        entity.set("age", FieldValue::Null).unwrap();
        assert_eq!(entity.get("age").unwrap(), &FieldValue::Null);
    }

    #[test]
    fn test_packed_includes_every_field() {
        let (_, person) = setup();
        let entity = Entity::with_values(&person, [("name", FieldValue::from("Jane"))]).unwrap();
        let packed = entity.packed().unwrap();

        assert_eq!(Value::Object(packed), json!({"name": "Jane", "age": null, "things": []}));
    }

    #[test]
    fn test_save_load_round_trip() {
        let (db, person) = setup();
        let mut jane = Entity::with_values(
            &person,
            [
                ("name", FieldValue::from("Jane Doe")),
                ("age", FieldValue::from(18.2)),
                ("things", FieldValue::from(vec!["Chair", "Tea"])),
            ],
        )
        .unwrap();

        let key = jane.save(&db).unwrap();
        assert_eq!(jane.state(), EntityState::Persisted);
        assert_eq!(key.kind(), "Person");

        let loaded = Entity::load(&db, &key).unwrap();
        assert_eq!(loaded, jane);
    }

    #[test]
    fn test_to_document_meta() {
        let (db, person) = setup();
        let mut entity = Entity::with_values(&person, [("name", "Jane")]).unwrap();
        assert!(!entity.to_document(true).unwrap().contains_key("key"));

        let key = entity.save(&db).unwrap();
        let document = entity.to_document(true).unwrap();
        assert_eq!(document["key"], json!(key.serialize()));
        assert_eq!(document["id"], json!(key.id()));
        assert!(!entity.to_document(false).unwrap().contains_key("id"));
    }

    #[test]
    fn test_load_missing_row() {
        let (db, _) = setup();
        let key = Key::new("Person", "nope").unwrap();
        let err = Entity::load(&db, &key).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_then_save_refused() {
        let (db, person) = setup();
        let mut entity = Entity::with_values(&person, [("name", "Jane")]).unwrap();
        let key = entity.save(&db).unwrap();

        assert_eq!(entity.delete(&db).unwrap(), 1);
        assert_eq!(entity.state(), EntityState::Deleted);
        assert!(entity.key().is_none());
        assert!(key.get(&db).unwrap().is_none());

        let err = entity.save(&db).unwrap_err();
        assert!(matches!(err, OdmError::EntityDeleted(_)));
    }

    #[test]
    fn test_save_after_row_removed_elsewhere() {
        let (db, person) = setup();
        let mut entity = Entity::with_values(&person, [("name", "Jane")]).unwrap();
        let key = entity.save(&db).unwrap();

        assert_eq!(key.delete(&db).unwrap(), 1);
        entity.set("age", 19.0).unwrap();

        let err = entity.save(&db).unwrap_err();
        assert!(err.is_not_found());
        assert!(key.get(&db).unwrap().is_none());
        assert_eq!(db.store().count("Person", &json!({})).unwrap(), 0);
    }

    #[test]
    fn test_unknown_stored_fields_ignored() {
        let (db, _) = setup();
        let mut body = Document::new();
        body.insert("name".into(), json!("Legacy"));
        body.insert("retired".into(), json!(true));
        let id = db.store().insert("Person", body).unwrap();

        let entity = Entity::load(&db, &Key::new("Person", id).unwrap()).unwrap();
        assert_eq!(entity.get("name").unwrap().as_str(), Some("Legacy"));
        assert_eq!(entity.get("things").unwrap(), &FieldValue::List(vec![]));
    }
}
