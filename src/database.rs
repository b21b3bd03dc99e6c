//! Database handle
//!
//! Bundles the document store, the model registry and the configuration.
//! Cloning is cheap; clones share the store and registry.

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::entity::Entity;
use crate::errors::OdmResult;
use crate::key::Key;
use crate::query::{Clause, Query};
use crate::schema::{EntityType, ModelRegistry};
use crate::store::DocumentStore;

/// Store, registry and configuration for entity operations
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    registry: Arc<ModelRegistry>,
    config: DatabaseConfig,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("models", &self.registry.list_registered_types())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Handle with the default configuration
    pub fn new(store: Arc<dyn DocumentStore>, registry: Arc<ModelRegistry>) -> Self {
        Self::with_config(store, registry, DatabaseConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn DocumentStore>,
        registry: Arc<ModelRegistry>,
        config: DatabaseConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Name of the configured database
    pub fn database_name(&self) -> &str {
        &self.config.database
    }

    /// Collection holding rows of an entity type
    pub fn collection_name(&self, model: &EntityType) -> String {
        self.config.collection_for(model.name())
    }

    /// Parses a serialized key and checks its type is registered
    pub fn resolve_key(&self, serial: &str) -> OdmResult<Key> {
        Key::deserialize(serial, &self.registry)
    }

    /// Key for a row identifier of the given type
    pub fn key_from_id(&self, model: &EntityType, id: &str) -> OdmResult<Key> {
        Key::new(model.name(), id)
    }

    /// Loads an entity by row identifier; `None` if absent
    pub fn get_by_id(&self, model: &EntityType, id: &str) -> OdmResult<Option<Entity>> {
        self.key_from_id(model, id)?.get(self)
    }

    /// Loads an entity by row identifier; fails with `EntityNotFound` if absent
    pub fn load_by_id(&self, model: &EntityType, id: &str) -> OdmResult<Entity> {
        Entity::load(self, &self.key_from_id(model, id)?)
    }

    /// Query over an entity type narrowed by `clauses`
    pub fn query<I, C>(&self, model: &Arc<EntityType>, clauses: I) -> Query
    where
        I: IntoIterator<Item = C>,
        C: Into<Clause>,
    {
        Query::new(self.clone(), Arc::clone(model)).filter(clauses)
    }

    /// Every entity of a type, in store order; `default_fetch_limit` does not apply
    pub fn fetch_entities(&self, model: &Arc<EntityType>) -> OdmResult<Vec<Entity>> {
        Query::new(self.clone(), Arc::clone(model)).fetch_all()
    }

    /// Removes every row of a type; returns rows removed
    pub fn delete_all(&self, model: &EntityType) -> OdmResult<u64> {
        let collection = self.collection_name(model);
        let count = self.store.count(&collection, &json!({}))?;
        self.store.drop_collection(&collection)?;
        info!(
            database = %self.database_name(),
            collection = %collection,
            count,
            "Collection dropped"
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldValue};
    use crate::store::MemoryStore;

    fn setup(config: DatabaseConfig) -> (Database, Arc<MemoryStore>, Arc<EntityType>) {
        let registry = ModelRegistry::new();
        let trip = EntityType::builder("Trip")
            .field(FieldDescriptor::string("title"))
            .register(&registry)
            .unwrap();
        let store = Arc::new(MemoryStore::new());
        let db = Database::with_config(store.clone(), Arc::new(registry), config);
        (db, store, trip)
    }

    #[test]
    fn test_collection_prefix() {
        let config = DatabaseConfig {
            collection_prefix: "app_".into(),
            ..Default::default()
        };
        let (db, store, trip) = setup(config);

        Entity::with_values(&trip, [("title", "Lisbon")])
            .unwrap()
            .save(&db)
            .unwrap();
        assert_eq!(store.collection_names().unwrap(), vec!["app_Trip"]);
    }

    #[test]
    fn test_lookup_by_id() {
        let (db, _, trip) = setup(DatabaseConfig::default());
        let key = Entity::with_values(&trip, [("title", "Lisbon")])
            .unwrap()
            .save(&db)
            .unwrap();

        let found = db.get_by_id(&trip, key.id()).unwrap().unwrap();
        assert_eq!(found.get("title").unwrap(), &FieldValue::from("Lisbon"));
        assert!(db.get_by_id(&trip, "missing").unwrap().is_none());
        assert!(db.load_by_id(&trip, "missing").unwrap_err().is_not_found());
        assert_eq!(db.resolve_key(&key.serialize()).unwrap(), key);
    }

    #[test]
    fn test_delete_all() {
        let (db, _, trip) = setup(DatabaseConfig::default());
        for title in ["Lisbon", "Porto", "Faro"] {
            Entity::with_values(&trip, [("title", title)])
                .unwrap()
                .save(&db)
                .unwrap();
        }

        assert_eq!(db.fetch_entities(&trip).unwrap().len(), 3);
        assert_eq!(db.delete_all(&trip).unwrap(), 3);
        assert!(db.fetch_entities(&trip).unwrap().is_empty());
        assert_eq!(db.delete_all(&trip).unwrap(), 0);
    }

    #[test]
    fn test_default_fetch_limit() {
        let config = DatabaseConfig {
            default_fetch_limit: Some(2),
            ..Default::default()
        };
        let (db, _, trip) = setup(config);
        for title in ["Lisbon", "Porto", "Faro"] {
            Entity::with_values(&trip, [("title", title)])
                .unwrap()
                .save(&db)
                .unwrap();
        }

        let query = db.query(&trip, Vec::<Clause>::new());
        assert_eq!(query.fetch(None, 0).unwrap().len(), 2);
        assert_eq!(query.fetch(Some(3), 0).unwrap().len(), 3);
        assert_eq!(query.count().unwrap(), 3);
        assert_eq!(db.fetch_entities(&trip).unwrap().len(), 3);
        assert_eq!(query.offset(1).fetch_all().unwrap().len(), 2);
    }

    #[test]
    fn test_database_name_from_config() {
        let (db, _, _) = setup(DatabaseConfig::with_database("trips"));
        assert_eq!(db.database_name(), "trips");

        let (db, _, _) = setup(DatabaseConfig::default());
        assert_eq!(db.database_name(), "develop_database");
    }
}
