//! Model registry
//!
//! Append-only directory of entity types, queried by name when keys are
//! deserialized and when rows are hydrated. Types are registered at definition
//! time, before concurrent use; registration never replaces an existing entry.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::errors::{OdmError, OdmResult};

use super::entity_type::EntityType;

/// Registry of declared entity types
#[derive(Debug, Default)]
pub struct ModelRegistry {
    /// Types in registration order
    models: RwLock<Vec<Arc<EntityType>>>,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type.
    ///
    /// Fails with `DuplicateModel` if the name is taken.
    pub fn register(&self, model: EntityType) -> OdmResult<Arc<EntityType>> {
        // Entries are never mutated in place, so a poisoned lock still holds
        // a consistent list.
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);

        if models.iter().any(|m| m.name() == model.name()) {
            return Err(OdmError::DuplicateModel(model.name().to_string()));
        }

        debug!(model = %model.name(), fields = model.fields().len(), "Model registered");

        let model = Arc::new(model);
        models.push(Arc::clone(&model));
        Ok(model)
    }

    /// Look up an entity type by name
    pub fn resolve(&self, name: &str) -> OdmResult<Arc<EntityType>> {
        let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
        models
            .iter()
            .find(|m| m.name() == name)
            .cloned()
            .ok_or_else(|| OdmError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// Names of all registered types, in registration order
    pub fn list_registered_types(&self) -> Vec<String> {
        let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
        models.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.models.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
