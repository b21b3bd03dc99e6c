//! Entity type declarations
//!
//! An entity type is a name plus an ordered list of field descriptors, fixed at
//! definition time. The field list is what load, save and query hydration walk.

use std::collections::HashSet;
use std::sync::Arc;

use crate::errors::{OdmError, OdmResult};
use crate::store::ID_FIELD;

use super::descriptor::FieldDescriptor;
use super::registry::ModelRegistry;
use super::types::FieldKind;

/// Schema of one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct EntityType {
    name: String,
    fields: Vec<FieldDescriptor>,
}

/// Collects field declarations for a new entity type
#[derive(Debug, Clone)]
pub struct EntityTypeBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl EntityTypeBuilder {
    /// Appends a field; declaration order is preserved
    pub fn field(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    /// Validates names and produces the type
    pub fn build(self) -> OdmResult<EntityType> {
        validate_type_name(&self.name)?;

        let mut seen = HashSet::new();
        for field in &self.fields {
            validate_field_name(&self.name, field.name())?;
            if !seen.insert(field.name()) {
                return Err(OdmError::invalid_schema(
                    &self.name,
                    format!("field '{}' declared twice", field.name()),
                ));
            }
        }

        Ok(EntityType {
            name: self.name,
            fields: self.fields,
        })
    }

    /// Builds the type and registers it in one step
    pub fn register(self, registry: &ModelRegistry) -> OdmResult<Arc<EntityType>> {
        registry.register(self.build()?)
    }
}

fn validate_type_name(name: &str) -> OdmResult<()> {
    if name.is_empty() {
        return Err(OdmError::invalid_schema(name, "type name is empty"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(OdmError::invalid_schema(
            name,
            "type name must be ASCII letters, digits or underscores",
        ));
    }
    Ok(())
}

fn validate_field_name(model: &str, field: &str) -> OdmResult<()> {
    let reason = if field.is_empty() {
        "field name is empty"
    } else if field.starts_with('$') {
        "field name cannot start with '$'"
    } else if field.contains('.') {
        "field name cannot contain '.'"
    } else if field == ID_FIELD {
        "field name '_id' is reserved"
    } else {
        return Ok(());
    };

    Err(OdmError::invalid_schema(
        model,
        format!("{} ('{}')", reason, field),
    ))
}

impl EntityType {
    pub fn builder(name: impl Into<String>) -> EntityTypeBuilder {
        EntityTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks up a field descriptor by name
    pub fn field(&self, name: &str) -> OdmResult<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| {
                OdmError::bad_value(name, format!("no such field on {}", self.name))
            })
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    /// `(name, kind)` pairs for every declared field
    pub fn properties(&self) -> Vec<(&str, &FieldKind)> {
        self.fields.iter().map(|f| (f.name(), f.kind())).collect()
    }
}
