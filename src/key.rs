//! Entity keys
//!
//! A key names one row: the entity type plus the store's row identifier.
//!
//! Forms:
//! - serialized: `"<EntityTypeName>:<id>"`, split on the first `:`
//! - portable: URL-safe base64 (no padding) of the serialized form

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use tracing::debug;

use crate::database::Database;
use crate::entity::Entity;
use crate::errors::{OdmError, OdmResult};
use crate::schema::{EntityType, ModelRegistry};

const SEPARATOR: char = ':';

/// Identifier of one stored entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    kind: String,
    id: String,
}

impl Key {
    /// Builds a key from its parts.
    ///
    /// Neither part may be empty or contain `:`.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> OdmResult<Self> {
        let kind = kind.into();
        let id = id.into();

        for (part, value) in [("type name", &kind), ("identifier", &id)] {
            if value.is_empty() {
                return Err(OdmError::malformed_key(
                    format!("{}{}{}", kind, SEPARATOR, id),
                    format!("{} is empty", part),
                ));
            }
            if value.contains(SEPARATOR) {
                return Err(OdmError::malformed_key(
                    format!("{}{}{}", kind, SEPARATOR, id),
                    format!("{} contains '{}'", part, SEPARATOR),
                ));
            }
        }

        Ok(Self { kind, id })
    }

    /// Entity type name
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Store row identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn serialize(&self) -> String {
        format!("{}{}{}", self.kind, SEPARATOR, self.id)
    }

    /// Parses the serialized form without consulting a registry
    pub fn parse(serial: &str) -> OdmResult<Self> {
        let (kind, id) = serial
            .split_once(SEPARATOR)
            .ok_or_else(|| OdmError::malformed_key(serial, "missing ':' separator"))?;
        Self::new(kind, id).map_err(|_| {
            OdmError::malformed_key(serial, "expected '<EntityTypeName>:<id>'")
        })
    }

    /// Parses the serialized form and checks the type is registered
    pub fn deserialize(serial: &str, registry: &ModelRegistry) -> OdmResult<Self> {
        let key = Self::parse(serial)?;
        key.resolve(registry)?;
        Ok(key)
    }

    /// Portable text form, safe in URLs and paths
    pub fn to_portable(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.serialize())
    }

    /// Decodes the portable form without consulting a registry
    pub fn decode_portable(portable: &str) -> OdmResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(portable)
            .map_err(|e| OdmError::malformed_key(portable, format!("invalid encoding: {}", e)))?;
        let serial = String::from_utf8(bytes)
            .map_err(|_| OdmError::malformed_key(portable, "decoded key is not UTF-8"))?;
        Self::parse(&serial)
    }

    /// Decodes the portable form and checks the type is registered
    pub fn from_portable(portable: &str, registry: &ModelRegistry) -> OdmResult<Self> {
        let key = Self::decode_portable(portable)?;
        key.resolve(registry)?;
        Ok(key)
    }

    /// Entity type this key points into
    pub fn resolve(&self, registry: &ModelRegistry) -> OdmResult<Arc<EntityType>> {
        registry.resolve(&self.kind)
    }

    /// Loads the referenced entity; `None` if the row does not exist.
    ///
    /// An unregistered type is still an error.
    pub fn get(&self, db: &Database) -> OdmResult<Option<Entity>> {
        match Entity::load(db, self) {
            Ok(entity) => Ok(Some(entity)),
            Err(e) if e.is_not_found() => {
                debug!(key = %self, "Key lookup found no row");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Removes the referenced row; returns rows removed (0 or 1)
    pub fn delete(&self, db: &Database) -> OdmResult<u64> {
        let model = self.resolve(db.registry())?;
        let removed = db.store().remove(&db.collection_name(&model), &self.id)?;
        debug!(key = %self, removed, "Key deleted");
        Ok(removed)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.kind, SEPARATOR, self.id)
    }
}
