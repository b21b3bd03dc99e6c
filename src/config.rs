//! Database Configuration
//!
//! Settings for how entity types map onto store collections and for default
//! query windows. Loaded from JSON text or a JSON file; missing keys take
//! their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{OdmError, OdmResult};

/// Mapping-layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database name (default: "develop_database")
    #[serde(default = "default_database")]
    pub database: String,

    /// Prepended to entity type names to form collection names (default: "")
    #[serde(default)]
    pub collection_prefix: String,

    /// Row cap for `fetch` calls without a count (default: unbounded)
    #[serde(default)]
    pub default_fetch_limit: Option<u64>,
}

fn default_database() -> String {
    "develop_database".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            collection_prefix: String::new(),
            default_fetch_limit: None,
        }
    }
}

impl DatabaseConfig {
    /// Create a config for a named database
    pub fn with_database(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Parse a config from JSON text
    pub fn from_json_str(text: &str) -> OdmResult<Self> {
        serde_json::from_str(text).map_err(|e| OdmError::Config(format!("invalid config: {}", e)))
    }

    /// Load a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> OdmResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            OdmError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Collection holding rows of the named entity type
    pub fn collection_for(&self, type_name: &str) -> String {
        format!("{}{}", self.collection_prefix, type_name)
    }
}
