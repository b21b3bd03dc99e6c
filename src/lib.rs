//! tablemongo - schema-driven entity mapping for document stores
//!
//! Entity types are declared with typed field descriptors; entities pack into
//! store documents and load back through the same descriptors. Queries are
//! boolean trees of field predicates compiled to the store's filter format,
//! with NOT resolved by De Morgan inversion rather than native negation.

pub mod config;
pub mod database;
pub mod entity;
pub mod errors;
pub mod key;
pub mod query;
pub mod schema;
pub mod store;

pub use config::DatabaseConfig;
pub use database::Database;
pub use entity::{Entity, EntityState};
pub use errors::{ErrorCode, OdmError, OdmResult, Severity};
pub use key::Key;
pub use query::{and, not, or, Clause, LogicNode, Operator, Predicate, Query};
pub use schema::{EntityType, FieldDescriptor, FieldKind, FieldValue, ModelRegistry};
pub use store::{DocumentStore, MemoryStore, SortSpec};
