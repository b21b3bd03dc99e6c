//! Document store boundary
//!
//! The mapping layer shapes requests; the store executes them. A store exposes,
//! per named collection, find / insert / replace / remove / count / drop over
//! documents keyed by opaque string identifiers.
//!
//! Filter documents use the MongoDB query shape produced by the query compiler:
//! `{"$and": [..]}`, `{"$or": [..]}` and `{"<field>": {"$op": value}}`, with `_id`
//! addressing the row identifier.
//!
//! `MemoryStore` is a complete in-process implementation used for tests and as
//! the reference semantics for compiled filters.

mod errors;
mod matcher;
mod memory;
mod sorter;

pub use errors::{StoreError, StoreResult};
pub use matcher::FilterMatcher;
pub use memory::MemoryStore;
pub use sorter::DocumentSorter;

use serde_json::Value;

/// Document body as stored (without the row identifier)
pub type Document = serde_json::Map<String, Value>;

/// Pseudo-field addressing the row identifier in filters and projections
pub const ID_FIELD: &str = "_id";

/// A row returned by a store cursor
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Store-generated row identifier
    pub id: String,
    /// Document body, possibly projected
    pub body: Document,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, body: Document) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// Returns the value stored under `field`, treating `_id` as the row id
    pub fn field(&self, field: &str) -> Option<Value> {
        if field == ID_FIELD {
            Some(Value::String(self.id.clone()))
        } else {
            self.body.get(field).cloned()
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort specification for one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Field to sort by
    pub field: String,
    /// Sort direction
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Parameters of a find call
#[derive(Debug, Clone, PartialEq)]
pub struct FindRequest {
    /// Filter document (`{}` matches everything)
    pub filter: Value,
    /// Fields to return; `Some(vec![])` returns only row ids
    pub projection: Option<Vec<String>>,
    /// Ordering applied before offset and limit
    pub sort: Vec<SortSpec>,
    /// Maximum rows to return (`None` = unbounded)
    pub limit: Option<u64>,
    /// Rows to skip
    pub offset: u64,
}

impl FindRequest {
    pub fn new(filter: Value) -> Self {
        Self {
            filter,
            projection: None,
            sort: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Request that only row identifiers be returned
    pub fn ids_only(mut self) -> Self {
        self.projection = Some(Vec::new());
        self
    }

    pub fn with_projection(mut self, fields: Vec<String>) -> Self {
        self.projection = Some(fields);
        self
    }

    pub fn with_sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Forward-only stream of rows produced by `find`
pub type DocumentCursor<'a> = Box<dyn Iterator<Item = StoreResult<StoredDocument>> + 'a>;

/// Operations the mapping layer requires from a document store.
///
/// Calls are synchronous and blocking. Implementations own durability,
/// indexing and transport; failures surface as `StoreError` and are not retried.
pub trait DocumentStore: Send + Sync {
    /// Runs a filtered, ordered, windowed read over a collection
    fn find<'a>(&'a self, collection: &str, request: &FindRequest)
        -> StoreResult<DocumentCursor<'a>>;

    /// Inserts a document and returns its generated identifier
    fn insert(&self, collection: &str, document: Document) -> StoreResult<String>;

    /// Replaces the whole body of a row; returns the number of rows matched
    fn replace(&self, collection: &str, id: &str, document: Document) -> StoreResult<u64>;

    /// Removes a row; returns the number of rows removed
    fn remove(&self, collection: &str, id: &str) -> StoreResult<u64>;

    /// Counts rows matching a filter
    fn count(&self, collection: &str, filter: &Value) -> StoreResult<u64>;

    /// Drops a collection; returns the number of rows it held
    fn drop_collection(&self, collection: &str) -> StoreResult<u64>;
}
