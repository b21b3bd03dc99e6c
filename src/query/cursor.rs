//! Query cursors
//!
//! A `Query` binds a logic tree to an entity type. It is an immutable request
//! descriptor: `filter`, `order_by`, `limit` and `offset` return new queries.
//! Nothing touches the store until `fetch`, `count`, `get` or `iter` runs.
//!
//! Iterators pull rows from the store cursor on demand and stop for good on
//! exhaustion or on the first error. Iterating again needs a fresh call.

use std::iter::FusedIterator;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::database::Database;
use crate::entity::Entity;
use crate::errors::{OdmError, OdmResult};
use crate::key::Key;
use crate::schema::EntityType;
use crate::store::{DocumentCursor, FindRequest, SortSpec};

use super::logic::{Clause, LogicKind, LogicNode};

/// Filtered, ordered, windowed read over one entity type
#[derive(Debug, Clone)]
pub struct Query {
    db: Database,
    model: Arc<EntityType>,
    tree: Arc<LogicNode>,
    order: Vec<SortSpec>,
    offset: u64,
    limit: Option<u64>,
}

impl Query {
    /// Query matching every row of the type
    pub fn new(db: Database, model: Arc<EntityType>) -> Self {
        Self {
            db,
            model,
            tree: Arc::new(LogicNode::and(Vec::<Clause>::new())),
            order: Vec::new(),
            offset: 0,
            limit: None,
        }
    }

    pub fn model(&self) -> &Arc<EntityType> {
        &self.model
    }

    pub fn tree(&self) -> &Arc<LogicNode> {
        &self.tree
    }

    /// Narrows the query: the new tree is the conjunction of the current tree
    /// and `clauses`. This query is left unchanged.
    pub fn filter<I, C>(&self, clauses: I) -> Query
    where
        I: IntoIterator<Item = C>,
        C: Into<Clause>,
    {
        let mut children: Vec<Clause> = match self.tree.kind() {
            LogicKind::And(existing) => existing.clone(),
            _ => vec![Clause::Logic(Arc::clone(&self.tree))],
        };
        children.extend(clauses.into_iter().map(Into::into));

        Query {
            tree: Arc::new(LogicNode::and(children)),
            ..self.clone()
        }
    }

    /// Adds a sort key after any existing ones
    pub fn order_by(&self, spec: SortSpec) -> Query {
        let mut query = self.clone();
        query.order.push(spec);
        query
    }

    /// Caps rows yielded by `iter`, and by `fetch` when no count is given
    pub fn limit(&self, limit: u64) -> Query {
        Query {
            limit: Some(limit),
            ..self.clone()
        }
    }

    /// Rows to skip before the first yielded row
    pub fn offset(&self, offset: u64) -> Query {
        Query {
            offset,
            ..self.clone()
        }
    }

    /// The native filter this query sends to the store
    pub fn compiled_filter(&self) -> OdmResult<Value> {
        self.tree.compile().cloned()
    }

    fn request(&self, limit: Option<u64>, offset: u64) -> OdmResult<FindRequest> {
        Ok(FindRequest::new(self.compiled_filter()?)
            .with_sort(self.order.clone())
            .with_limit(limit)
            .with_offset(offset))
    }

    fn open(&self, request: &FindRequest) -> OdmResult<DocumentCursor<'_>> {
        let collection = self.db.collection_name(&self.model);
        debug!(
            database = %self.db.database_name(),
            collection = %collection,
            filter = %request.filter,
            limit = ?request.limit,
            offset = request.offset,
            "Query fetch"
        );
        Ok(self.db.store().find(&collection, request)?)
    }

    fn fetch_window(&self, count: Option<u64>, offset: u64) -> (Option<u64>, u64) {
        let limit = count
            .or(self.limit)
            .or(self.db.config().default_fetch_limit);
        (limit, self.offset.saturating_add(offset))
    }

    /// Loads up to `count` entities, skipping `offset` rows past the query's
    /// own offset. Without a count the query limit, then the configured
    /// default fetch limit, applies.
    pub fn fetch(&self, count: Option<u64>, offset: u64) -> OdmResult<Vec<Entity>> {
        let (limit, offset) = self.fetch_window(count, offset);
        let request = self.request(limit, offset)?;
        self.entities(&request)?.collect()
    }

    /// Every matching entity past the query offset, ignoring all limits
    pub fn fetch_all(&self) -> OdmResult<Vec<Entity>> {
        let request = self.request(None, self.offset)?;
        self.entities(&request)?.collect()
    }

    /// As `fetch`, returning keys without loading field values
    pub fn fetch_keys(&self, count: Option<u64>, offset: u64) -> OdmResult<Vec<Key>> {
        let (limit, offset) = self.fetch_window(count, offset);
        let request = self.request(limit, offset)?.ids_only();
        self.keys(&request)?.collect()
    }

    /// Number of matching rows, ignoring offset and limit
    pub fn count(&self) -> OdmResult<u64> {
        let collection = self.db.collection_name(&self.model);
        Ok(self.db.store().count(&collection, &self.compiled_filter()?)?)
    }

    /// First matching entity, if any
    pub fn get(&self) -> OdmResult<Option<Entity>> {
        let request = self.request(Some(1), self.offset)?;
        self.entities(&request)?.next().transpose()
    }

    /// First matching key, if any
    pub fn get_key(&self) -> OdmResult<Option<Key>> {
        let request = self.request(Some(1), self.offset)?.ids_only();
        self.keys(&request)?.next().transpose()
    }

    /// Lazily yields matching entities within the query window
    pub fn iter(&self) -> OdmResult<EntityIter<'_>> {
        self.entities(&self.request(self.limit, self.offset)?)
    }

    /// Lazily yields matching keys within the query window
    pub fn iter_keys(&self) -> OdmResult<KeyIter<'_>> {
        self.keys(&self.request(self.limit, self.offset)?.ids_only())
    }

    fn entities(&self, request: &FindRequest) -> OdmResult<EntityIter<'_>> {
        Ok(EntityIter {
            model: Arc::clone(&self.model),
            rows: Some(self.open(request)?),
        })
    }

    fn keys(&self, request: &FindRequest) -> OdmResult<KeyIter<'_>> {
        Ok(KeyIter {
            kind: self.model.name().to_string(),
            rows: Some(self.open(request)?),
        })
    }
}

/// Lazy stream of entities backed by a store cursor
pub struct EntityIter<'a> {
    model: Arc<EntityType>,
    /// `None` once exhausted
    rows: Option<DocumentCursor<'a>>,
}

impl EntityIter<'_> {
    /// True once the stream has ended
    pub fn is_exhausted(&self) -> bool {
        self.rows.is_none()
    }
}

impl Iterator for EntityIter<'_> {
    type Item = OdmResult<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.rows.as_mut()?.next();
        let item = match next {
            None => None,
            Some(row) => Some(
                row.map_err(OdmError::from)
                    .and_then(|row| Entity::from_stored(&self.model, row)),
            ),
        };
        if !matches!(item, Some(Ok(_))) {
            self.rows = None;
        }
        item
    }
}

impl FusedIterator for EntityIter<'_> {}

/// Lazy stream of keys backed by a store cursor
pub struct KeyIter<'a> {
    kind: String,
    /// `None` once exhausted
    rows: Option<DocumentCursor<'a>>,
}

impl KeyIter<'_> {
    /// True once the stream has ended
    pub fn is_exhausted(&self) -> bool {
        self.rows.is_none()
    }
}

impl Iterator for KeyIter<'_> {
    type Item = OdmResult<Key>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.rows.as_mut()?.next();
        let item = match next {
            None => None,
            Some(row) => Some(
                row.map_err(OdmError::from)
                    .and_then(|row| Key::new(self.kind.as_str(), row.id)),
            ),
        };
        if !matches!(item, Some(Ok(_))) {
            self.rows = None;
        }
        item
    }
}

impl FusedIterator for KeyIter<'_> {}
