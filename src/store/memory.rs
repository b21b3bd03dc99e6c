//! In-memory document store
//!
//! Collections are insertion-ordered vectors of rows behind a reader/writer
//! lock. `find` snapshots the collection and filters lazily, so callers that
//! stop early only pull the rows they consumed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use serde_json::Value;
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::matcher::FilterMatcher;
use super::sorter::DocumentSorter;
use super::{Document, DocumentCursor, DocumentStore, FindRequest, StoredDocument, ID_FIELD};

/// Document store held entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
    /// Rows handed out by cursors since creation
    served: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows yielded by all cursors so far
    pub fn documents_served(&self) -> u64 {
        self.served.load(Ordering::Relaxed)
    }

    /// Names of collections that currently exist
    pub fn collection_names(&self) -> StoreResult<Vec<String>> {
        let collections = self.read()?;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn read(
        &self,
    ) -> StoreResult<std::sync::RwLockReadGuard<'_, HashMap<String, Vec<StoredDocument>>>> {
        self.collections
            .read()
            .map_err(|_| StoreError::Backend("Lock poisoned".into()))
    }

    fn write(
        &self,
    ) -> StoreResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<StoredDocument>>>> {
        self.collections
            .write()
            .map_err(|_| StoreError::Backend("Lock poisoned".into()))
    }
}

fn project(document: StoredDocument, projection: &Option<Vec<String>>) -> StoredDocument {
    match projection {
        None => document,
        Some(fields) => {
            let body = document
                .body
                .into_iter()
                .filter(|(name, _)| fields.iter().any(|f| f == name))
                .collect();
            StoredDocument::new(document.id, body)
        }
    }
}

impl DocumentStore for MemoryStore {
    fn find<'a>(
        &'a self,
        collection: &str,
        request: &FindRequest,
    ) -> StoreResult<DocumentCursor<'a>> {
        let matcher = FilterMatcher::parse(&request.filter)?;
        let snapshot = self.read()?.get(collection).cloned().unwrap_or_default();

        let offset = usize::try_from(request.offset).unwrap_or(usize::MAX);
        let limit = request
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let projection = request.projection.clone();
        let served = &self.served;

        let rows: Box<dyn Iterator<Item = StoredDocument> + 'a> = if request.sort.is_empty() {
            Box::new(snapshot.into_iter().filter(move |d| matcher.matches(d)))
        } else {
            let mut matched: Vec<StoredDocument> =
                snapshot.into_iter().filter(|d| matcher.matches(d)).collect();
            DocumentSorter::sort(&mut matched, &request.sort);
            Box::new(matched.into_iter())
        };

        Ok(Box::new(rows.skip(offset).take(limit).map(move |d| {
            served.fetch_add(1, Ordering::Relaxed);
            Ok(project(d, &projection))
        })))
    }

    fn insert(&self, collection: &str, mut document: Document) -> StoreResult<String> {
        let mut collections = self.write()?;
        let rows = collections.entry(collection.to_string()).or_default();

        let id = match document.remove(ID_FIELD) {
            Some(Value::String(id)) => {
                if rows.iter().any(|r| r.id == id) {
                    return Err(StoreError::DuplicateId {
                        collection: collection.to_string(),
                        id,
                    });
                }
                id
            }
            Some(other) => {
                return Err(StoreError::Backend(format!(
                    "{} must be a string, got {}",
                    ID_FIELD, other
                )));
            }
            None => Uuid::new_v4().simple().to_string(),
        };

        rows.push(StoredDocument::new(id.clone(), document));
        Ok(id)
    }

    fn replace(&self, collection: &str, id: &str, mut document: Document) -> StoreResult<u64> {
        document.remove(ID_FIELD);
        let mut collections = self.write()?;
        let row = collections
            .get_mut(collection)
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id));

        match row {
            Some(row) => {
                row.body = document;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn remove(&self, collection: &str, id: &str) -> StoreResult<u64> {
        let mut collections = self.write()?;
        let rows = match collections.get_mut(collection) {
            Some(rows) => rows,
            None => return Ok(0),
        };

        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok((before - rows.len()) as u64)
    }

    fn count(&self, collection: &str, filter: &Value) -> StoreResult<u64> {
        let matcher = FilterMatcher::parse(filter)?;
        let collections = self.read()?;
        Ok(collections
            .get(collection)
            .map_or(0, |rows| rows.iter().filter(|r| matcher.matches(r)).count() as u64))
    }

    fn drop_collection(&self, collection: &str) -> StoreResult<u64> {
        let mut collections = self.write()?;
        Ok(collections
            .remove(collection)
            .map_or(0, |rows| rows.len() as u64))
    }
}
