//! Store error types

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a document store client
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Filter document uses a shape or operator the store does not understand
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Inserted document carries an `_id` that already exists
    #[error("Duplicate id '{id}' in collection '{collection}'")]
    DuplicateId { collection: String, id: String },

    /// Backend or transport failure
    #[error("Store backend error: {0}")]
    Backend(String),
}
