//! Error types for the mapping layer
//!
//! Error codes:
//! - TM_BAD_VALUE (REJECT)
//! - TM_MALFORMED_KEY (REJECT)
//! - TM_UNKNOWN_MODEL (REJECT)
//! - TM_ENTITY_NOT_FOUND (REJECT)
//! - TM_UNSUPPORTED_OPERATOR (REJECT)
//! - TM_INVALID_QUERY (REJECT)
//! - TM_INVALID_SCHEMA (REJECT)
//! - TM_DUPLICATE_MODEL (REJECT)
//! - TM_ENTITY_DELETED (REJECT)
//! - TM_CONFIG (ERROR)
//! - TM_STORE (ERROR)

use std::fmt;

use thiserror::Error;

use crate::store::StoreError;

/// Result type for mapping operations
pub type OdmResult<T> = Result<T, OdmError>;

/// Severity levels for mapping errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller supplied something unusable; nothing was sent to the store
    Reject,
    /// The environment failed (store client, config source)
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadValue,
    MalformedKey,
    UnknownModel,
    EntityNotFound,
    UnsupportedOperator,
    InvalidQuery,
    InvalidSchema,
    DuplicateModel,
    EntityDeleted,
    Config,
    Store,
}

impl ErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::BadValue => "TM_BAD_VALUE",
            ErrorCode::MalformedKey => "TM_MALFORMED_KEY",
            ErrorCode::UnknownModel => "TM_UNKNOWN_MODEL",
            ErrorCode::EntityNotFound => "TM_ENTITY_NOT_FOUND",
            ErrorCode::UnsupportedOperator => "TM_UNSUPPORTED_OPERATOR",
            ErrorCode::InvalidQuery => "TM_INVALID_QUERY",
            ErrorCode::InvalidSchema => "TM_INVALID_SCHEMA",
            ErrorCode::DuplicateModel => "TM_DUPLICATE_MODEL",
            ErrorCode::EntityDeleted => "TM_ENTITY_DELETED",
            ErrorCode::Config => "TM_CONFIG",
            ErrorCode::Store => "TM_STORE",
        }
    }

    /// Returns the severity level for this code
    pub fn severity(&self) -> Severity {
        match self {
            ErrorCode::Config | ErrorCode::Store => Severity::Error,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by the mapping layer
#[derive(Debug, Error)]
pub enum OdmError {
    /// Value does not fit its field (type, multiplicity, required, default)
    #[error("Bad value for field '{field}': {reason}")]
    BadValue { field: String, reason: String },

    /// Serialized or portable key could not be parsed
    #[error("Malformed key '{input}': {reason}")]
    MalformedKey { input: String, reason: String },

    /// Entity type name is not registered
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// No row exists for the requested key
    #[error("Entity not found: {kind}:{id}")]
    EntityNotFound { kind: String, id: String },

    /// Predicate operator has no dual and cannot be negated
    #[error("Operator '{0}' cannot be negated")]
    UnsupportedOperator(&'static str),

    /// Query tree is not well formed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Entity type or field declaration is not well formed
    #[error("Invalid schema '{name}': {reason}")]
    InvalidSchema { name: String, reason: String },

    /// Entity type name registered twice
    #[error("Model already registered: {0}")]
    DuplicateModel(String),

    /// Entity was deleted and can no longer be saved
    #[error("Entity of kind '{0}' was deleted")]
    EntityDeleted(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store client failure, propagated as-is
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OdmError {
    pub(crate) fn bad_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        OdmError::BadValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_key(input: impl Into<String>, reason: impl Into<String>) -> Self {
        OdmError::MalformedKey {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_schema(name: impl Into<String>, reason: impl Into<String>) -> Self {
        OdmError::InvalidSchema {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            OdmError::BadValue { .. } => ErrorCode::BadValue,
            OdmError::MalformedKey { .. } => ErrorCode::MalformedKey,
            OdmError::UnknownModel(_) => ErrorCode::UnknownModel,
            OdmError::EntityNotFound { .. } => ErrorCode::EntityNotFound,
            OdmError::UnsupportedOperator(_) => ErrorCode::UnsupportedOperator,
            OdmError::InvalidQuery(_) => ErrorCode::InvalidQuery,
            OdmError::InvalidSchema { .. } => ErrorCode::InvalidSchema,
            OdmError::DuplicateModel(_) => ErrorCode::DuplicateModel,
            OdmError::EntityDeleted(_) => ErrorCode::EntityDeleted,
            OdmError::Config(_) => ErrorCode::Config,
            OdmError::Store(_) => ErrorCode::Store,
        }
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code().severity()
    }

    /// Returns true for the not-found condition callers may translate to `None`
    pub fn is_not_found(&self) -> bool {
        matches!(self, OdmError::EntityNotFound { .. })
    }
}
