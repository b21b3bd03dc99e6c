//! Field kinds and in-process field values
//!
//! Supported kinds:
//! - bool: Boolean
//! - string: UTF-8 string
//! - bytes: raw bytes, stored as URL-safe base64 text
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - timestamp: UTC instant, stored as fixed-width RFC 3339 text
//! - key: reference to any entity, stored as its serialized key
//! - reference: key restricted to one entity type
//! - any: untyped, stored as plain JSON

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::key::Key;

/// Declared type of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    String,
    Bytes,
    Int,
    Float,
    Timestamp,
    /// Key of an entity of any registered type
    Key,
    /// Key of an entity of the named type
    Reference(String),
    /// No type check; JSON-compatible values pass through
    Any,
}

impl FieldKind {
    /// Returns the kind name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Key => "key",
            FieldKind::Reference(_) => "reference",
            FieldKind::Any => "any",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Reference(target) => write!(f, "reference<{}>", target),
            other => write!(f, "{}", other.type_name()),
        }
    }
}

/// A field value as held by an entity
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent value
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Key(Key),
    /// Untyped JSON (objects, arrays) for `any` fields
    Json(Value),
    /// Sequence for multiplicity fields
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Returns the runtime type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::String(_) => "string",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Key(_) => "key",
            FieldValue::Json(_) => "json",
            FieldValue::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_key(&self) -> Option<&Key> {
        match self {
            FieldValue::Key(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<Key> for FieldValue {
    fn from(value: Key) -> Self {
        FieldValue::Key(value)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(values: Vec<T>) -> Self {
        FieldValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}
