//! Field descriptors
//!
//! A descriptor is the schema-level definition of one entity field. It owns the
//! conversion between in-process values and wire (JSON) values, and is the
//! entry point for building query predicates over the field.
//!
//! Packing rules:
//! - a value whose runtime type disagrees with the kind is rejected
//! - multiplicity fields pack element-wise and require a list
//! - `Null` packs the default if one is declared, fails if the field is
//!   required, and otherwise packs to JSON `null`

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

use crate::errors::{OdmError, OdmResult};
use crate::key::Key;
use crate::query::{Clause, LogicNode, Operator, Predicate};
use crate::store::SortSpec;

use super::types::{FieldKind, FieldValue};

/// Schema definition of one entity field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    multiple: bool,
    default: Option<FieldValue>,
    required: bool,
}

/// Builder for descriptors with multiplicity, default or required options
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    name: String,
    kind: FieldKind,
    multiple: bool,
    default: Option<FieldValue>,
    required: bool,
}

impl FieldBuilder {
    /// Field holds a list of values of its kind
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Value packed when the entity leaves the field unset
    pub fn default(mut self, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        self.default = if value.is_null() { None } else { Some(value) };
        self
    }

    /// Field must be set before the entity can be saved
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Validates the options and produces the descriptor.
    ///
    /// Fails if both a default and `required` are set, or if the default does
    /// not pack under the field's own kind.
    pub fn build(self) -> OdmResult<FieldDescriptor> {
        if self.default.is_some() && self.required {
            return Err(OdmError::bad_value(
                &self.name,
                "a field cannot have a default value and be required",
            ));
        }

        let descriptor = FieldDescriptor {
            name: self.name,
            kind: self.kind,
            multiple: self.multiple,
            default: self.default,
            required: self.required,
        };

        if let Some(default) = &descriptor.default {
            descriptor.pack_present(default)?;
        }

        Ok(descriptor)
    }
}

impl FieldDescriptor {
    /// Plain optional single-valued field
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            multiple: false,
            default: None,
            required: false,
        }
    }

    /// Starts a descriptor with options
    pub fn builder(name: impl Into<String>, kind: FieldKind) -> FieldBuilder {
        FieldBuilder {
            name: name.into(),
            kind,
            multiple: false,
            default: None,
            required: false,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn bytes(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bytes)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    pub fn key(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Key)
    }

    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Reference(target.into()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default_value(&self) -> Option<&FieldValue> {
        self.default.as_ref()
    }

    /// Packs a value into its wire form.
    pub fn pack(&self, value: &FieldValue) -> OdmResult<Value> {
        if value.is_null() {
            if self.required {
                return Err(OdmError::bad_value(&self.name, "required field is not set"));
            }
            return match &self.default {
                Some(default) => self.pack_present(default),
                None => Ok(Value::Null),
            };
        }
        self.pack_present(value)
    }

    fn pack_present(&self, value: &FieldValue) -> OdmResult<Value> {
        if !self.multiple {
            return self.pack_element(value);
        }

        match value {
            FieldValue::List(items) => items
                .iter()
                .map(|item| self.pack_element(item))
                .collect::<OdmResult<Vec<_>>>()
                .map(Value::Array),
            other => Err(self.mismatch("list", other)),
        }
    }

    /// Packs one element under the field's kind, ignoring multiplicity.
    pub(crate) fn pack_element(&self, value: &FieldValue) -> OdmResult<Value> {
        match (&self.kind, value) {
            (FieldKind::Bool, FieldValue::Bool(b)) => Ok(Value::Bool(*b)),
            (FieldKind::String, FieldValue::String(s)) => Ok(Value::String(s.clone())),
            (FieldKind::Bytes, FieldValue::Bytes(bytes)) => {
                Ok(Value::String(URL_SAFE_NO_PAD.encode(bytes)))
            }
            (FieldKind::Int, FieldValue::Int(i)) => Ok(Value::from(*i)),
            (FieldKind::Float, FieldValue::Float(f)) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| OdmError::bad_value(&self.name, "float must be finite")),
            (FieldKind::Timestamp, FieldValue::Timestamp(t)) => {
                Ok(Value::String(t.to_rfc3339_opts(SecondsFormat::Nanos, true)))
            }
            (FieldKind::Key, FieldValue::Key(key)) => Ok(Value::String(key.serialize())),
            (FieldKind::Reference(target), FieldValue::Key(key)) => {
                if key.kind() != target {
                    return Err(OdmError::bad_value(
                        &self.name,
                        format!("expected key of {}, got key of {}", target, key.kind()),
                    ));
                }
                Ok(Value::String(key.serialize()))
            }
            (FieldKind::Any, FieldValue::Bool(b)) => Ok(Value::Bool(*b)),
            (FieldKind::Any, FieldValue::Int(i)) => Ok(Value::from(*i)),
            (FieldKind::Any, FieldValue::Float(f)) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| OdmError::bad_value(&self.name, "float must be finite")),
            (FieldKind::Any, FieldValue::String(s)) => Ok(Value::String(s.clone())),
            (FieldKind::Any, FieldValue::Json(json)) => match json {
                Value::Array(_) | Value::Object(_) => Ok(json.clone()),
                scalar => Err(OdmError::bad_value(
                    &self.name,
                    format!("scalar {} must use a typed value, not json", scalar),
                )),
            },
            (kind, other) => Err(self.mismatch(kind.type_name(), other)),
        }
    }

    /// Unpacks a wire value; `null` (or a missing field) yields the default.
    pub fn unpack(&self, wire: &Value) -> OdmResult<FieldValue> {
        if wire.is_null() {
            return Ok(self.default.clone().unwrap_or(FieldValue::Null));
        }

        if !self.multiple {
            return self.unpack_element(wire);
        }

        match wire {
            Value::Array(items) => items
                .iter()
                .map(|item| self.unpack_element(item))
                .collect::<OdmResult<Vec<_>>>()
                .map(FieldValue::List),
            // Rows written before the field became multiple hold a bare scalar
            scalar => Ok(FieldValue::List(vec![self.unpack_element(scalar)?])),
        }
    }

    fn unpack_element(&self, wire: &Value) -> OdmResult<FieldValue> {
        let value = match &self.kind {
            FieldKind::Bool => wire.as_bool().map(FieldValue::Bool),
            FieldKind::String => wire.as_str().map(|s| FieldValue::String(s.to_string())),
            FieldKind::Bytes => wire
                .as_str()
                .and_then(|s| URL_SAFE_NO_PAD.decode(s).ok())
                .map(FieldValue::Bytes),
            FieldKind::Int => wire
                .as_i64()
                .or_else(|| wire.as_f64().and_then(integral_i64))
                .map(FieldValue::Int),
            FieldKind::Float => wire.as_f64().map(FieldValue::Float),
            FieldKind::Timestamp => wire
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| FieldValue::Timestamp(t.with_timezone(&Utc))),
            FieldKind::Key | FieldKind::Reference(_) => {
                wire.as_str().and_then(|s| Key::parse(s).ok()).map(FieldValue::Key)
            }
            FieldKind::Any => Some(match wire {
                Value::Bool(b) => FieldValue::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => FieldValue::Int(i),
                    None => FieldValue::Float(n.as_f64().unwrap_or_default()),
                },
                Value::String(s) => FieldValue::String(s.clone()),
                other => FieldValue::Json(other.clone()),
            }),
        };

        value.ok_or_else(|| {
            OdmError::bad_value(
                &self.name,
                format!("stored value {} is not a valid {}", wire, self.kind),
            )
        })
    }

    fn mismatch(&self, expected: &str, got: &FieldValue) -> OdmError {
        OdmError::bad_value(
            &self.name,
            format!("expected {}, got {}", expected, got.type_name()),
        )
    }

    // ---------------------------------------------------------------------
    // Query builders
    // ---------------------------------------------------------------------

    /// Equality predicate.
    ///
    /// On a multiplicity field this is containment: the row must hold every
    /// given element (AND of per-element `in`).
    pub fn equals(&self, value: impl Into<FieldValue>) -> Clause {
        let value = value.into();
        if self.multiple {
            return self.containment(value).into();
        }
        Predicate::new(self.clone(), value, Operator::Eq).into()
    }

    /// Inequality predicate.
    ///
    /// On a multiplicity field this is the complement of `equals`: the row is
    /// missing at least one of the given elements. Fails for an empty list,
    /// whose containment matches every row.
    pub fn not_equals(&self, value: impl Into<FieldValue>) -> OdmResult<Clause> {
        let value = value.into();
        if self.multiple {
            return LogicNode::not(self.containment(value)).map(Clause::from);
        }
        Ok(Predicate::new(self.clone(), value, Operator::Ne).into())
    }

    /// Containment test on a multiplicity field
    pub fn contains(&self, values: impl Into<FieldValue>) -> OdmResult<LogicNode> {
        if !self.multiple {
            return Err(OdmError::bad_value(
                &self.name,
                "containment requires a multiple field",
            ));
        }
        Ok(self.containment(values.into()))
    }

    fn containment(&self, value: FieldValue) -> LogicNode {
        let items = match value {
            FieldValue::List(items) => items,
            single => vec![single],
        };
        LogicNode::and(items.into_iter().map(|item| {
            Predicate::new(self.clone(), FieldValue::List(vec![item]), Operator::In)
        }))
    }

    pub fn less_than(&self, value: impl Into<FieldValue>) -> Predicate {
        Predicate::new(self.clone(), value.into(), Operator::Lt)
    }

    pub fn greater_than(&self, value: impl Into<FieldValue>) -> Predicate {
        Predicate::new(self.clone(), value.into(), Operator::Gt)
    }

    pub fn less_or_equal(&self, value: impl Into<FieldValue>) -> Predicate {
        Predicate::new(self.clone(), value.into(), Operator::Le)
    }

    pub fn greater_or_equal(&self, value: impl Into<FieldValue>) -> Predicate {
        Predicate::new(self.clone(), value.into(), Operator::Ge)
    }

    /// Field value is one of `values`
    pub fn is_in(&self, values: impl Into<FieldValue>) -> Predicate {
        Predicate::new(self.clone(), values.into(), Operator::In)
    }

    /// Field value is none of `values`
    pub fn not_in(&self, values: impl Into<FieldValue>) -> Predicate {
        Predicate::new(self.clone(), values.into(), Operator::NotIn)
    }

    /// Field text matches a regular expression
    pub fn matches(&self, pattern: impl Into<String>) -> Predicate {
        Predicate::new(self.clone(), FieldValue::String(pattern.into()), Operator::Regex)
    }

    pub fn ascending(&self) -> SortSpec {
        SortSpec::asc(&self.name)
    }

    pub fn descending(&self) -> SortSpec {
        SortSpec::desc(&self.name)
    }
}

/// Integral float that fits in i64 exactly
fn integral_i64(f: f64) -> Option<i64> {
    // 2^63 is exactly representable; i64::MAX is not
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && (-BOUND..BOUND).contains(&f)).then_some(f as i64)
}
