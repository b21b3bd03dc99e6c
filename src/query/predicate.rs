//! Atomic comparisons
//!
//! A predicate pairs a field descriptor with a value and an operator. It
//! compiles to `{"<field>": {"<op>": <packed value>}}`, packing the value
//! through the descriptor so the filter uses the same wire form as stored rows.

use std::fmt;

use serde_json::{Map, Value};

use crate::errors::{OdmError, OdmResult};
use crate::schema::{FieldDescriptor, FieldValue};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    NotIn,
    /// Regular-expression match; has no dual
    Regex,
}

impl Operator {
    /// Native filter token
    pub fn token(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::Lt => "$lt",
            Operator::Gt => "$gt",
            Operator::Le => "$lte",
            Operator::Ge => "$gte",
            Operator::In => "$in",
            Operator::NotIn => "$nin",
            Operator::Regex => "$regex",
        }
    }

    /// Logical complement, if one exists
    pub fn dual(&self) -> Option<Operator> {
        match self {
            Operator::Eq => Some(Operator::Ne),
            Operator::Ne => Some(Operator::Eq),
            Operator::Lt => Some(Operator::Ge),
            Operator::Ge => Some(Operator::Lt),
            Operator::Gt => Some(Operator::Le),
            Operator::Le => Some(Operator::Gt),
            Operator::In => Some(Operator::NotIn),
            Operator::NotIn => Some(Operator::In),
            Operator::Regex => None,
        }
    }

    /// Takes a list operand
    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Comparison between a field and a value
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: FieldDescriptor,
    value: FieldValue,
    operator: Operator,
}

impl Predicate {
    pub fn new(field: FieldDescriptor, value: FieldValue, operator: Operator) -> Self {
        Self {
            field,
            value,
            operator,
        }
    }

    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Same field and value under the dual operator.
    ///
    /// Fails with `UnsupportedOperator` for operators without a dual.
    pub fn flipped(&self) -> OdmResult<Predicate> {
        let operator = self
            .operator
            .dual()
            .ok_or(OdmError::UnsupportedOperator(self.operator.token()))?;
        Ok(Predicate::new(self.field.clone(), self.value.clone(), operator))
    }

    /// Compiles to the native filter document
    pub fn compile(&self) -> OdmResult<Value> {
        let operand = self.operand()?;

        let mut condition = Map::new();
        condition.insert(self.operator.token().to_string(), operand);

        let mut filter = Map::new();
        filter.insert(self.field.name().to_string(), Value::Object(condition));
        Ok(Value::Object(filter))
    }

    fn operand(&self) -> OdmResult<Value> {
        match self.operator {
            Operator::In | Operator::NotIn => {
                let items = match &self.value {
                    FieldValue::List(items) => items.as_slice(),
                    single => std::slice::from_ref(single),
                };
                items
                    .iter()
                    .map(|item| self.field.pack_element(item))
                    .collect::<OdmResult<Vec<_>>>()
                    .map(Value::Array)
            }
            Operator::Regex => match &self.value {
                FieldValue::String(pattern) => Ok(Value::String(pattern.clone())),
                other => Err(OdmError::bad_value(
                    self.field.name(),
                    format!("regex pattern must be a string, got {}", other.type_name()),
                )),
            },
            _ if self.value.is_null() => Ok(Value::Null),
            _ => self.field.pack_element(&self.value),
        }
    }
}
