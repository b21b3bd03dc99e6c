//! Filter evaluation for the in-memory store
//!
//! Evaluates MongoDB-style filter documents against rows:
//! - `$and` / `$or` over sub-filters, implicit conjunction across keys
//! - `$eq $ne $lt $gt $lte $gte $in $nin $regex` per field
//! - a bare value under a field name is implicit `$eq`
//! - array fields match when any element matches (`$ne`/`$nin` are the exact
//!   complements of `$eq`/`$in`)
//! - missing fields never satisfy range or regex operators
//!
//! Filters are parsed once into a `FilterMatcher`, so malformed filters fail
//! before any row is read.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::Value;

use super::errors::{StoreError, StoreResult};
use super::StoredDocument;

#[derive(Debug, Clone)]
enum FieldOp {
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Gt(Value),
    Lte(Value),
    Gte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Regex(Regex),
}

#[derive(Debug, Clone)]
enum Expr {
    All(Vec<Expr>),
    Any(Vec<Expr>),
    Field { path: String, op: FieldOp },
}

/// Parsed, reusable filter
#[derive(Debug, Clone)]
pub struct FilterMatcher {
    root: Expr,
}

impl FilterMatcher {
    /// Parses a filter document
    pub fn parse(filter: &Value) -> StoreResult<Self> {
        Ok(Self {
            root: parse_document(filter)?,
        })
    }

    /// Checks if a row matches the filter
    pub fn matches(&self, document: &StoredDocument) -> bool {
        eval(&self.root, document)
    }
}

fn parse_document(filter: &Value) -> StoreResult<Expr> {
    let object = filter
        .as_object()
        .ok_or_else(|| StoreError::InvalidFilter(format!("expected object, got {}", filter)))?;

    let mut clauses = Vec::with_capacity(object.len());
    for (key, value) in object {
        match key.as_str() {
            "$and" => clauses.push(Expr::All(parse_list(key, value)?)),
            "$or" => clauses.push(Expr::Any(parse_list(key, value)?)),
            other if other.starts_with('$') => {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown top-level operator {}",
                    other
                )));
            }
            field => clauses.extend(parse_field(field, value)?),
        }
    }

    if clauses.len() == 1 {
        Ok(clauses.remove(0))
    } else {
        Ok(Expr::All(clauses))
    }
}

fn parse_list(operator: &str, value: &Value) -> StoreResult<Vec<Expr>> {
    let items = value
        .as_array()
        .ok_or_else(|| StoreError::InvalidFilter(format!("{} expects an array", operator)))?;
    items.iter().map(parse_document).collect()
}

fn parse_field(field: &str, value: &Value) -> StoreResult<Vec<Expr>> {
    let operators = match value.as_object() {
        Some(object) if !object.is_empty() && object.keys().all(|k| k.starts_with('$')) => object,
        _ => {
            return Ok(vec![Expr::Field {
                path: field.to_string(),
                op: FieldOp::Eq(value.clone()),
            }]);
        }
    };

    let mut exprs = Vec::with_capacity(operators.len());
    for (operator, operand) in operators {
        let op = match operator.as_str() {
            "$eq" => FieldOp::Eq(operand.clone()),
            "$ne" => FieldOp::Ne(operand.clone()),
            "$lt" => FieldOp::Lt(operand.clone()),
            "$gt" => FieldOp::Gt(operand.clone()),
            "$lte" => FieldOp::Lte(operand.clone()),
            "$gte" => FieldOp::Gte(operand.clone()),
            "$in" => FieldOp::In(operand_list(operator, operand)?),
            "$nin" => FieldOp::Nin(operand_list(operator, operand)?),
            "$regex" => {
                let pattern = operand.as_str().ok_or_else(|| {
                    StoreError::InvalidFilter("$regex expects a string pattern".into())
                })?;
                let regex = Regex::new(pattern)
                    .map_err(|e| StoreError::InvalidFilter(format!("bad $regex: {}", e)))?;
                FieldOp::Regex(regex)
            }
            other => {
                return Err(StoreError::InvalidFilter(format!(
                    "unknown operator {} on field {}",
                    other, field
                )));
            }
        };
        exprs.push(Expr::Field {
            path: field.to_string(),
            op,
        });
    }
    Ok(exprs)
}

fn operand_list(operator: &str, operand: &Value) -> StoreResult<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| StoreError::InvalidFilter(format!("{} expects an array", operator)))
}

fn eval(expr: &Expr, document: &StoredDocument) -> bool {
    match expr {
        Expr::All(children) => children.iter().all(|c| eval(c, document)),
        Expr::Any(children) => children.iter().any(|c| eval(c, document)),
        Expr::Field { path, op } => {
            let actual = document.field(path);
            eval_field(actual.as_ref(), op)
        }
    }
}

fn eval_field(actual: Option<&Value>, op: &FieldOp) -> bool {
    match op {
        FieldOp::Eq(expected) => eq_match(actual, expected),
        FieldOp::Ne(expected) => !eq_match(actual, expected),
        FieldOp::In(options) => options.iter().any(|o| eq_match(actual, o)),
        FieldOp::Nin(options) => !options.iter().any(|o| eq_match(actual, o)),
        FieldOp::Lt(bound) => range_match(actual, bound, |o| o == Ordering::Less),
        FieldOp::Gt(bound) => range_match(actual, bound, |o| o == Ordering::Greater),
        FieldOp::Lte(bound) => range_match(actual, bound, |o| o != Ordering::Greater),
        FieldOp::Gte(bound) => range_match(actual, bound, |o| o != Ordering::Less),
        FieldOp::Regex(regex) => candidates(actual)
            .iter()
            .any(|v| v.as_str().map_or(false, |s| regex.is_match(s))),
    }
}

/// Equality with array-element semantics; `null` matches a missing field
fn eq_match(actual: Option<&Value>, expected: &Value) -> bool {
    let actual = match actual {
        Some(v) => v,
        None => return expected.is_null(),
    };

    if values_equal(actual, expected) {
        return true;
    }

    match actual {
        Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
        _ => false,
    }
}

fn range_match(actual: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    candidates(actual)
        .iter()
        .any(|v| compare_values(v, bound).map_or(false, &accept))
}

/// Values a field offers to element-wise operators
fn candidates(actual: Option<&Value>) -> Vec<&Value> {
    match actual {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(v) => vec![v],
    }
}

/// Exact equality, with int/float numbers compared by value
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        _ => a == b,
    }
}

/// Orders two values of the same type bracket; `None` if not comparable
pub(super) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
                return Some(xi.cmp(&yi));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
