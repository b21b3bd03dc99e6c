//! Boolean composition of predicates
//!
//! Trees are built from AND, OR and NOT nodes over predicates and other nodes.
//! NOT never reaches the store: it is compiled by pushing the negation down to
//! the leaves (De Morgan), where each predicate swaps to its dual operator.
//!
//! Compiled filters are cached per node on first use.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::{OdmError, OdmResult};

use super::predicate::Predicate;

/// A child of a logic node
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Predicate(Predicate),
    Logic(Arc<LogicNode>),
}

impl Clause {
    /// Compiles to the native filter document
    pub fn compile(&self) -> OdmResult<Value> {
        match self {
            Clause::Predicate(predicate) => predicate.compile(),
            Clause::Logic(node) => node.compile().cloned(),
        }
    }

    /// Logical complement of this clause, with negation pushed to the leaves
    pub fn negated(&self) -> OdmResult<Clause> {
        match self {
            Clause::Predicate(predicate) => predicate.flipped().map(Clause::Predicate),
            Clause::Logic(node) => node.negated(),
        }
    }
}

impl From<Predicate> for Clause {
    fn from(predicate: Predicate) -> Self {
        Clause::Predicate(predicate)
    }
}

impl From<LogicNode> for Clause {
    fn from(node: LogicNode) -> Self {
        Clause::Logic(Arc::new(node))
    }
}

impl From<Arc<LogicNode>> for Clause {
    fn from(node: Arc<LogicNode>) -> Self {
        Clause::Logic(node)
    }
}

/// Node shape
#[derive(Debug, Clone, PartialEq)]
pub enum LogicKind {
    And(Vec<Clause>),
    Or(Vec<Clause>),
    Not(Box<Clause>),
}

/// Immutable boolean tree node with a compile-once filter cache
#[derive(Debug, Clone)]
pub struct LogicNode {
    kind: LogicKind,
    compiled: OnceLock<Value>,
}

impl PartialEq for LogicNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl LogicNode {
    fn from_kind(kind: LogicKind) -> Self {
        Self {
            kind,
            compiled: OnceLock::new(),
        }
    }

    /// Conjunction; with no children it matches every row
    pub fn and<I, C>(children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Clause>,
    {
        Self::from_kind(LogicKind::And(children.into_iter().map(Into::into).collect()))
    }

    /// Disjunction; with no children it matches every row
    pub fn or<I, C>(children: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Clause>,
    {
        Self::from_kind(LogicKind::Or(children.into_iter().map(Into::into).collect()))
    }

    /// Negation.
    ///
    /// The child is checked for negatability up front: a regex predicate or an
    /// empty AND/OR anywhere in it is rejected here rather than at compile.
    pub fn not(child: impl Into<Clause>) -> OdmResult<Self> {
        let child = child.into();
        child.negated()?;
        Ok(Self::from_kind(LogicKind::Not(Box::new(child))))
    }

    pub fn kind(&self) -> &LogicKind {
        &self.kind
    }

    /// True once `compile` has cached a result
    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Compiles to the native filter document, caching the result.
    ///
    /// Repeated calls return the same cached value.
    pub fn compile(&self) -> OdmResult<&Value> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled);
        }

        let value = match &self.kind {
            LogicKind::And(children) => Self::compile_group("$and", children)?,
            LogicKind::Or(children) => Self::compile_group("$or", children)?,
            LogicKind::Not(child) => child.negated()?.compile()?,
        };

        debug!(filter = %value, "Filter compiled");
        Ok(self.compiled.get_or_init(|| value))
    }

    fn compile_group(token: &str, children: &[Clause]) -> OdmResult<Value> {
        if children.is_empty() {
            return Ok(json!({}));
        }

        let compiled = children
            .iter()
            .map(Clause::compile)
            .collect::<OdmResult<Vec<_>>>()?;

        let mut filter = Map::new();
        filter.insert(token.to_string(), Value::Array(compiled));
        Ok(Value::Object(filter))
    }

    /// Logical complement of this node.
    ///
    /// AND and OR swap with every child negated; NOT unwraps. The complement
    /// of an empty AND/OR would match nothing, which has no filter form, so it
    /// fails with `InvalidQuery`.
    pub fn negated(&self) -> OdmResult<Clause> {
        match &self.kind {
            LogicKind::And(children) => {
                Ok(LogicNode::from_kind(LogicKind::Or(Self::negate_all("AND", children)?)).into())
            }
            LogicKind::Or(children) => {
                Ok(LogicNode::from_kind(LogicKind::And(Self::negate_all("OR", children)?)).into())
            }
            LogicKind::Not(child) => Ok((**child).clone()),
        }
    }

    fn negate_all(label: &str, children: &[Clause]) -> OdmResult<Vec<Clause>> {
        if children.is_empty() {
            return Err(OdmError::InvalidQuery(format!(
                "cannot negate an empty {}",
                label
            )));
        }
        children.iter().map(Clause::negated).collect()
    }
}
