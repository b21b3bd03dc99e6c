//! Query algebra
//!
//! Predicates are built from field descriptors (`age.less_than(30.0)`),
//! composed with `and`, `or` and `not`, and bound to an entity type by a
//! `Query`, which compiles the tree to the store's filter format.

mod cursor;
mod logic;
mod predicate;

pub use cursor::{EntityIter, KeyIter, Query};
pub use logic::{Clause, LogicKind, LogicNode};
pub use predicate::{Operator, Predicate};

use crate::errors::OdmResult;

/// Conjunction of clauses
pub fn and<I, C>(children: I) -> LogicNode
where
    I: IntoIterator<Item = C>,
    C: Into<Clause>,
{
    LogicNode::and(children)
}

/// Disjunction of clauses
pub fn or<I, C>(children: I) -> LogicNode
where
    I: IntoIterator<Item = C>,
    C: Into<Clause>,
{
    LogicNode::or(children)
}

/// Negation of a clause
pub fn not(child: impl Into<Clause>) -> OdmResult<LogicNode> {
    LogicNode::not(child)
}
