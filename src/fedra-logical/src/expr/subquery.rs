//! Subquery expressions.

use serde::{Deserialize, Serialize};

use super::LogicalExpr;
use crate::ops::LogicalOp;

/// Form of a nested query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubqueryKind {
    /// `needle IN (subquery)`; the subquery yields one column.
    In(Box<LogicalExpr>),
    /// `EXISTS (subquery)`.
    Exists,
    /// Single-row, single-column subquery used as a value.
    Scalar,
}

/// A nested query appearing inside an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubqueryExpr {
    pub kind: SubqueryKind,
    pub plan: Box<LogicalOp>,
    /// Whether the subquery references columns of the enclosing query.
    pub correlated: bool,
}

impl SubqueryExpr {
    /// `needle IN (plan)`.
    pub fn in_list(needle: LogicalExpr, plan: LogicalOp) -> Self {
        Self {
            kind: SubqueryKind::In(Box::new(needle)),
            plan: Box::new(plan),
            correlated: false,
        }
    }

    pub fn exists(plan: LogicalOp) -> Self {
        Self {
            kind: SubqueryKind::Exists,
            plan: Box::new(plan),
            correlated: false,
        }
    }

    pub fn scalar(plan: LogicalOp) -> Self {
        Self {
            kind: SubqueryKind::Scalar,
            plan: Box::new(plan),
            correlated: false,
        }
    }

    /// Mark as correlated with the enclosing query.
    #[must_use]
    pub fn correlated(mut self) -> Self {
        self.correlated = true;
        self
    }

    /// The probed expression of an `IN` subquery.
    pub fn needle(&self) -> Option<&LogicalExpr> {
        match &self.kind {
            SubqueryKind::In(needle) => Some(needle),
            _ => None,
        }
    }

    pub(crate) fn remap_needle(&self, f: &dyn Fn(usize) -> usize) -> Self {
        let kind = match &self.kind {
            SubqueryKind::In(needle) => SubqueryKind::In(Box::new(needle.remap(f))),
            other => other.clone(),
        };
        Self {
            kind,
            plan: self.plan.clone(),
            correlated: self.correlated,
        }
    }
}

impl From<SubqueryExpr> for LogicalExpr {
    fn from(sub: SubqueryExpr) -> Self {
        LogicalExpr::Subquery(sub)
    }
}

impl std::fmt::Display for SubqueryExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let corr = if self.correlated { ", correlated" } else { "" };
        match &self.kind {
            SubqueryKind::In(needle) => write!(f, "{needle} IN (subquery{corr})"),
            SubqueryKind::Exists => write!(f, "EXISTS (subquery{corr})"),
            SubqueryKind::Scalar => write!(f, "(scalar subquery{corr})"),
        }
    }
}
