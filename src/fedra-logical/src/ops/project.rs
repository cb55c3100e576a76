//! Project operator.

use serde::{Deserialize, Serialize};

use crate::expr::LogicalExpr;

/// Projection: one expression and one output name per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectOp {
    pub exprs: Vec<LogicalExpr>,
    pub names: Vec<String>,
}

impl ProjectOp {
    pub fn new(exprs: Vec<LogicalExpr>, names: Vec<String>) -> Self {
        Self { exprs, names }
    }

    /// Projection of input columns by position, keeping their names.
    pub fn refs(indices: &[usize], input_names: &[String]) -> Self {
        Self {
            exprs: indices.iter().map(|&i| LogicalExpr::InputRef(i)).collect(),
            names: indices
                .iter()
                .map(|&i| input_names.get(i).cloned().unwrap_or_else(|| format!("${i}")))
                .collect(),
        }
    }

    /// The referenced positions if every expression is a bare input reference.
    pub fn pure_refs(&self) -> Option<Vec<usize>> {
        self.exprs.iter().map(LogicalExpr::as_input_ref).collect()
    }

    /// Whether this projection passes `width` input columns through unchanged.
    pub fn is_identity(&self, width: usize) -> bool {
        self.exprs.len() == width
            && self
                .exprs
                .iter()
                .enumerate()
                .all(|(i, e)| e.as_input_ref() == Some(i))
    }
}
