//! Filter operator.

use serde::{Deserialize, Serialize};

use crate::expr::LogicalExpr;

/// Keeps rows for which `condition` evaluates to true (null and false drop the row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOp {
    pub condition: LogicalExpr,
}

impl FilterOp {
    pub const fn new(condition: LogicalExpr) -> Self {
        Self { condition }
    }

    pub fn contains_subquery(&self) -> bool {
        self.condition.contains_subquery()
    }
}
