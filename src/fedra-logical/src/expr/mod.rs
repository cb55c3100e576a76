//! Expression system for logical plans.

#[allow(clippy::module_inception)]
mod expr;
mod sql;
mod subquery;

pub use expr::{LogicalExpr, ScalarOp, col, lit};
pub use sql::sql_ident;
pub use subquery::{SubqueryExpr, SubqueryKind};
