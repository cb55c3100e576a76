//! Logical planning layer for the fedra federated query engine.
//!
//! `fedra-logical` defines the relational plan handed to fedra by an
//! external SQL planner, and the expression trees carried by its nodes.
//!
//! # Overview
//!
//! - **Operators**: a closed set of node kinds (Scan, Filter, Project, Join,
//!   Aggregate, Sort). A sort carries `LIMIT` / `OFFSET`.
//! - **Expressions**: positional column references, literals, scalar calls
//!   and subqueries.
//! - **Statistics**: table row counts and cardinality estimation used by the
//!   cost model.
//!
//! # Example
//!
//! ```rust
//! use fedra_logical::{PlanBuilder, SortKey};
//! use fedra_logical::expr::{col, lit};
//!
//! // SELECT id, amount FROM orders WHERE status = 'open' ORDER BY amount DESC LIMIT 10
//! let plan = PlanBuilder::table("orders", ["id", "status", "amount"])
//!     .filter(col(1).eq(lit("open")))
//!     .project_columns(&[0, 2])
//!     .sort(vec![SortKey::desc(1)])
//!     .limit(0, Some(10))
//!     .build();
//!
//! println!("{}", plan.explain());
//! ```

pub mod expr;
pub mod ops;
mod plan;
pub mod stats;

pub use plan::{LogicalPlan, PlanBuilder};

pub use ops::{
    AggCall, AggFunc, AggregateOp, FilterOp, JoinKeys, JoinOp, JoinType, LogicalOp, ProjectOp,
    ScanOp, SortKey, SortOp, TableRef,
};

pub use expr::{LogicalExpr, ScalarOp, SubqueryExpr, SubqueryKind, col, lit, sql_ident};

pub use stats::{NoStatistics, Statistics, estimate_row_count, selectivity};
