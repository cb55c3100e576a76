//! Optimization rules for fedra logical plans.
//!
//! This module provides the rewrite rules that move work toward the data
//! sources while preserving semantic equivalence.
//!
//! # Rule Categories
//!
//! - **Subquery Rewrite**: turn uncorrelated `IN` subqueries into joins
//! - **Predicate Pushdown**: move filters into joins and remote scans
//! - **Projection Pushdown**: read only the columns the plan needs
//! - **Limit Pushdown**: bound the rows requested from a data source
//! - **Join Reordering**: build hash tables from the smaller input
//!
//! # Rewrite Safety
//!
//! A rewrite is legal only if the rewritten plan returns the same multiset
//! of rows, in the same column order, with unchanged NULL behavior.

mod join_reordering;
mod limit_pushdown;
mod optimizer;
mod predicate_pushdown;
mod projection_pushdown;
mod rule;
mod subquery_rewrite;

pub use join_reordering::{DEFAULT_REORDER_RATIO, JoinReordering};
pub use limit_pushdown::LimitPushdown;
pub use optimizer::{Optimizer, OptimizerConfig};
pub use predicate_pushdown::PredicatePushdown;
pub use projection_pushdown::ProjectionPushdown;
pub use rule::{OptimizationRule, OptimizedPlan, RuleTrace, Transformed};
pub use subquery_rewrite::SubqueryRewrite;
