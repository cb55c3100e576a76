//! Compilation of logical expressions into row functions.
//!
//! Supports column references, literals, comparisons, boolean logic with
//! SQL three-valued semantics, null checks and arithmetic. Subqueries are
//! rejected with `UnsupportedExpression`; the optimizer rewrites the ones
//! fedra can execute into joins.

mod evaluator;

pub use evaluator::{CompiledExpr, KeyExtractor, ProjectionFn, RowPredicate};
