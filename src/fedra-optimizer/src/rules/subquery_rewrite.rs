//! Subquery-to-join rewriting.

use common_error::FedraResult;
use fedra_logical::{
    AggregateOp, FilterOp, JoinOp, LogicalExpr, LogicalOp, LogicalPlan, ProjectOp, SubqueryKind,
};
use log::debug;

use super::rule::{OptimizationRule, Transformed, rewrite_plan};

/// Rewrites `column IN (subquery)` filters into joins.
///
/// A top-level conjunct `$k IN (q)` where `q` is uncorrelated and yields one
/// column becomes an inner join of the filter input with the distinct values
/// of `q`, followed by a projection back to the input's columns. Inside a
/// filter, a NULL needle or a NULL in `q` can only make the predicate NULL
/// or false, and an equi-join drops those rows the same way.
///
/// Correlated, `EXISTS` and scalar subqueries are left in place for an
/// external planner.
pub struct SubqueryRewrite;

impl OptimizationRule for SubqueryRewrite {
    fn name(&self) -> &'static str {
        "SubqueryRewrite"
    }

    fn description(&self) -> &'static str {
        "Rewrite uncorrelated IN subqueries into semi-joins"
    }

    fn apply(&self, plan: LogicalPlan) -> FedraResult<Transformed> {
        rewrite_plan(plan, |op| Ok(rewrite_in_subquery(op)))
    }
}

fn rewrite_in_subquery(op: LogicalOp) -> (LogicalOp, bool) {
    let LogicalOp::Filter { input, filter } = op else {
        return (op, false);
    };
    if !filter.condition.contains_subquery() {
        return (LogicalOp::Filter { input, filter }, false);
    }

    let mut conjuncts = filter.condition.clone().conjuncts();
    let Some(position) = conjuncts.iter().position(is_rewritable) else {
        debug!(
            "Leaving subquery in filter for an external planner: {}",
            filter.condition
        );
        return (LogicalOp::Filter { input, filter }, false);
    };

    let LogicalExpr::Subquery(sub) = conjuncts.remove(position) else {
        return (LogicalOp::Filter { input, filter }, false);
    };
    let Some(needle) = sub.needle().and_then(LogicalExpr::as_input_ref) else {
        return (LogicalOp::Filter { input, filter }, false);
    };

    let width = input.output_width();
    let names = input.output_names();
    let distinct = LogicalOp::aggregate(*sub.plan, AggregateOp::new(vec![0], vec![]));
    let join = LogicalOp::join(
        *input,
        distinct,
        JoinOp::inner(LogicalExpr::InputRef(needle).eq(LogicalExpr::InputRef(width))),
    );
    let indices: Vec<usize> = (0..width).collect();
    let restored = LogicalOp::project(join, ProjectOp::refs(&indices, &names));

    let rewritten = match LogicalExpr::conjunction(conjuncts) {
        Some(rest) => LogicalOp::filter(restored, FilterOp::new(rest)),
        None => restored,
    };
    (rewritten, true)
}

fn is_rewritable(expr: &LogicalExpr) -> bool {
    let LogicalExpr::Subquery(sub) = expr else {
        return false;
    };
    matches!(&sub.kind, SubqueryKind::In(needle) if needle.as_input_ref().is_some())
        && !sub.correlated
        && sub.plan.output_width() == 1
}
