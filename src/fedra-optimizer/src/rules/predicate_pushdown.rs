//! Predicate pushdown optimization rule.

use common_error::FedraResult;
use fedra_logical::{FilterOp, JoinType, LogicalExpr, LogicalOp, LogicalPlan};

use super::rule::{OptimizationRule, Transformed, rewrite_plan};

/// Predicate pushdown optimization.
///
/// Moves filter conjuncts toward the scans that produce their columns:
///
/// - a filter above a projection is rewritten in terms of the projection's
///   input and moved below it;
/// - stacked filters are merged;
/// - above an inner join, conjuncts that touch one side move into that side
///   and conjuncts spanning both sides join the join condition;
/// - above a scan, conjuncts that can be rendered as SQL are handed to the
///   data source.
///
/// Conjuncts carrying subqueries stay where they are.
pub struct PredicatePushdown;

impl OptimizationRule for PredicatePushdown {
    fn name(&self) -> &'static str {
        "PredicatePushdown"
    }

    fn description(&self) -> &'static str {
        "Push filter predicates toward and into remote scans"
    }

    fn apply(&self, plan: LogicalPlan) -> FedraResult<Transformed> {
        rewrite_plan(plan, |op| Ok(push_filter(op)))
    }
}

fn push_filter(op: LogicalOp) -> (LogicalOp, bool) {
    let LogicalOp::Filter { input, filter } = op else {
        return (op, false);
    };
    let condition = filter.condition;

    if condition == LogicalExpr::Literal(true.into()) {
        return (*input, true);
    }

    match *input {
        LogicalOp::Filter {
            input: inner,
            filter: inner_filter,
        } => (
            LogicalOp::filter(*inner, FilterOp::new(inner_filter.condition.and(condition))),
            true,
        ),

        LogicalOp::Project { input: inner, project }
            if !condition.contains_subquery()
                && !project.exprs.iter().any(LogicalExpr::contains_subquery) =>
        {
            match condition.substitute(&project.exprs) {
                Some(rewritten) => (
                    LogicalOp::project(push_below(*inner, vec![rewritten]), project),
                    true,
                ),
                None => (
                    restore(LogicalOp::project(*inner, project), condition),
                    false,
                ),
            }
        }

        LogicalOp::Join { left, right, join } if join.join_type == JoinType::Inner => {
            let left_width = left.output_width();
            let total_width = left_width + right.output_width();

            let mut to_left = Vec::new();
            let mut to_right = Vec::new();
            let mut to_join = Vec::new();
            let mut keep = Vec::new();
            for conjunct in condition.conjuncts() {
                if conjunct.contains_subquery() {
                    keep.push(conjunct);
                } else if conjunct.refs_within(0, left_width) {
                    to_left.push(conjunct);
                } else if conjunct.refs_within(left_width, total_width) {
                    to_right.push(conjunct.shift(-(left_width as isize)));
                } else {
                    to_join.push(conjunct);
                }
            }

            let mut join = join;
            let changed = !(to_left.is_empty() && to_right.is_empty() && to_join.is_empty());
            let left = push_below(*left, to_left);
            let right = push_below(*right, to_right);
            if let Some(extra) = LogicalExpr::conjunction(to_join) {
                join.condition = if join.condition == LogicalExpr::Literal(true.into()) {
                    extra
                } else {
                    join.condition.and(extra)
                };
            }
            (with_filter(LogicalOp::join(left, right, join), keep), changed)
        }

        LogicalOp::Scan(mut scan) if scan.fetch.is_none() => {
            let (remote, local): (Vec<_>, Vec<_>) = condition
                .conjuncts()
                .into_iter()
                .partition(|c| c.to_sql(&scan.columns).is_some());
            let changed = !remote.is_empty();
            scan.filters.extend(remote);
            (with_filter(LogicalOp::Scan(scan), local), changed)
        }

        other => (restore(other, condition), false),
    }
}

fn restore(input: LogicalOp, condition: LogicalExpr) -> LogicalOp {
    LogicalOp::filter(input, FilterOp::new(condition))
}

/// Place `conjuncts` above `input` and keep pushing them down.
fn push_below(input: LogicalOp, conjuncts: Vec<LogicalExpr>) -> LogicalOp {
    match LogicalExpr::conjunction(conjuncts) {
        Some(condition) => push_filter(restore(input, condition)).0,
        None => input,
    }
}

fn with_filter(input: LogicalOp, conjuncts: Vec<LogicalExpr>) -> LogicalOp {
    match LogicalExpr::conjunction(conjuncts) {
        Some(condition) => restore(input, condition),
        None => input,
    }
}
