//! Limit pushdown optimization rule.

use common_error::FedraResult;
use fedra_logical::{LogicalOp, LogicalPlan, SortKey};
use log::debug;

use super::rule::{OptimizationRule, Transformed, rewrite_plan};

/// Limit pushdown optimization.
///
/// Matches a sort carrying a `LIMIT` and hands `offset + fetch` rows to the
/// scan below it, descending only through projections. Joins, aggregates,
/// sorts and filters evaluated locally block the push.
///
/// - Without ordering and with offset 0 the sort is removed.
/// - Without ordering and with an offset, the sort stays to apply the
///   offset locally.
/// - With ordering, the ordering and the row bound move into the scan
///   together and the sort stays.
///
/// An offset is never handed to a data source on its own.
pub struct LimitPushdown;

impl OptimizationRule for LimitPushdown {
    fn name(&self) -> &'static str {
        "LimitPushdown"
    }

    fn description(&self) -> &'static str {
        "Push LIMIT (and ordering) into remote scans"
    }

    fn apply(&self, plan: LogicalPlan) -> FedraResult<Transformed> {
        rewrite_plan(plan, |op| Ok(push_limit(op)))
    }
}

/// Outcome of trying to reach a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushResult {
    /// No legal target below the sort.
    Unreachable,
    /// The scan was updated.
    Changed,
    /// The scan already satisfies the limit.
    AlreadySatisfied,
}

fn push_limit(op: LogicalOp) -> (LogicalOp, bool) {
    let LogicalOp::Sort { mut input, sort } = op else {
        return (op, false);
    };
    let Some(rows) = sort.offset_plus_fetch() else {
        return (LogicalOp::Sort { input, sort }, false);
    };

    let keys = Some(sort.keys.clone()).filter(|k| !k.is_empty());
    let result = push_into(&mut input, keys, rows);
    debug!("Limit {rows} below {}: {result:?}", input.name());

    match result {
        PushResult::Unreachable => (LogicalOp::Sort { input, sort }, false),
        PushResult::Changed | PushResult::AlreadySatisfied
            if sort.keys.is_empty() && sort.offset == 0 =>
        {
            (*input, true)
        }
        PushResult::Changed => (LogicalOp::Sort { input, sort }, true),
        PushResult::AlreadySatisfied => (LogicalOp::Sort { input, sort }, false),
    }
}

/// Push `rows` (and `keys`, when ordering is requested) into the scan below `op`.
fn push_into(op: &mut LogicalOp, keys: Option<Vec<SortKey>>, rows: usize) -> PushResult {
    match op {
        LogicalOp::Project { input, project } => {
            let keys = match keys {
                None => None,
                Some(keys) => {
                    let mapped: Option<Vec<SortKey>> = keys
                        .iter()
                        .map(|k| {
                            project.exprs.get(k.column)?.as_input_ref().map(|column| SortKey {
                                column,
                                ascending: k.ascending,
                            })
                        })
                        .collect();
                    match mapped {
                        Some(mapped) => Some(mapped),
                        None => return PushResult::Unreachable,
                    }
                }
            };
            push_into(input, keys, rows)
        }

        LogicalOp::Scan(scan) => match keys {
            None => match scan.fetch {
                Some(fetch) if fetch <= rows => PushResult::AlreadySatisfied,
                _ => {
                    scan.fetch = Some(rows);
                    PushResult::Changed
                }
            },
            Some(keys) => match scan.fetch {
                Some(_) if scan.order != keys => PushResult::Unreachable,
                Some(fetch) if fetch <= rows => PushResult::AlreadySatisfied,
                _ => {
                    scan.order = keys;
                    scan.fetch = Some(rows);
                    PushResult::Changed
                }
            },
        },

        LogicalOp::Filter { .. }
        | LogicalOp::Join { .. }
        | LogicalOp::Aggregate { .. }
        | LogicalOp::Sort { .. } => PushResult::Unreachable,
    }
}
