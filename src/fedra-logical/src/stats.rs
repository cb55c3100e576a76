//! Table statistics and cardinality estimation.

use std::collections::HashMap;

use crate::expr::{LogicalExpr, ScalarOp};
use crate::ops::{LogicalOp, TableRef};

/// Selectivity of an equality predicate.
pub const EQUALITY_SELECTIVITY: f64 = 0.15;
/// Selectivity of a range predicate.
pub const RANGE_SELECTIVITY: f64 = 0.5;
/// Selectivity of any other predicate.
pub const DEFAULT_SELECTIVITY: f64 = 0.25;
/// Fraction of input rows a grouped aggregate is assumed to emit.
pub const GROUPED_AGGREGATE_RATIO: f64 = 0.1;

/// Source of per-table statistics.
pub trait Statistics: Send + Sync {
    /// Row count of the table, if known.
    fn row_count(&self, table: &TableRef) -> Option<u64>;
}

/// Statistics provider that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatistics;

impl Statistics for NoStatistics {
    fn row_count(&self, _table: &TableRef) -> Option<u64> {
        None
    }
}

/// Row counts keyed by table name (qualified or bare).
impl Statistics for HashMap<String, u64> {
    fn row_count(&self, table: &TableRef) -> Option<u64> {
        self.get(&table.qualified_name())
            .or_else(|| self.get(&table.table))
            .copied()
    }
}

/// Estimated fraction of rows satisfying `predicate`.
pub fn selectivity(predicate: &LogicalExpr) -> f64 {
    match predicate {
        LogicalExpr::Call {
            op: ScalarOp::And,
            args,
        } => args.iter().map(selectivity).product(),
        LogicalExpr::Call {
            op: ScalarOp::Or,
            args,
        } => {
            let miss: f64 = args.iter().map(|a| 1.0 - selectivity(a)).product();
            1.0 - miss
        }
        LogicalExpr::Call { op, .. } if *op == ScalarOp::Eq => EQUALITY_SELECTIVITY,
        LogicalExpr::Call { op, .. } if op.is_range() => RANGE_SELECTIVITY,
        LogicalExpr::Literal(v) if v.as_bool() == Some(true) => 1.0,
        _ => DEFAULT_SELECTIVITY,
    }
}

/// Estimated output rows of a plan.
///
/// Tables without statistics are assumed to hold `default_rows` rows.
pub fn estimate_row_count(op: &LogicalOp, stats: &dyn Statistics, default_rows: f64) -> f64 {
    match op {
        LogicalOp::Scan(scan) => {
            let base = stats
                .row_count(&scan.table)
                .map_or(default_rows, |n| n as f64);
            let filtered = scan
                .filters
                .iter()
                .fold(base, |rows, f| rows * selectivity(f));
            match scan.fetch {
                Some(fetch) => filtered.min(fetch as f64),
                None => filtered,
            }
        }
        LogicalOp::Filter { input, filter } => {
            estimate_row_count(input, stats, default_rows) * selectivity(&filter.condition)
        }
        LogicalOp::Project { input, .. } => estimate_row_count(input, stats, default_rows),
        LogicalOp::Join { left, right, join } => {
            let l = estimate_row_count(left, stats, default_rows);
            let r = estimate_row_count(right, stats, default_rows);
            let keys = join.split_keys(left.output_width());
            if keys.pairs.is_empty() {
                let cross = l * r;
                keys.residual.map_or(cross, |res| cross * selectivity(&res))
            } else {
                l.max(r)
            }
        }
        LogicalOp::Aggregate { input, aggregate } => {
            if aggregate.is_global() {
                1.0
            } else {
                (estimate_row_count(input, stats, default_rows) * GROUPED_AGGREGATE_RATIO).max(1.0)
            }
        }
        LogicalOp::Sort { input, sort } => {
            let rows = (estimate_row_count(input, stats, default_rows) - sort.offset as f64).max(0.0);
            match sort.fetch {
                Some(fetch) => rows.min(fetch as f64),
                None => rows,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, lit};
    use crate::ops::{AggCall, AggregateOp, FilterOp, JoinOp, ScanOp, SortOp};

    fn scan(name: &str) -> LogicalOp {
        LogicalOp::scan(ScanOp::new(TableRef::new(name), vec!["a".into(), "b".into()]))
    }

    fn stats() -> HashMap<String, u64> {
        HashMap::from([("big".to_string(), 10_000), ("small".to_string(), 50)])
    }

    #[test]
    fn test_selectivity_defaults() {
        assert_eq!(selectivity(&col(0).eq(lit(1i64))), EQUALITY_SELECTIVITY);
        assert_eq!(selectivity(&col(0).lt(lit(1i64))), RANGE_SELECTIVITY);
        assert_eq!(selectivity(&col(0).is_null()), DEFAULT_SELECTIVITY);
        let both = col(0).eq(lit(1i64)).and(col(1).gt(lit(2i64)));
        assert!((selectivity(&both) - 0.075).abs() < 1e-12);
    }

    #[test]
    fn test_scan_uses_statistics_or_default() {
        assert_eq!(estimate_row_count(&scan("big"), &stats(), 100.0), 10_000.0);
        assert_eq!(estimate_row_count(&scan("unknown"), &stats(), 100.0), 100.0);
        assert_eq!(estimate_row_count(&scan("big"), &NoStatistics, 100.0), 100.0);
    }

    #[test]
    fn test_filter_join_and_aggregate_estimates() {
        let filtered = LogicalOp::filter(scan("big"), FilterOp::new(col(0).eq(lit(1i64))));
        assert_eq!(estimate_row_count(&filtered, &stats(), 100.0), 1_500.0);

        let join = LogicalOp::join(scan("big"), scan("small"), JoinOp::inner(col(0).eq(col(2))));
        assert_eq!(estimate_row_count(&join, &stats(), 100.0), 10_000.0);

        let global = LogicalOp::aggregate(
            scan("big"),
            AggregateOp::new(vec![], vec![AggCall::count_star("n")]),
        );
        assert_eq!(estimate_row_count(&global, &stats(), 100.0), 1.0);

        let grouped = LogicalOp::aggregate(
            scan("big"),
            AggregateOp::new(vec![0], vec![AggCall::count_star("n")]),
        );
        assert_eq!(estimate_row_count(&grouped, &stats(), 100.0), 1_000.0);
    }

    #[test]
    fn test_sort_fetch_caps_rows() {
        let sorted = LogicalOp::sort(scan("big"), SortOp::limit(10, Some(20)));
        assert_eq!(estimate_row_count(&sorted, &stats(), 100.0), 20.0);
    }
}
