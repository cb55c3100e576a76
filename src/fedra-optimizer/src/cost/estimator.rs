//! Cumulative cost of a logical plan.

use fedra_logical::{LogicalOp, ScanOp, Statistics, estimate_row_count};

use super::{CostFactory, FederatedCost, PlanCost};

/// Walks a logical plan and sums per-operator costs.
///
/// Scans are always priced as remote reads. A pure column projection
/// directly over a scan is priced as part of the scan, at the projected
/// width, since the converter folds it into the remote column list.
pub struct CostEstimator<'a> {
    factory: &'a CostFactory,
    stats: &'a dyn Statistics,
}

impl<'a> CostEstimator<'a> {
    pub fn new(factory: &'a CostFactory, stats: &'a dyn Statistics) -> Self {
        Self { factory, stats }
    }

    /// Estimated output rows of `op`.
    pub fn row_count(&self, op: &LogicalOp) -> f64 {
        estimate_row_count(op, self.stats, self.factory.config().default_table_rows)
    }

    /// Cost of `op` and everything below it.
    pub fn cumulative_cost(&self, op: &LogicalOp) -> FederatedCost {
        if let Some((scan, width)) = fused_scan(op) {
            return self.scan_cost(scan, width);
        }
        op.inputs()
            .into_iter()
            .fold(self.self_cost(op), |acc, input| {
                acc.plus(&self.cumulative_cost(input))
            })
    }

    /// Cost of `op` alone, excluding its inputs.
    pub fn self_cost(&self, op: &LogicalOp) -> FederatedCost {
        let config = self.factory.config();
        match op {
            LogicalOp::Scan(scan) => self.scan_cost(scan, scan.width()),
            LogicalOp::Filter { input, .. } | LogicalOp::Project { input, .. } => {
                let input_rows = self.row_count(input);
                self.factory.make_cost(
                    self.row_count(op),
                    input_rows * config.scan_cpu_per_row,
                    0.0,
                    0.0,
                    0.0,
                )
            }
            LogicalOp::Join { left, right, join } => {
                let is_cross = join.split_keys(left.output_width()).pairs.is_empty();
                self.factory
                    .join(self.row_count(left), self.row_count(right), is_cross)
            }
            LogicalOp::Aggregate { input, aggregate } => {
                let group_count = aggregate.group_by.len().max(1) as f64;
                self.factory
                    .aggregate(self.row_count(input), self.row_count(op), group_count)
            }
            LogicalOp::Sort { input, sort } => {
                if sort.keys.is_empty() {
                    self.factory.make_cost(self.row_count(op), 0.0, 0.0, 0.0, 0.0)
                } else {
                    self.factory.sort(self.row_count(input), true)
                }
            }
        }
    }

    fn scan_cost(&self, scan: &ScanOp, width: usize) -> FederatedCost {
        let rows = estimate_row_count(
            &LogicalOp::Scan(scan.clone()),
            self.stats,
            self.factory.config().default_table_rows,
        );
        let bytes_per_row = width.max(1) as f64 * self.factory.config().avg_column_bytes;
        self.factory.table_scan(rows, bytes_per_row, true)
    }
}

fn fused_scan(op: &LogicalOp) -> Option<(&ScanOp, usize)> {
    match op {
        LogicalOp::Project { input, project } => match input.as_ref() {
            LogicalOp::Scan(scan) if project.pure_refs().is_some() => {
                Some((scan, project.exprs.len()))
            }
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use fedra_logical::{NoStatistics, PlanBuilder, TableRef, col, lit};

    use super::*;

    fn stats() -> HashMap<String, u64> {
        HashMap::from([("orders".to_string(), 10_000), ("regions".to_string(), 10)])
    }

    #[test]
    fn test_scan_pushdown_is_cheaper() {
        let factory = CostFactory::default();
        let stats = stats();
        let estimator = CostEstimator::new(&factory, &stats);

        let local_filter = PlanBuilder::table("orders", ["id", "status"])
            .filter(col(1).eq(lit("open")))
            .build_op();
        let mut scan = ScanOp::new(TableRef::new("orders"), vec!["id".into(), "status".into()]);
        scan.filters.push(col(1).eq(lit("open")));
        let pushed = LogicalOp::Scan(scan);

        assert!(
            estimator
                .cumulative_cost(&pushed)
                .is_lt(&estimator.cumulative_cost(&local_filter))
        );
    }

    #[test]
    fn test_narrow_projection_is_cheaper() {
        let factory = CostFactory::default();
        let estimator = CostEstimator::new(&factory, &NoStatistics);

        let wide = PlanBuilder::table("t", ["a", "b", "c", "d"]).build_op();
        let narrow = PlanBuilder::table("t", ["a", "b", "c", "d"])
            .project_columns(&[0])
            .build_op();

        assert!(
            estimator
                .cumulative_cost(&narrow)
                .is_lt(&estimator.cumulative_cost(&wide))
        );
    }

    #[test]
    fn test_join_cost_uses_child_estimates() {
        let factory = CostFactory::default();
        let stats = stats();
        let estimator = CostEstimator::new(&factory, &stats);

        let join = PlanBuilder::table("orders", ["id", "region"])
            .join(PlanBuilder::table("regions", ["id", "name"]), col(1).eq(col(2)))
            .build_op();

        let own = estimator.self_cost(&join);
        assert_eq!(own.rows(), 10_000.0);
        assert!((own.cpu() - 10_010.0).abs() < 1e-9);
        assert!((own.memory() - 640.0).abs() < 1e-9);
        assert!(estimator.cumulative_cost(&join).total_cost() > own.total_cost());
    }
}
