//! Join input reordering rule.

use std::sync::Arc;

use common_error::FedraResult;
use fedra_logical::{
    JoinOp, JoinType, LogicalExpr, LogicalOp, LogicalPlan, ProjectOp, Statistics,
    estimate_row_count,
};
use log::debug;

use super::rule::{OptimizationRule, Transformed, rewrite_plan};

/// Default ratio above which join inputs are swapped.
pub const DEFAULT_REORDER_RATIO: f64 = 1.5;

/// Heuristic join reordering.
///
/// The hash join builds its table from the left input. When the left input
/// is estimated to be more than `ratio` times larger than the right, the
/// inputs are swapped, the condition is rewritten for the new column order
/// and a projection above the join restores the original output order.
///
/// Only inner joins are reordered.
pub struct JoinReordering {
    stats: Arc<dyn Statistics>,
    ratio: f64,
    default_rows: f64,
}

impl JoinReordering {
    pub fn new(stats: Arc<dyn Statistics>) -> Self {
        Self {
            stats,
            ratio: DEFAULT_REORDER_RATIO,
            default_rows: 100.0,
        }
    }

    /// Set the swap ratio. Ratios below 1 are raised to 1 so a swap never undoes itself.
    #[must_use]
    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = ratio.max(1.0);
        self
    }

    /// Row count assumed for tables without statistics.
    #[must_use]
    pub fn with_default_rows(mut self, rows: f64) -> Self {
        self.default_rows = rows;
        self
    }

    fn rows(&self, op: &LogicalOp) -> f64 {
        estimate_row_count(op, self.stats.as_ref(), self.default_rows)
    }

    fn reorder(&self, op: LogicalOp) -> (LogicalOp, bool) {
        let LogicalOp::Join { left, right, join } = op else {
            return (op, false);
        };
        if join.join_type != JoinType::Inner {
            return (LogicalOp::Join { left, right, join }, false);
        }

        let (left_rows, right_rows) = (self.rows(&left), self.rows(&right));
        if left_rows <= self.ratio * right_rows {
            return (LogicalOp::Join { left, right, join }, false);
        }
        debug!(
            "Swapping join inputs: left ~{left_rows:.0} rows, right ~{right_rows:.0} rows"
        );

        let left_width = left.output_width();
        let right_width = right.output_width();
        let names = {
            let mut names = left.output_names();
            names.extend(right.output_names());
            names
        };

        let condition = join.condition.remap(&|i| {
            if i < left_width {
                i + right_width
            } else {
                i - left_width
            }
        });
        let restore: Vec<LogicalExpr> = (0..left_width)
            .map(|i| LogicalExpr::InputRef(right_width + i))
            .chain((0..right_width).map(LogicalExpr::InputRef))
            .collect();

        let swapped = LogicalOp::join(
            *right,
            *left,
            JoinOp {
                condition,
                join_type: join.join_type,
            },
        );
        (
            LogicalOp::project(swapped, ProjectOp::new(restore, names)),
            true,
        )
    }
}

impl OptimizationRule for JoinReordering {
    fn name(&self) -> &'static str {
        "JoinReordering"
    }

    fn description(&self) -> &'static str {
        "Make the smaller join input the hash build side"
    }

    fn apply(&self, plan: LogicalPlan) -> FedraResult<Transformed> {
        rewrite_plan(plan, |op| Ok(self.reorder(op)))
    }
}
