//! Logical plan structure.

use serde::{Deserialize, Serialize};

use crate::expr::LogicalExpr;
use crate::ops::{
    AggCall, AggregateOp, FilterOp, JoinOp, LogicalOp, ProjectOp, ScanOp, SortKey, SortOp,
    TableRef,
};

/// A logical plan: a tree of logical operators produced by an external SQL planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalPlan {
    /// The root operator of the plan.
    pub root: LogicalOp,
}

impl LogicalPlan {
    pub fn new(root: LogicalOp) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &LogicalOp {
        &self.root
    }

    pub fn into_root(self) -> LogicalOp {
        self.root
    }

    /// Generate a tree-formatted explanation of the plan.
    pub fn explain(&self) -> String {
        let mut output = String::new();
        output.push_str("Logical Plan:\n");
        output.push_str(&self.root.explain(1));
        output
    }

    /// Count the number of operators in the plan.
    pub fn operator_count(&self) -> usize {
        fn count(op: &LogicalOp) -> usize {
            1 + op.inputs().iter().map(|i| count(i)).sum::<usize>()
        }
        count(&self.root)
    }

    /// Get the maximum depth of the plan tree.
    pub fn depth(&self) -> usize {
        fn max_depth(op: &LogicalOp) -> usize {
            1 + op.inputs().iter().map(|i| max_depth(i)).max().unwrap_or(0)
        }
        max_depth(&self.root)
    }

    /// Check if the plan contains an operator matching `predicate`.
    pub fn contains_op<F>(&self, predicate: F) -> bool
    where
        F: Fn(&LogicalOp) -> bool,
    {
        fn check<F>(op: &LogicalOp, predicate: &F) -> bool
        where
            F: Fn(&LogicalOp) -> bool,
        {
            predicate(op) || op.inputs().iter().any(|i| check(i, predicate))
        }
        check(&self.root, &predicate)
    }

    /// Transform the plan by applying a function to each operator (bottom-up).
    pub fn transform<F>(self, f: F) -> Self
    where
        F: Fn(LogicalOp) -> LogicalOp,
    {
        fn transform_op<F>(op: LogicalOp, f: &F) -> LogicalOp
        where
            F: Fn(LogicalOp) -> LogicalOp,
        {
            f(op.map_children(|child| transform_op(child, f)))
        }

        Self {
            root: transform_op(self.root, &f),
        }
    }
}

impl std::fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root)
    }
}

impl From<LogicalOp> for LogicalPlan {
    fn from(op: LogicalOp) -> Self {
        Self::new(op)
    }
}

/// Builder for constructing logical plans fluently.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    op: LogicalOp,
}

impl PlanBuilder {
    /// Start building from a scan.
    pub fn scan(scan: ScanOp) -> Self {
        Self {
            op: LogicalOp::scan(scan),
        }
    }

    /// Start from a scan of `table` (`name` or `schema.name`) with the given columns.
    pub fn table<S: Into<String>>(table: &str, columns: impl IntoIterator<Item = S>) -> Self {
        Self::scan(ScanOp::new(
            TableRef::parse(table),
            columns.into_iter().map(Into::into).collect(),
        ))
    }

    /// Continue building on an existing operator.
    pub fn from_op(op: LogicalOp) -> Self {
        Self { op }
    }

    pub fn filter(self, condition: LogicalExpr) -> Self {
        Self {
            op: LogicalOp::filter(self.op, FilterOp::new(condition)),
        }
    }

    pub fn project(self, exprs: Vec<LogicalExpr>, names: Vec<String>) -> Self {
        Self {
            op: LogicalOp::project(self.op, ProjectOp::new(exprs, names)),
        }
    }

    /// Project input columns by position, keeping their names.
    pub fn project_columns(self, indices: &[usize]) -> Self {
        let project = ProjectOp::refs(indices, &self.op.output_names());
        Self {
            op: LogicalOp::project(self.op, project),
        }
    }

    /// Inner join with `right` on `condition` (positions over the concatenated row).
    pub fn join(self, right: PlanBuilder, condition: LogicalExpr) -> Self {
        Self {
            op: LogicalOp::join(self.op, right.op, JoinOp::inner(condition)),
        }
    }

    pub fn join_with(self, right: PlanBuilder, join: JoinOp) -> Self {
        Self {
            op: LogicalOp::join(self.op, right.op, join),
        }
    }

    pub fn aggregate(self, group_by: Vec<usize>, aggs: Vec<AggCall>) -> Self {
        Self {
            op: LogicalOp::aggregate(self.op, AggregateOp::new(group_by, aggs)),
        }
    }

    pub fn sort(self, keys: Vec<SortKey>) -> Self {
        Self {
            op: LogicalOp::sort(self.op, SortOp::new(keys)),
        }
    }

    /// Apply `LIMIT fetch OFFSET offset`.
    ///
    /// Folds into a directly preceding sort that has no limit yet, the way a
    /// SQL planner attaches `ORDER BY ... LIMIT` to one sort node.
    pub fn limit(self, offset: usize, fetch: Option<usize>) -> Self {
        let op = match self.op {
            LogicalOp::Sort { input, sort } if sort.fetch.is_none() && sort.offset == 0 => {
                LogicalOp::Sort {
                    input,
                    sort: SortOp {
                        keys: sort.keys,
                        offset,
                        fetch,
                    },
                }
            }
            other => LogicalOp::sort(other, SortOp::limit(offset, fetch)),
        };
        Self { op }
    }

    pub fn build_op(self) -> LogicalOp {
        self.op
    }

    /// Build the final plan.
    pub fn build(self) -> LogicalPlan {
        LogicalPlan::new(self.op)
    }
}
