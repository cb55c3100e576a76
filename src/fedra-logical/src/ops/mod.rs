//! Logical operators for query plans.

mod aggregate;
mod filter;
mod join;
mod project;
mod scan;
mod sort;

pub use aggregate::{AggCall, AggFunc, AggregateOp};
pub use filter::FilterOp;
pub use join::{JoinKeys, JoinOp, JoinType};
pub use project::ProjectOp;
pub use scan::{ScanOp, TableRef};
pub use sort::{SortKey, SortOp};

use serde::{Deserialize, Serialize};

/// Logical operator in a query plan.
///
/// The set of node kinds is closed: every consumer matches exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Scan of one federated table.
    Scan(ScanOp),
    /// Filter rows based on a predicate.
    Filter {
        input: Box<LogicalOp>,
        filter: FilterOp,
    },
    /// Compute output columns.
    Project {
        input: Box<LogicalOp>,
        project: ProjectOp,
    },
    /// Join two inputs.
    Join {
        left: Box<LogicalOp>,
        right: Box<LogicalOp>,
        join: JoinOp,
    },
    /// Grouped aggregation.
    Aggregate {
        input: Box<LogicalOp>,
        aggregate: AggregateOp,
    },
    /// Ordering with optional LIMIT / OFFSET.
    Sort {
        input: Box<LogicalOp>,
        sort: SortOp,
    },
}

impl LogicalOp {
    pub fn scan(scan: ScanOp) -> Self {
        Self::Scan(scan)
    }

    pub fn filter(input: LogicalOp, filter: FilterOp) -> Self {
        Self::Filter {
            input: Box::new(input),
            filter,
        }
    }

    pub fn project(input: LogicalOp, project: ProjectOp) -> Self {
        Self::Project {
            input: Box::new(input),
            project,
        }
    }

    pub fn join(left: LogicalOp, right: LogicalOp, join: JoinOp) -> Self {
        Self::Join {
            left: Box::new(left),
            right: Box::new(right),
            join,
        }
    }

    pub fn aggregate(input: LogicalOp, aggregate: AggregateOp) -> Self {
        Self::Aggregate {
            input: Box::new(input),
            aggregate,
        }
    }

    pub fn sort(input: LogicalOp, sort: SortOp) -> Self {
        Self::Sort {
            input: Box::new(input),
            sort,
        }
    }

    /// Get the input operators.
    pub fn inputs(&self) -> Vec<&LogicalOp> {
        match self {
            Self::Scan(_) => vec![],
            Self::Filter { input, .. }
            | Self::Project { input, .. }
            | Self::Aggregate { input, .. }
            | Self::Sort { input, .. } => vec![input.as_ref()],
            Self::Join { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        }
    }

    /// Rebuild this operator with each input replaced by `f(input)`.
    pub fn map_children<F>(self, mut f: F) -> Self
    where
        F: FnMut(LogicalOp) -> LogicalOp,
    {
        match self {
            Self::Scan(_) => self,
            Self::Filter { input, filter } => Self::Filter {
                input: Box::new(f(*input)),
                filter,
            },
            Self::Project { input, project } => Self::Project {
                input: Box::new(f(*input)),
                project,
            },
            Self::Join { left, right, join } => Self::Join {
                left: Box::new(f(*left)),
                right: Box::new(f(*right)),
                join,
            },
            Self::Aggregate { input, aggregate } => Self::Aggregate {
                input: Box::new(f(*input)),
                aggregate,
            },
            Self::Sort { input, sort } => Self::Sort {
                input: Box::new(f(*input)),
                sort,
            },
        }
    }

    /// Fallible variant of [`LogicalOp::map_children`].
    pub fn try_map_children<F, E>(self, mut f: F) -> Result<Self, E>
    where
        F: FnMut(LogicalOp) -> Result<LogicalOp, E>,
    {
        Ok(match self {
            Self::Scan(_) => self,
            Self::Filter { input, filter } => Self::Filter {
                input: Box::new(f(*input)?),
                filter,
            },
            Self::Project { input, project } => Self::Project {
                input: Box::new(f(*input)?),
                project,
            },
            Self::Join { left, right, join } => Self::Join {
                left: Box::new(f(*left)?),
                right: Box::new(f(*right)?),
                join,
            },
            Self::Aggregate { input, aggregate } => Self::Aggregate {
                input: Box::new(f(*input)?),
                aggregate,
            },
            Self::Sort { input, sort } => Self::Sort {
                input: Box::new(f(*input)?),
                sort,
            },
        })
    }

    /// Get the name of this operator.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scan(_) => "Scan",
            Self::Filter { .. } => "Filter",
            Self::Project { .. } => "Project",
            Self::Join { .. } => "Join",
            Self::Aggregate { .. } => "Aggregate",
            Self::Sort { .. } => "Sort",
        }
    }

    /// Output column names, in order.
    pub fn output_names(&self) -> Vec<String> {
        match self {
            Self::Scan(scan) => scan.columns.clone(),
            Self::Filter { input, .. } | Self::Sort { input, .. } => input.output_names(),
            Self::Project { project, .. } => project.names.clone(),
            Self::Join { left, right, .. } => {
                let mut names = left.output_names();
                names.extend(right.output_names());
                names
            }
            Self::Aggregate { input, aggregate } => {
                let input_names = input.output_names();
                aggregate
                    .group_by
                    .iter()
                    .map(|&i| input_names.get(i).cloned().unwrap_or_else(|| format!("${i}")))
                    .chain(aggregate.aggs.iter().map(|a| a.name.clone()))
                    .collect()
            }
        }
    }

    pub fn output_width(&self) -> usize {
        match self {
            Self::Scan(scan) => scan.width(),
            Self::Filter { input, .. } | Self::Sort { input, .. } => input.output_width(),
            Self::Project { project, .. } => project.exprs.len(),
            Self::Join { left, right, .. } => left.output_width() + right.output_width(),
            Self::Aggregate { aggregate, .. } => aggregate.output_width(),
        }
    }

    /// Every table scanned by this subtree, left to right.
    pub fn scans(&self) -> Vec<&ScanOp> {
        match self {
            Self::Scan(scan) => vec![scan],
            other => other.inputs().into_iter().flat_map(LogicalOp::scans).collect(),
        }
    }

    /// Explain this operator as an indented tree.
    pub fn explain(&self, indent: usize) -> String {
        let prefix = "  ".repeat(indent);
        let mut result = format!("{}{}", prefix, self.explain_self());

        for input in self.inputs() {
            result.push('\n');
            result.push_str(&input.explain(indent + 1));
        }

        result
    }

    fn explain_self(&self) -> String {
        match self {
            Self::Scan(op) => {
                let mut s = format!("Scan({}, columns=[{}]", op.table, op.columns.join(", "));
                if !op.filters.is_empty() {
                    let filters: Vec<String> = op.filters.iter().map(ToString::to_string).collect();
                    s.push_str(&format!(", filters=[{}]", filters.join(", ")));
                }
                if !op.order.is_empty() {
                    let order: Vec<String> = op.order.iter().map(ToString::to_string).collect();
                    s.push_str(&format!(", order=[{}]", order.join(", ")));
                }
                if let Some(fetch) = op.fetch {
                    s.push_str(&format!(", fetch={fetch}"));
                }
                s.push(')');
                s
            }
            Self::Filter { filter, .. } => format!("Filter({})", filter.condition),
            Self::Project { project, .. } => {
                let cols: Vec<String> = project
                    .exprs
                    .iter()
                    .zip(&project.names)
                    .map(|(e, n)| format!("{n}={e}"))
                    .collect();
                format!("Project({})", cols.join(", "))
            }
            Self::Join { join, .. } => format!("Join({}, {})", join.join_type, join.condition),
            Self::Aggregate { aggregate, .. } => {
                let aggs: Vec<String> = aggregate.aggs.iter().map(ToString::to_string).collect();
                format!(
                    "Aggregate(group_by={:?}, aggs=[{}])",
                    aggregate.group_by,
                    aggs.join(", ")
                )
            }
            Self::Sort { sort, .. } => {
                let keys: Vec<String> = sort.keys.iter().map(ToString::to_string).collect();
                let fetch = sort.fetch.map_or_else(|| "ALL".to_string(), |f| f.to_string());
                format!(
                    "Sort(keys=[{}], offset={}, fetch={})",
                    keys.join(", "),
                    sort.offset,
                    fetch
                )
            }
        }
    }
}

impl std::fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.explain(0))
    }
}
