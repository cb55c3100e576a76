//! Aggregate operator.

use serde::{Deserialize, Serialize};

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl std::fmt::Display for AggFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count => write!(f, "COUNT"),
            Self::Sum => write!(f, "SUM"),
            Self::Avg => write!(f, "AVG"),
            Self::Min => write!(f, "MIN"),
            Self::Max => write!(f, "MAX"),
        }
    }
}

/// One aggregate call, keyed by the input column it consumes.
///
/// `COUNT` ignores its argument and counts rows; every other function
/// requires `arg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggCall {
    pub func: AggFunc,
    pub arg: Option<usize>,
    pub name: String,
}

impl AggCall {
    pub fn new(func: AggFunc, arg: Option<usize>, name: impl Into<String>) -> Self {
        Self {
            func,
            arg,
            name: name.into(),
        }
    }

    pub fn count_star(name: impl Into<String>) -> Self {
        Self::new(AggFunc::Count, None, name)
    }

    pub fn sum(arg: usize, name: impl Into<String>) -> Self {
        Self::new(AggFunc::Sum, Some(arg), name)
    }

    pub fn avg(arg: usize, name: impl Into<String>) -> Self {
        Self::new(AggFunc::Avg, Some(arg), name)
    }

    pub fn min(arg: usize, name: impl Into<String>) -> Self {
        Self::new(AggFunc::Min, Some(arg), name)
    }

    pub fn max(arg: usize, name: impl Into<String>) -> Self {
        Self::new(AggFunc::Max, Some(arg), name)
    }
}

impl std::fmt::Display for AggCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.arg {
            Some(arg) => write!(f, "{}(${arg}) AS {}", self.func, self.name),
            None => write!(f, "{}(*) AS {}", self.func, self.name),
        }
    }
}

/// Grouped aggregation. Output columns are the group keys followed by the aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateOp {
    pub group_by: Vec<usize>,
    pub aggs: Vec<AggCall>,
}

impl AggregateOp {
    pub fn new(group_by: Vec<usize>, aggs: Vec<AggCall>) -> Self {
        Self { group_by, aggs }
    }

    /// Aggregation without grouping columns: always one output row.
    pub fn is_global(&self) -> bool {
        self.group_by.is_empty()
    }

    pub fn output_width(&self) -> usize {
        self.group_by.len() + self.aggs.len()
    }
}
