//! Intermediate result accounting.
//!
//! Blocking operators (hash join build side, aggregate map, sort buffer)
//! hold rows in memory. The [`RowBudget`] caps how many rows any one of
//! them may accumulate; exceeding it fails the query with
//! [`FedraError::ResourceExhausted`].

use common_error::{FedraError, FedraResult};

/// Hard cap on rows accumulated by a single blocking operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBudget {
    /// `None` is unlimited.
    limit: Option<usize>,
}

impl RowBudget {
    /// Budget of `limit` rows; `0` means unlimited.
    pub const fn new(limit: usize) -> Self {
        Self {
            limit: if limit == 0 { None } else { Some(limit) },
        }
    }

    pub const fn unlimited() -> Self {
        Self { limit: None }
    }

    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Fail when `rows` exceeds the cap.
    pub fn check(&self, operator: &str, rows: usize) -> FedraResult<()> {
        match self.limit {
            Some(limit) if rows > limit => Err(FedraError::resource_exhausted(operator, limit)),
            _ => Ok(()),
        }
    }
}

impl Default for RowBudget {
    fn default() -> Self {
        Self::new(common_config::DEFAULT_INTERMEDIATE_RESULT_LIMIT)
    }
}
