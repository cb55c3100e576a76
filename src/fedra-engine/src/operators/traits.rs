//! Physical operator trait and common utilities.

use std::fmt::Debug;

use async_trait::async_trait;
use common_error::{FedraError, FedraResult};
use fedra_core::{Row, RowSchema};
use log::debug;

use crate::executor::ExecutionContext;

/// Trait for physical operators in the execution plan.
///
/// Operators form a tree that is pulled one row at a time.
///
/// # Lifecycle
///
/// ```text
/// create → open → (has_next → next)* → close
/// ```
///
/// - `open()` acquires resources, opens children and may pre-fetch (a
///   hash join builds its table, a sort buffers its input)
/// - `has_next()` reports whether another row is available
/// - `next()` returns that row; calling it before `open()` or once
///   `has_next()` is false is a usage error
/// - `close()` releases resources and closes every child. It is idempotent
///   and safe to call at any point, including before `open()`
///
/// An operator tree is exclusively owned by one stage and is never shared
/// across tasks.
#[async_trait]
pub trait PhysicalOperator: Send + Debug {
    /// Get the operator name for display.
    fn name(&self) -> &'static str;

    /// Output column names.
    fn schema(&self) -> &RowSchema;

    /// Get child operators.
    fn children(&self) -> Vec<&dyn PhysicalOperator>;

    /// Initialize the operator and its children.
    ///
    /// If opening fails, the operator closes whatever it already opened
    /// before returning the error.
    async fn open(&mut self, ctx: &ExecutionContext) -> FedraResult<()>;

    /// Whether a call to `next()` will return a row.
    async fn has_next(&mut self) -> FedraResult<bool>;

    /// Return the next row.
    async fn next(&mut self) -> FedraResult<Row>;

    /// Close the operator and its children.
    ///
    /// Every child is closed even when an earlier one fails; the first
    /// error is returned.
    async fn close(&mut self) -> FedraResult<()>;

    /// Pull the next row, or `None` once exhausted.
    async fn try_next(&mut self) -> FedraResult<Option<Row>> {
        if self.has_next().await? {
            self.next().await.map(Some)
        } else {
            Ok(None)
        }
    }

    /// Generate EXPLAIN output at given indentation level.
    fn explain(&self, indent: usize) -> String {
        let prefix = "  ".repeat(indent);
        let mut output = format!("{}{}\n", prefix, self.display());
        for child in self.children() {
            output.push_str(&child.explain(indent + 1));
        }
        output
    }

    /// Display string for EXPLAIN.
    fn display(&self) -> String {
        self.name().to_string()
    }
}

/// Boxed operator, the unit the converter and executor pass around.
pub type BoxedOperator = Box<dyn PhysicalOperator>;

/// Operator execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatorState {
    /// Operator created but not opened.
    #[default]
    Uninitialized,
    /// Operator opened and ready to produce rows.
    Open,
    /// Operator exhausted (no more rows).
    Exhausted,
    /// Operator closed.
    Closed,
}

impl OperatorState {
    /// Check if the operator can still produce rows.
    pub fn can_produce(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Check if the operator needs to be opened.
    pub fn needs_open(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }

    /// Check if the operator is finished.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Closed)
    }

    /// Fail unless the operator has never been opened.
    pub fn check_openable(&self, operator: &str) -> FedraResult<()> {
        match self {
            Self::Uninitialized => Ok(()),
            Self::Closed => Err(FedraError::usage(format!("{operator}: open() after close()"))),
            _ => Err(FedraError::usage(format!("{operator}: open() called twice"))),
        }
    }

    /// Fail unless the operator is open or exhausted.
    pub fn check_readable(&self, operator: &str) -> FedraResult<()> {
        match self {
            Self::Open | Self::Exhausted => Ok(()),
            Self::Uninitialized => Err(FedraError::usage(format!(
                "{operator}: read before open()"
            ))),
            Self::Closed => Err(FedraError::usage(format!("{operator}: read after close()"))),
        }
    }
}

/// Error for `next()` once an operator has no more rows.
pub(crate) fn exhausted(operator: &str) -> FedraError {
    FedraError::usage(format!("{operator}: next() called after the last row"))
}

/// Close every child, returning the first error.
pub(crate) async fn close_all(children: Vec<&mut BoxedOperator>) -> FedraResult<()> {
    let mut first = Ok(());
    for child in children {
        if let Err(e) = child.close().await {
            debug!("Closing {} failed: {}", child.name(), e);
            if first.is_ok() {
                first = Err(e);
            }
        }
    }
    first
}

/// Close `children` when `result` is an error, then return `result`.
pub(crate) async fn close_on_error<T>(
    result: FedraResult<T>,
    children: Vec<&mut BoxedOperator>,
) -> FedraResult<T> {
    if result.is_err() {
        let _ = close_all(children).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_state() {
        assert!(OperatorState::Uninitialized.needs_open());
        assert!(OperatorState::Open.can_produce());
        assert!(OperatorState::Exhausted.is_finished());
        assert!(OperatorState::Closed.is_finished());
    }

    #[test]
    fn test_lifecycle_checks() {
        assert!(OperatorState::Uninitialized.check_openable("X").is_ok());
        assert!(OperatorState::Open.check_openable("X").is_err());
        assert!(OperatorState::Exhausted.check_readable("X").is_ok());

        let err = OperatorState::Uninitialized.check_readable("FilterExec").unwrap_err();
        assert!(matches!(err, FedraError::UsageError(_)));
        assert!(err.to_string().contains("FilterExec"));
        assert!(OperatorState::Closed.check_readable("X").is_err());
    }
}
