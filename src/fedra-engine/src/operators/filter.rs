//! Filter operator.

use async_trait::async_trait;
use common_error::FedraResult;
use fedra_core::{Row, RowSchema};
use fedra_logical::LogicalExpr;

use crate::executor::ExecutionContext;
use crate::expr::RowPredicate;
use crate::metrics::MetricsRecorder;
use crate::operators::traits::{
    BoxedOperator, OperatorState, PhysicalOperator, close_all, close_on_error, exhausted,
};

/// Filter operator.
///
/// Keeps one qualifying row ready at all times: after `open()` and after
/// every `next()` it advances the input until a row satisfies the
/// predicate or the input runs out, so `has_next()` never pulls.
#[derive(Debug)]
pub struct FilterExec {
    input: BoxedOperator,
    predicate: RowPredicate,
    condition: LogicalExpr,
    pending: Option<Row>,
    state: OperatorState,
    recorder: MetricsRecorder,
}

impl FilterExec {
    /// Compile `condition` against the input's columns.
    pub fn try_new(input: BoxedOperator, condition: LogicalExpr) -> FedraResult<Self> {
        let predicate = RowPredicate::compile(&condition, input.schema().len())?;
        Ok(Self {
            input,
            predicate,
            condition,
            pending: None,
            state: OperatorState::Uninitialized,
            recorder: MetricsRecorder::default(),
        })
    }

    pub fn condition(&self) -> &LogicalExpr {
        &self.condition
    }

    async fn advance(&mut self) -> FedraResult<()> {
        while let Some(row) = self.input.try_next().await? {
            self.recorder.metrics_mut().add_rows_in(1);
            if self.predicate.test(&row)? {
                self.pending = Some(row);
                return Ok(());
            }
        }
        self.pending = None;
        self.state = OperatorState::Exhausted;
        Ok(())
    }
}

#[async_trait]
impl PhysicalOperator for FilterExec {
    fn name(&self) -> &'static str {
        "FilterExec"
    }

    fn schema(&self) -> &RowSchema {
        self.input.schema()
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.input.as_ref()]
    }

    async fn open(&mut self, ctx: &ExecutionContext) -> FedraResult<()> {
        self.state.check_openable(self.name())?;
        self.recorder.attach(ctx, self.name());
        self.state = OperatorState::Open;

        let opened = self.input.open(ctx).await;
        close_on_error(opened, vec![&mut self.input]).await?;
        let advanced = self.advance().await;
        close_on_error(advanced, vec![&mut self.input]).await
    }

    async fn has_next(&mut self) -> FedraResult<bool> {
        self.state.check_readable(self.name())?;
        Ok(self.pending.is_some())
    }

    async fn next(&mut self) -> FedraResult<Row> {
        self.state.check_readable(self.name())?;
        let row = self.pending.take().ok_or_else(|| exhausted(self.name()))?;
        self.advance().await?;
        self.recorder.metrics_mut().add_rows_out(1);
        Ok(row)
    }

    async fn close(&mut self) -> FedraResult<()> {
        if self.state == OperatorState::Closed {
            return Ok(());
        }
        self.state = OperatorState::Closed;
        self.pending = None;
        self.recorder.flush();
        close_all(vec![&mut self.input]).await
    }

    fn display(&self) -> String {
        format!("FilterExec({})", self.condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::testing::{ProbeExec, drain, int_rows};
    use common_error::FedraError;
    use fedra_core::Value;
    use fedra_logical::{col, lit};

    #[tokio::test]
    async fn test_filter_keeps_matching_rows() {
        let input = int_rows(&["x"], &[&[1], &[5], &[7], &[2]]);
        let mut filter = FilterExec::try_new(input, col(0).gt(lit(3i64))).unwrap();

        let rows = drain(&mut filter).await.unwrap();
        let values: Vec<&Value> = rows.iter().map(|r| &r.values()[0]).collect();
        assert_eq!(values, vec![&Value::Int64(5), &Value::Int64(7)]);
    }

    #[tokio::test]
    async fn test_has_next_is_precomputed() {
        let input = int_rows(&["x"], &[&[1], &[2]]);
        let mut filter = FilterExec::try_new(input, col(0).gt(lit(10i64))).unwrap();
        filter.open(&ExecutionContext::local()).await.unwrap();

        assert!(!filter.has_next().await.unwrap());
        assert!(matches!(filter.next().await, Err(FedraError::UsageError(_))));
        filter.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_next_before_open_is_usage_error() {
        let mut filter =
            FilterExec::try_new(int_rows(&["x"], &[&[1]]), col(0).is_not_null()).unwrap();
        assert!(matches!(filter.next().await, Err(FedraError::UsageError(_))));
        // closing a never-opened operator is fine
        filter.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_predicate_error_closes_input() {
        let (probe, closed) = ProbeExec::new(int_rows(&["x"], &[&[1]]));
        let mut filter = FilterExec::try_new(Box::new(probe), col(0).eq(lit("a"))).unwrap();

        let err = filter.open(&ExecutionContext::local()).await.unwrap_err();
        assert!(matches!(err, FedraError::TypeError(_)));
        assert!(closed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_condition_checked_against_input_width() {
        let err = FilterExec::try_new(int_rows(&["x"], &[]), col(2).is_null()).unwrap_err();
        assert!(matches!(err, FedraError::PlanningError(_)));
    }
}
