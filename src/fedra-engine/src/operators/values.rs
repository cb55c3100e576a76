//! Operator producing a fixed list of rows.

use std::collections::VecDeque;

use async_trait::async_trait;
use common_error::FedraResult;
use fedra_core::{Row, RowSchema, Value};

use crate::executor::ExecutionContext;
use crate::metrics::MetricsRecorder;
use crate::operators::traits::{OperatorState, PhysicalOperator, exhausted};

/// Leaf operator over rows already in memory.
///
/// Used for results computed by an earlier stage and for constant inputs.
#[derive(Debug)]
pub struct ValuesExec {
    schema: RowSchema,
    rows: VecDeque<Row>,
    state: OperatorState,
    recorder: MetricsRecorder,
}

impl ValuesExec {
    /// Rows are relabeled with `schema`; a row of a different width is rejected.
    pub fn try_new(schema: RowSchema, rows: Vec<Row>) -> FedraResult<Self> {
        let rows = rows
            .into_iter()
            .map(|r| Row::try_new(schema.clone(), r.into_values()))
            .collect::<FedraResult<VecDeque<_>>>()?;
        Ok(Self::with_rows(schema, rows))
    }

    /// Build rows from raw values under the given column names.
    pub fn from_values<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> FedraResult<Self> {
        let schema = RowSchema::new(columns);
        let rows = rows
            .into_iter()
            .map(|values| Row::try_new(schema.clone(), values))
            .collect::<FedraResult<VecDeque<_>>>()?;
        Ok(Self::with_rows(schema, rows))
    }

    fn with_rows(schema: RowSchema, rows: VecDeque<Row>) -> Self {
        Self {
            schema,
            rows,
            state: OperatorState::Uninitialized,
            recorder: MetricsRecorder::default(),
        }
    }
}

#[async_trait]
impl PhysicalOperator for ValuesExec {
    fn name(&self) -> &'static str {
        "ValuesExec"
    }

    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![]
    }

    async fn open(&mut self, ctx: &ExecutionContext) -> FedraResult<()> {
        self.state.check_openable(self.name())?;
        self.recorder.attach(ctx, self.name());
        self.state = OperatorState::Open;
        Ok(())
    }

    async fn has_next(&mut self) -> FedraResult<bool> {
        self.state.check_readable(self.name())?;
        if self.rows.is_empty() {
            self.state = OperatorState::Exhausted;
        }
        Ok(!self.rows.is_empty())
    }

    async fn next(&mut self) -> FedraResult<Row> {
        self.state.check_readable(self.name())?;
        let row = self.rows.pop_front().ok_or_else(|| exhausted(self.name()))?;
        self.recorder.metrics_mut().add_rows_out(1);
        Ok(row)
    }

    async fn close(&mut self) -> FedraResult<()> {
        if self.state != OperatorState::Closed {
            self.rows.clear();
            self.recorder.flush();
            self.state = OperatorState::Closed;
        }
        Ok(())
    }

    fn display(&self) -> String {
        format!("ValuesExec(rows={})", self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_error::FedraError;

    #[tokio::test]
    async fn test_values_lifecycle() {
        let mut op =
            ValuesExec::from_values(["a"], vec![vec![Value::Int64(1)], vec![Value::Int64(2)]])
                .unwrap();
        assert!(op.has_next().await.is_err());

        op.open(&ExecutionContext::local()).await.unwrap();
        assert_eq!(op.next().await.unwrap().get(0), Some(&Value::Int64(1)));
        assert!(op.has_next().await.unwrap());
        assert_eq!(op.next().await.unwrap().get(0), Some(&Value::Int64(2)));
        assert!(!op.has_next().await.unwrap());
        assert!(matches!(
            op.next().await,
            Err(FedraError::UsageError(_))
        ));

        op.close().await.unwrap();
        op.close().await.unwrap();
        assert!(op.has_next().await.is_err());
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let schema = RowSchema::new(["a", "b"]);
        let row = Row::from_columns(["a"], vec![Value::Int64(1)]).unwrap();
        assert!(ValuesExec::try_new(schema, vec![row]).is_err());
    }
}
