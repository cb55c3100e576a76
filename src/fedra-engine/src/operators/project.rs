//! Project operator.

use async_trait::async_trait;
use common_error::{FedraError, FedraResult};
use fedra_core::{Row, RowSchema};
use fedra_logical::LogicalExpr;

use crate::executor::ExecutionContext;
use crate::expr::ProjectionFn;
use crate::metrics::MetricsRecorder;
use crate::operators::traits::{
    BoxedOperator, OperatorState, PhysicalOperator, close_all, close_on_error, exhausted,
};

/// Project operator: one output value per expression, per input row.
#[derive(Debug)]
pub struct ProjectExec {
    input: BoxedOperator,
    functions: Vec<ProjectionFn>,
    exprs: Vec<LogicalExpr>,
    schema: RowSchema,
    state: OperatorState,
    recorder: MetricsRecorder,
}

impl ProjectExec {
    /// Compile `exprs` against the input's columns; `names` labels the output.
    pub fn try_new(
        input: BoxedOperator,
        exprs: Vec<LogicalExpr>,
        names: Vec<String>,
    ) -> FedraResult<Self> {
        if exprs.len() != names.len() {
            return Err(FedraError::invalid_parameter(format!(
                "{} projection expressions but {} names",
                exprs.len(),
                names.len()
            )));
        }
        let width = input.schema().len();
        let functions = exprs
            .iter()
            .map(|e| ProjectionFn::compile(e, width))
            .collect::<FedraResult<Vec<_>>>()?;
        Ok(Self {
            input,
            functions,
            exprs,
            schema: RowSchema::from(names),
            state: OperatorState::Uninitialized,
            recorder: MetricsRecorder::default(),
        })
    }
}

#[async_trait]
impl PhysicalOperator for ProjectExec {
    fn name(&self) -> &'static str {
        "ProjectExec"
    }

    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.input.as_ref()]
    }

    async fn open(&mut self, ctx: &ExecutionContext) -> FedraResult<()> {
        self.state.check_openable(self.name())?;
        self.recorder.attach(ctx, self.name());
        self.state = OperatorState::Open;
        let opened = self.input.open(ctx).await;
        close_on_error(opened, vec![&mut self.input]).await
    }

    async fn has_next(&mut self) -> FedraResult<bool> {
        self.state.check_readable(self.name())?;
        let more = self.input.has_next().await?;
        if !more {
            self.state = OperatorState::Exhausted;
        }
        Ok(more)
    }

    async fn next(&mut self) -> FedraResult<Row> {
        if !self.has_next().await? {
            return Err(exhausted(self.name()));
        }
        let row = self.input.next().await?;
        let values = self
            .functions
            .iter()
            .map(|f| f.apply(&row))
            .collect::<FedraResult<Vec<_>>>()?;
        self.recorder.metrics_mut().add_rows_in(1);
        self.recorder.metrics_mut().add_rows_out(1);
        Row::try_new(self.schema.clone(), values)
    }

    async fn close(&mut self) -> FedraResult<()> {
        if self.state == OperatorState::Closed {
            return Ok(());
        }
        self.state = OperatorState::Closed;
        self.recorder.flush();
        close_all(vec![&mut self.input]).await
    }

    fn display(&self) -> String {
        let cols: Vec<String> = self
            .exprs
            .iter()
            .zip(self.schema.names())
            .map(|(e, n)| format!("{n}={e}"))
            .collect();
        format!("ProjectExec({})", cols.join(", "))
    }
}
