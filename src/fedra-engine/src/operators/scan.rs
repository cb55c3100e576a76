//! Table scan against a remote data source.

use std::collections::VecDeque;

use async_trait::async_trait;
use common_error::{FedraError, FedraResult};
use fedra_core::{Row, RowSchema};
use log::debug;

use crate::connector::{Connection, RemoteQuery};
use crate::executor::ExecutionContext;
use crate::metrics::{ExecutionTimer, MetricsRecorder};
use crate::operators::traits::{OperatorState, PhysicalOperator, exhausted};

/// Leaf operator issuing one [`RemoteQuery`] to one data source.
///
/// `open()` connects, runs the query and buffers every returned row; the
/// connection stays owned by the scan until `close()`.
pub struct TableScanExec {
    data_source_id: String,
    query: RemoteQuery,
    schema: RowSchema,
    connection: Option<Box<dyn Connection>>,
    buffer: VecDeque<Row>,
    state: OperatorState,
    recorder: MetricsRecorder,
}

impl std::fmt::Debug for TableScanExec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableScanExec")
            .field("data_source_id", &self.data_source_id)
            .field("query", &self.query)
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl TableScanExec {
    /// Scan returning the query's own column names.
    pub fn new(data_source_id: impl Into<String>, query: RemoteQuery) -> Self {
        let schema = RowSchema::new(query.output_columns());
        Self::with_schema(data_source_id, query, schema)
    }

    /// Scan relabeling the returned columns with `schema`.
    pub fn with_schema(
        data_source_id: impl Into<String>,
        query: RemoteQuery,
        schema: RowSchema,
    ) -> Self {
        Self {
            data_source_id: data_source_id.into(),
            query,
            schema,
            connection: None,
            buffer: VecDeque::new(),
            state: OperatorState::Uninitialized,
            recorder: MetricsRecorder::default(),
        }
    }

    pub fn data_source_id(&self) -> &str {
        &self.data_source_id
    }

    pub fn query(&self) -> &RemoteQuery {
        &self.query
    }

    async fn fetch(&mut self, ctx: &ExecutionContext) -> FedraResult<()> {
        let sql = self.query.sql()?;
        let connection = ctx.connectors().connect(&self.data_source_id).await?;
        debug!("Issuing query on '{}': {}", self.data_source_id, sql);
        let result = connection.execute_query(&self.query).await;
        self.connection = Some(connection);

        let result = result?;
        if let Some(error) = result.error() {
            return Err(FedraError::remote(&self.data_source_id, remote_message(error)));
        }

        for row in result.into_rows() {
            self.buffer
                .push_back(Row::try_new(self.schema.clone(), row.into_values())?);
        }
        Ok(())
    }
}

fn remote_message(error: &FedraError) -> String {
    match error {
        FedraError::RemoteExecution { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl PhysicalOperator for TableScanExec {
    fn name(&self) -> &'static str {
        "TableScanExec"
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

        let timer = ExecutionTimer::start();
        let fetched = self.fetch(ctx).await;
        self.recorder.metrics_mut().add_time(timer.stop());
        if fetched.is_err() {
            self.buffer.clear();
            if let Some(connection) = self.connection.take() {
                let _ = connection.close().await;
            }
        }
        let rows = self.buffer.len();
        self.recorder.metrics_mut().add_rows_in(rows);
        self.recorder.metrics_mut().update_peak_rows(rows);
        fetched
    }

    async fn has_next(&mut self) -> FedraResult<bool> {
        self.state.check_readable(self.name())?;
        if self.buffer.is_empty() {
            self.state = OperatorState::Exhausted;
        }
        Ok(!self.buffer.is_empty())
    }

    async fn next(&mut self) -> FedraResult<Row> {
        self.state.check_readable(self.name())?;
        let row = self.buffer.pop_front().ok_or_else(|| exhausted(self.name()))?;
        self.recorder.metrics_mut().add_rows_out(1);
        Ok(row)
    }

    async fn close(&mut self) -> FedraResult<()> {
        if self.state == OperatorState::Closed {
            return Ok(());
        }
        self.state = OperatorState::Closed;
        self.buffer.clear();
        self.recorder.flush();
        match self.connection.take() {
            Some(connection) => connection.close().await,
            None => Ok(()),
        }
    }

    fn display(&self) -> String {
        format!("TableScanExec({}: {})", self.data_source_id, self.query)
    }
}
