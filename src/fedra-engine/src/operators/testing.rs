//! Operator test helpers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common_error::{FedraError, FedraResult};
use fedra_core::{Row, RowSchema, Value};

use super::{BoxedOperator, PhysicalOperator, ValuesExec};
use crate::executor::ExecutionContext;

/// Integer rows under the given column names.
pub(crate) fn int_rows(columns: &[&str], rows: &[&[i64]]) -> BoxedOperator {
    let rows = rows
        .iter()
        .map(|r| r.iter().copied().map(Value::Int64).collect())
        .collect();
    Box::new(ValuesExec::from_values(columns.iter().copied(), rows).unwrap())
}

/// Open, pull every row, close.
pub(crate) async fn drain(op: &mut dyn PhysicalOperator) -> FedraResult<Vec<Row>> {
    op.open(&ExecutionContext::local()).await?;
    let mut rows = Vec::new();
    while let Some(row) = op.try_next().await? {
        rows.push(row);
    }
    op.close().await?;
    Ok(rows)
}

/// Wraps an operator, recording whether it was closed and optionally
/// failing on open.
#[derive(Debug)]
pub(crate) struct ProbeExec {
    inner: BoxedOperator,
    closed: Arc<AtomicBool>,
    fail_open: bool,
}

impl ProbeExec {
    pub(crate) fn new(inner: BoxedOperator) -> (Self, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        let probe = Self {
            inner,
            closed: Arc::clone(&closed),
            fail_open: false,
        };
        (probe, closed)
    }

    pub(crate) fn failing(inner: BoxedOperator) -> (Self, Arc<AtomicBool>) {
        let (mut probe, closed) = Self::new(inner);
        probe.fail_open = true;
        (probe, closed)
    }
}

#[async_trait]
impl PhysicalOperator for ProbeExec {
    fn name(&self) -> &'static str {
        "ProbeExec"
    }

    fn schema(&self) -> &RowSchema {
        self.inner.schema()
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.inner.as_ref()]
    }

    async fn open(&mut self, ctx: &ExecutionContext) -> FedraResult<()> {
        if self.fail_open {
            return Err(FedraError::remote("probe", "open failed"));
        }
        self.inner.open(ctx).await
    }

    async fn has_next(&mut self) -> FedraResult<bool> {
        self.inner.has_next().await
    }

    async fn next(&mut self) -> FedraResult<Row> {
        self.inner.next().await
    }

    async fn close(&mut self) -> FedraResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.inner.close().await
    }
}
