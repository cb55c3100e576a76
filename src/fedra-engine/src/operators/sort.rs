//! Sort operator with OFFSET / FETCH.

use std::cmp::Ordering;
use std::collections::VecDeque;

use async_trait::async_trait;
use common_error::{FedraError, FedraResult};
use fedra_core::{Row, RowSchema, Value};
use fedra_logical::SortKey;

use crate::executor::ExecutionContext;
use crate::metrics::{ExecutionTimer, MetricsRecorder};
use crate::operators::traits::{
    BoxedOperator, OperatorState, PhysicalOperator, close_all, close_on_error, exhausted,
};

/// Compare two rows by `keys`.
///
/// Nulls sort last ascending and first descending; non-null values use the
/// total value order.
pub fn compare_rows(keys: &[SortKey], a: &[Value], b: &[Value]) -> Ordering {
    for key in keys {
        let (x, y) = (&a[key.column], &b[key.column]);
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => x.total_cmp(y),
        };
        let ord = if key.ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Blocking sort.
///
/// `open()` buffers the entire input, sorts it stably, then drops the first
/// `offset` rows and keeps at most `fetch`. Without keys the input order is
/// kept and only the limit applies.
#[derive(Debug)]
pub struct SortExec {
    input: BoxedOperator,
    keys: Vec<SortKey>,
    offset: usize,
    fetch: Option<usize>,
    buffer: VecDeque<Row>,
    state: OperatorState,
    recorder: MetricsRecorder,
}

impl SortExec {
    pub fn try_new(
        input: BoxedOperator,
        keys: Vec<SortKey>,
        offset: usize,
        fetch: Option<usize>,
    ) -> FedraResult<Self> {
        let width = input.schema().len();
        if let Some(key) = keys.iter().find(|k| k.column >= width) {
            return Err(FedraError::planning(format!(
                "sort key {key} out of range for {width} columns"
            )));
        }
        Ok(Self {
            input,
            keys,
            offset,
            fetch,
            buffer: VecDeque::new(),
            state: OperatorState::Uninitialized,
            recorder: MetricsRecorder::default(),
        })
    }

    async fn consume(&mut self, ctx: &ExecutionContext) -> FedraResult<()> {
        let budget = ctx.budget();
        let mut rows = Vec::new();
        while let Some(row) = self.input.try_next().await? {
            rows.push(row);
            budget.check(self.name(), rows.len())?;
        }
        self.recorder.metrics_mut().add_rows_in(rows.len());
        self.recorder.metrics_mut().update_peak_rows(rows.len());

        if !self.keys.is_empty() {
            rows.sort_by(|a, b| compare_rows(&self.keys, a.values(), b.values()));
        }
        let take = self.fetch.unwrap_or(usize::MAX);
        self.buffer = rows.into_iter().skip(self.offset).take(take).collect();
        Ok(())
    }
}

#[async_trait]
impl PhysicalOperator for SortExec {
    fn name(&self) -> &'static str {
        "SortExec"
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

        let timer = ExecutionTimer::start();
        let opened = self.input.open(ctx).await;
        close_on_error(opened, vec![&mut self.input]).await?;
        let consumed = self.consume(ctx).await;
        self.recorder.metrics_mut().add_time(timer.stop());
        close_on_error(consumed, vec![&mut self.input]).await
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
        close_all(vec![&mut self.input]).await
    }

    fn display(&self) -> String {
        let keys: Vec<String> = self.keys.iter().map(ToString::to_string).collect();
        let mut out = format!("SortExec([{}]", keys.join(", "));
        if self.offset > 0 {
            out.push_str(&format!(", offset={}", self.offset));
        }
        if let Some(fetch) = self.fetch {
            out.push_str(&format!(", fetch={fetch}"));
        }
        out.push(')');
        out
    }
}
