//! Hash join operator.

use std::collections::HashMap;

use async_trait::async_trait;
use common_error::{FedraError, FedraResult};
use fedra_core::{CompositeKey, Row, RowSchema};
use fedra_logical::LogicalExpr;
use log::debug;

use crate::executor::ExecutionContext;
use crate::expr::{KeyExtractor, RowPredicate};
use crate::metrics::{ExecutionTimer, MetricsRecorder};
use crate::operators::traits::{
    BoxedOperator, OperatorState, PhysicalOperator, close_all, close_on_error, exhausted,
};

/// Position within the build rows matching one probe row.
#[derive(Debug)]
struct ProbeCursor {
    probe: Row,
    key: CompositeKey,
    index: usize,
}

/// Inner hash join.
///
/// The left input is the build side: `open()` drains it into a hash table
/// keyed on the left join columns, then opens the right input. Rows are
/// produced lazily while probing, left columns first. A build or probe key
/// containing a null never matches. Without key pairs every row lands in
/// the same bucket and the join degrades to a filtered cross product.
#[derive(Debug)]
pub struct HashJoinExec {
    left: BoxedOperator,
    right: BoxedOperator,
    left_keys: KeyExtractor,
    right_keys: KeyExtractor,
    residual: Option<RowPredicate>,
    condition: Option<LogicalExpr>,
    schema: RowSchema,
    table: HashMap<CompositeKey, Vec<Row>>,
    cursor: Option<ProbeCursor>,
    pending: Option<Row>,
    state: OperatorState,
    recorder: MetricsRecorder,
}

impl HashJoinExec {
    /// `keys` pairs a left column with a right column (right-relative);
    /// `residual` is evaluated over the merged row.
    pub fn try_new(
        left: BoxedOperator,
        right: BoxedOperator,
        keys: Vec<(usize, usize)>,
        residual: Option<LogicalExpr>,
    ) -> FedraResult<Self> {
        let schema = left.schema().merge(right.schema());
        let (left_cols, right_cols): (Vec<usize>, Vec<usize>) = keys.into_iter().unzip();
        for &c in &left_cols {
            check_column("left", c, left.schema().len())?;
        }
        for &c in &right_cols {
            check_column("right", c, right.schema().len())?;
        }
        let predicate = residual
            .as_ref()
            .map(|r| RowPredicate::compile(r, schema.len()))
            .transpose()?;
        Ok(Self {
            left,
            right,
            left_keys: KeyExtractor::new(left_cols),
            right_keys: KeyExtractor::new(right_cols),
            residual: predicate,
            condition: residual,
            schema,
            table: HashMap::new(),
            cursor: None,
            pending: None,
            state: OperatorState::Uninitialized,
            recorder: MetricsRecorder::default(),
        })
    }

    async fn build(&mut self, ctx: &ExecutionContext) -> FedraResult<()> {
        let budget = ctx.budget();
        let mut rows = 0usize;
        while let Some(row) = self.left.try_next().await? {
            rows += 1;
            budget.check(self.name(), rows)?;
            let key = self.left_keys.extract(&row);
            if key.has_null() {
                continue;
            }
            self.table.entry(key).or_default().push(row);
        }
        debug!(
            "{} built {} buckets from {} rows",
            self.name(),
            self.table.len(),
            rows
        );
        self.recorder.metrics_mut().add_rows_in(rows);
        self.recorder.metrics_mut().update_peak_rows(rows);
        Ok(())
    }

    /// Find the next joined row, pulling probe rows as needed.
    async fn advance(&mut self) -> FedraResult<()> {
        loop {
            if let Some(cursor) = self.cursor.as_mut() {
                let bucket = self.table.get(&cursor.key).map(Vec::as_slice).unwrap_or(&[]);
                while let Some(build) = bucket.get(cursor.index) {
                    cursor.index += 1;
                    let joined = Row::merge_with_schema(build, &cursor.probe, &self.schema)?;
                    let keep = match &self.residual {
                        Some(predicate) => predicate.test(&joined)?,
                        None => true,
                    };
                    if keep {
                        self.pending = Some(joined);
                        return Ok(());
                    }
                }
                self.cursor = None;
            }

            let Some(probe) = self.right.try_next().await? else {
                self.pending = None;
                self.state = OperatorState::Exhausted;
                return Ok(());
            };
            self.recorder.metrics_mut().add_rows_in(1);
            let key = self.right_keys.extract(&probe);
            if key.has_null() || !self.table.contains_key(&key) {
                continue;
            }
            self.cursor = Some(ProbeCursor {
                probe,
                key,
                index: 0,
            });
        }
    }
}

fn check_column(side: &str, column: usize, width: usize) -> FedraResult<()> {
    if column < width {
        Ok(())
    } else {
        Err(FedraError::planning(format!(
            "{side} join key ${column} out of range for {width} columns"
        )))
    }
}

#[async_trait]
impl PhysicalOperator for HashJoinExec {
    fn name(&self) -> &'static str {
        "HashJoinExec"
    }

    fn schema(&self) -> &RowSchema {
        &self.schema
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.left.as_ref(), self.right.as_ref()]
    }

    async fn open(&mut self, ctx: &ExecutionContext) -> FedraResult<()> {
        self.state.check_openable(self.name())?;
        self.recorder.attach(ctx, self.name());
        self.state = OperatorState::Open;

        let timer = ExecutionTimer::start();
        let opened = self.left.open(ctx).await;
        close_on_error(opened, vec![&mut self.left]).await?;
        let built = self.build(ctx).await;
        if built.is_err() {
            self.table.clear();
        }
        close_on_error(built, vec![&mut self.left]).await?;

        let opened = self.right.open(ctx).await;
        close_on_error(opened, vec![&mut self.left, &mut self.right]).await?;
        let advanced = self.advance().await;
        self.recorder.metrics_mut().add_time(timer.stop());
        close_on_error(advanced, vec![&mut self.left, &mut self.right]).await
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
        self.table.clear();
        self.cursor = None;
        self.pending = None;
        self.recorder.flush();
        close_all(vec![&mut self.left, &mut self.right]).await
    }

    fn display(&self) -> String {
        let keys: Vec<String> = self
            .left_keys
            .columns()
            .iter()
            .zip(self.right_keys.columns())
            .map(|(l, r)| format!("${l}=${r}"))
            .collect();
        match &self.condition {
            Some(residual) => format!("HashJoinExec(keys=[{}], residual={residual})", keys.join(", ")),
            None => format!("HashJoinExec(keys=[{}])", keys.join(", ")),
        }
    }
}
