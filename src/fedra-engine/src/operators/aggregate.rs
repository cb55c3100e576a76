//! Hash aggregate operator and its accumulators.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;

use async_trait::async_trait;
use common_error::{FedraError, FedraResult};
use fedra_core::{CompositeKey, Row, RowSchema, Value};
use fedra_logical::{AggCall, AggFunc};

use crate::executor::ExecutionContext;
use crate::expr::KeyExtractor;
use crate::metrics::{ExecutionTimer, MetricsRecorder};
use crate::operators::traits::{
    BoxedOperator, OperatorState, PhysicalOperator, close_all, close_on_error, exhausted,
};

/// Running state of one aggregate call within one group.
pub trait Accumulator: Send + Debug {
    /// Fold one input row's argument value.
    fn update(&mut self, value: &Value) -> FedraResult<()>;

    /// Final value of the aggregate.
    fn finish(&self) -> Value;
}

/// Counts rows.
#[derive(Debug, Default)]
pub struct CountAccumulator {
    count: i64,
}

impl Accumulator for CountAccumulator {
    fn update(&mut self, _value: &Value) -> FedraResult<()> {
        self.count += 1;
        Ok(())
    }

    fn finish(&self) -> Value {
        Value::Int64(self.count)
    }
}

/// Sum of non-null values. Integer until a float appears; null when no value was seen.
#[derive(Debug, Default)]
pub struct SumAccumulator {
    sum: Option<Value>,
}

impl Accumulator for SumAccumulator {
    fn update(&mut self, value: &Value) -> FedraResult<()> {
        let next = match (&self.sum, value) {
            (_, Value::Null) => return Ok(()),
            (None, Value::Int64(v)) => Value::Int64(*v),
            (Some(Value::Int64(acc)), Value::Int64(v)) => acc
                .checked_add(*v)
                .map(Value::Int64)
                .ok_or_else(|| FedraError::execution("SUM overflowed a 64-bit integer"))?,
            (acc, v) => {
                let v = numeric("SUM", v)?;
                let acc = acc.as_ref().and_then(Value::as_float64).unwrap_or(0.0);
                Value::Float64(acc + v)
            }
        };
        self.sum = Some(next);
        Ok(())
    }

    fn finish(&self) -> Value {
        self.sum.clone().unwrap_or(Value::Null)
    }
}

/// Mean of non-null values as a float.
#[derive(Debug, Default)]
pub struct AvgAccumulator {
    sum: f64,
    count: u64,
}

impl Accumulator for AvgAccumulator {
    fn update(&mut self, value: &Value) -> FedraResult<()> {
        if value.is_null() {
            return Ok(());
        }
        self.sum += numeric("AVG", value)?;
        self.count += 1;
        Ok(())
    }

    fn finish(&self) -> Value {
        if self.count == 0 {
            Value::Null
        } else {
            Value::Float64(self.sum / self.count as f64)
        }
    }
}

/// Minimum or maximum of non-null values.
#[derive(Debug)]
pub struct ExtremumAccumulator {
    keep: Ordering,
    current: Option<Value>,
}

impl ExtremumAccumulator {
    pub fn min() -> Self {
        Self {
            keep: Ordering::Less,
            current: None,
        }
    }

    pub fn max() -> Self {
        Self {
            keep: Ordering::Greater,
            current: None,
        }
    }
}

impl Accumulator for ExtremumAccumulator {
    fn update(&mut self, value: &Value) -> FedraResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let replace = match &self.current {
            None => true,
            Some(current) => value.total_cmp(current) == self.keep,
        };
        if replace {
            self.current = Some(value.clone());
        }
        Ok(())
    }

    fn finish(&self) -> Value {
        self.current.clone().unwrap_or(Value::Null)
    }
}

fn numeric(func: &str, value: &Value) -> FedraResult<f64> {
    value.as_float64().ok_or_else(|| {
        FedraError::type_error(format!("{func} over a {} value", value.type_name()))
    })
}

/// Create a fresh accumulator for an aggregate function.
pub fn create_accumulator(func: AggFunc) -> Box<dyn Accumulator> {
    match func {
        AggFunc::Count => Box::new(CountAccumulator::default()),
        AggFunc::Sum => Box::new(SumAccumulator::default()),
        AggFunc::Avg => Box::new(AvgAccumulator::default()),
        AggFunc::Min => Box::new(ExtremumAccumulator::min()),
        AggFunc::Max => Box::new(ExtremumAccumulator::max()),
    }
}

#[derive(Debug)]
struct GroupState {
    key_values: Vec<Value>,
    accumulators: Vec<Box<dyn Accumulator>>,
}

/// Hash aggregation.
///
/// `open()` consumes the whole input. Groups are emitted in the order
/// their first row arrived; rows whose group columns are null form their
/// own group. Without group columns exactly one row is produced, even for
/// empty input.
#[derive(Debug)]
pub struct HashAggregateExec {
    input: BoxedOperator,
    group_keys: KeyExtractor,
    aggs: Vec<AggCall>,
    schema: RowSchema,
    output: VecDeque<Row>,
    state: OperatorState,
    recorder: MetricsRecorder,
}

impl HashAggregateExec {
    pub fn try_new(
        input: BoxedOperator,
        group_by: Vec<usize>,
        aggs: Vec<AggCall>,
    ) -> FedraResult<Self> {
        let width = input.schema().len();
        let mut names = Vec::with_capacity(group_by.len() + aggs.len());
        for &g in &group_by {
            let name = input.schema().names().get(g).ok_or_else(|| {
                FedraError::planning(format!("group column ${g} out of range for {width} columns"))
            })?;
            names.push(name.clone());
        }
        for agg in &aggs {
            match (agg.func, agg.arg) {
                (_, Some(arg)) if arg >= width => {
                    return Err(FedraError::planning(format!(
                        "{agg}: argument out of range for {width} columns"
                    )));
                }
                (AggFunc::Count, _) | (_, Some(_)) => {}
                (_, None) => {
                    return Err(FedraError::invalid_parameter(format!(
                        "{} requires an argument",
                        agg.func
                    )));
                }
            }
            names.push(agg.name.clone());
        }
        Ok(Self {
            input,
            group_keys: KeyExtractor::new(group_by),
            aggs,
            schema: RowSchema::from(names),
            output: VecDeque::new(),
            state: OperatorState::Uninitialized,
            recorder: MetricsRecorder::default(),
        })
    }

    fn new_group(&self, row: Option<&Row>) -> GroupState {
        let key_values = match row {
            Some(row) => self
                .group_keys
                .columns()
                .iter()
                .map(|&c| row.values()[c].clone())
                .collect(),
            None => Vec::new(),
        };
        GroupState {
            key_values,
            accumulators: self.aggs.iter().map(|a| create_accumulator(a.func)).collect(),
        }
    }

    async fn consume(&mut self, ctx: &ExecutionContext) -> FedraResult<()> {
        let budget = ctx.budget();
        let mut index: HashMap<CompositeKey, usize> = HashMap::new();
        let mut groups: Vec<GroupState> = Vec::new();
        let mut rows = 0usize;

        while let Some(row) = self.input.try_next().await? {
            rows += 1;
            let key = self.group_keys.extract(&row);
            let slot = match index.get(&key) {
                Some(&slot) => slot,
                None => {
                    budget.check(self.name(), groups.len() + 1)?;
                    groups.push(self.new_group(Some(&row)));
                    index.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };
            let group = &mut groups[slot];
            for (acc, call) in group.accumulators.iter_mut().zip(&self.aggs) {
                match call.arg {
                    Some(arg) if call.func != AggFunc::Count => acc.update(&row.values()[arg])?,
                    _ => acc.update(&Value::Null)?,
                }
            }
        }

        if groups.is_empty() && self.group_keys.columns().is_empty() {
            groups.push(self.new_group(None));
        }

        self.recorder.metrics_mut().add_rows_in(rows);
        self.recorder.metrics_mut().update_peak_rows(groups.len());
        for group in groups {
            let mut values = group.key_values;
            values.extend(group.accumulators.iter().map(|a| a.finish()));
            self.output.push_back(Row::try_new(self.schema.clone(), values)?);
        }
        Ok(())
    }
}

#[async_trait]
impl PhysicalOperator for HashAggregateExec {
    fn name(&self) -> &'static str {
        "HashAggregateExec"
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

        let timer = ExecutionTimer::start();
        let opened = self.input.open(ctx).await;
        close_on_error(opened, vec![&mut self.input]).await?;
        let consumed = self.consume(ctx).await;
        self.recorder.metrics_mut().add_time(timer.stop());
        if consumed.is_err() {
            self.output.clear();
        }
        close_on_error(consumed, vec![&mut self.input]).await
    }

    async fn has_next(&mut self) -> FedraResult<bool> {
        self.state.check_readable(self.name())?;
        if self.output.is_empty() {
            self.state = OperatorState::Exhausted;
        }
        Ok(!self.output.is_empty())
    }

    async fn next(&mut self) -> FedraResult<Row> {
        self.state.check_readable(self.name())?;
        let row = self.output.pop_front().ok_or_else(|| exhausted(self.name()))?;
        self.recorder.metrics_mut().add_rows_out(1);
        Ok(row)
    }

    async fn close(&mut self) -> FedraResult<()> {
        if self.state == OperatorState::Closed {
            return Ok(());
        }
        self.state = OperatorState::Closed;
        self.output.clear();
        self.recorder.flush();
        close_all(vec![&mut self.input]).await
    }

    fn display(&self) -> String {
        let aggs: Vec<String> = self.aggs.iter().map(ToString::to_string).collect();
        let groups: Vec<String> = self
            .group_keys
            .columns()
            .iter()
            .map(|g| format!("${g}"))
            .collect();
        format!(
            "HashAggregateExec(group=[{}], aggs=[{}])",
            groups.join(", "),
            aggs.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RuntimeConfig;
    use crate::operators::ValuesExec;
    use crate::operators::testing::{drain, int_rows};

    #[test]
    fn test_sum_promotes_to_float() {
        let mut sum = SumAccumulator::default();
        assert_eq!(sum.finish(), Value::Null);
        sum.update(&Value::Int64(2)).unwrap();
        sum.update(&Value::Null).unwrap();
        assert_eq!(sum.finish(), Value::Int64(2));
        sum.update(&Value::Float64(0.5)).unwrap();
        assert_eq!(sum.finish(), Value::Float64(2.5));
    }

    #[test]
    fn test_sum_overflow_is_error() {
        let mut sum = SumAccumulator::default();
        sum.update(&Value::Int64(i64::MAX)).unwrap();
        assert!(sum.update(&Value::Int64(1)).is_err());
    }

    #[test]
    fn test_min_max_skip_nulls() {
        let mut min = ExtremumAccumulator::min();
        let mut max = ExtremumAccumulator::max();
        for v in [Value::Int64(3), Value::Null, Value::Float64(-1.5), Value::Int64(7)] {
            min.update(&v).unwrap();
            max.update(&v).unwrap();
        }
        assert_eq!(min.finish(), Value::Float64(-1.5));
        assert_eq!(max.finish(), Value::Int64(7));
    }

    #[test]
    fn test_avg_rejects_strings() {
        let mut avg = AvgAccumulator::default();
        assert!(avg.update(&Value::from("x")).is_err());
    }

    #[tokio::test]
    async fn test_grouped_aggregate_keeps_first_seen_order() {
        let input = int_rows(&["k", "v"], &[&[2, 10], &[1, 5], &[2, 30], &[1, 1]]);
        let mut agg = HashAggregateExec::try_new(
            input,
            vec![0],
            vec![
                AggCall::count_star("n"),
                AggCall::sum(1, "total"),
                AggCall::max(1, "top"),
            ],
        )
        .unwrap();

        let rows = drain(&mut agg).await.unwrap();
        assert_eq!(agg.schema().names(), &["k", "n", "total", "top"]);
        let values: Vec<&[Value]> = rows.iter().map(Row::values).collect();
        assert_eq!(
            values,
            vec![
                &[Value::Int64(2), Value::Int64(2), Value::Int64(40), Value::Int64(30)][..],
                &[Value::Int64(1), Value::Int64(2), Value::Int64(6), Value::Int64(5)][..],
            ]
        );
    }

    #[tokio::test]
    async fn test_null_group_key_forms_a_group() {
        let input = Box::new(
            ValuesExec::from_values(
                ["k"],
                vec![vec![Value::Null], vec![Value::Int64(1)], vec![Value::Null]],
            )
            .unwrap(),
        );
        let mut agg =
            HashAggregateExec::try_new(input, vec![0], vec![AggCall::count_star("n")]).unwrap();
        let rows = drain(&mut agg).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].values(), &[Value::Null, Value::Int64(2)]);
    }

    #[tokio::test]
    async fn test_global_aggregate_over_empty_input() {
        let input = int_rows(&["v"], &[]);
        let mut agg = HashAggregateExec::try_new(
            input,
            vec![],
            vec![AggCall::count_star("n"), AggCall::sum(0, "s")],
        )
        .unwrap();
        let rows = drain(&mut agg).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values(), &[Value::Int64(0), Value::Null]);
    }

    #[tokio::test]
    async fn test_grouped_aggregate_over_empty_input() {
        let input = int_rows(&["k", "v"], &[]);
        let mut agg =
            HashAggregateExec::try_new(input, vec![0], vec![AggCall::count_star("n")]).unwrap();
        assert!(drain(&mut agg).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_too_many_groups() {
        let input = int_rows(&["k"], &[&[1], &[2], &[3], &[1]]);
        let mut agg =
            HashAggregateExec::try_new(input, vec![0], vec![AggCall::count_star("n")]).unwrap();
        let ctx = ExecutionContext::local()
            .with_config(RuntimeConfig::default().with_intermediate_result_limit(2));
        assert!(agg.open(&ctx).await.unwrap_err().is_resource_exhausted());
    }

    #[test]
    fn test_arguments_validated() {
        let missing = HashAggregateExec::try_new(
            int_rows(&["v"], &[]),
            vec![],
            vec![AggCall::new(AggFunc::Sum, None, "s")],
        );
        assert!(matches!(missing, Err(FedraError::InvalidParameter(_))));

        let out_of_range =
            HashAggregateExec::try_new(int_rows(&["v"], &[]), vec![], vec![AggCall::min(4, "m")]);
        assert!(matches!(out_of_range, Err(FedraError::PlanningError(_))));
    }
}
