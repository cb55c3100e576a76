//! Metrics collection for query execution.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::executor::ExecutionContext;

/// Counters one operator reports when it closes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperatorMetrics {
    /// Rows pulled from children, or received from the data source for a scan.
    pub rows_in: u64,
    pub rows_out: u64,
    /// Time spent inside `open()` and row production.
    pub exec_time: Duration,
    /// Most rows buffered at once (build table, groups, sort buffer).
    pub peak_rows: usize,
}

impl OperatorMetrics {
    pub fn add_rows_in(&mut self, count: usize) {
        self.rows_in += count as u64;
    }

    pub fn add_rows_out(&mut self, count: usize) {
        self.rows_out += count as u64;
    }

    pub fn add_time(&mut self, duration: Duration) {
        self.exec_time += duration;
    }

    pub fn update_peak_rows(&mut self, rows: usize) {
        self.peak_rows = self.peak_rows.max(rows);
    }
}

impl std::fmt::Display for OperatorMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rows_in={}, rows_out={}, time={:?}, peak_rows={}",
            self.rows_in, self.rows_out, self.exec_time, self.peak_rows
        )
    }
}

/// Metrics of one stage, keyed by operator id (`SortExec-3`).
///
/// Cloning shares the underlying map, so every operator of a stage can hold
/// a handle.
#[derive(Debug, Clone, Default)]
pub struct MetricsSink {
    metrics: Arc<RwLock<HashMap<String, OperatorMetrics>>>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, operator_id: &str, metrics: OperatorMetrics) {
        self.metrics.write().insert(operator_id.to_string(), metrics);
    }

    pub fn get(&self, operator_id: &str) -> Option<OperatorMetrics> {
        self.metrics.read().get(operator_id).cloned()
    }

    pub fn all(&self) -> HashMap<String, OperatorMetrics> {
        self.metrics.read().clone()
    }

    /// Rows received from data sources by every scan of the stage.
    pub fn remote_rows(&self) -> u64 {
        self.metrics
            .read()
            .iter()
            .filter(|(id, _)| id.starts_with("TableScanExec-"))
            .map(|(_, m)| m.rows_in)
            .sum()
    }

    /// Sum of operator times. Nested operators overlap, so this exceeds wall time.
    pub fn total_time(&self) -> Duration {
        self.metrics.read().values().map(|m| m.exec_time).sum()
    }

    /// One line per operator, sorted by id.
    pub fn format_analyze(&self) -> String {
        let metrics = self.metrics.read();
        let mut ids: Vec<&String> = metrics.keys().collect();
        ids.sort();

        let mut output = String::new();
        for id in ids {
            let _ = writeln!(output, "{}: {}", id, metrics[id]);
        }
        if output.is_empty() {
            output.push_str("No metrics collected.\n");
        }
        output
    }
}

/// Per-operator metrics handle, flushed into the stage's sink on close.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    id: String,
    sink: Option<MetricsSink>,
    metrics: OperatorMetrics,
}

impl MetricsRecorder {
    /// Bind to the context's sink under a fresh operator id.
    pub fn attach(&mut self, ctx: &ExecutionContext, name: &str) {
        self.id = ctx.next_operator_id(name);
        self.sink = ctx.metrics().cloned();
    }

    pub fn metrics(&self) -> &OperatorMetrics {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut OperatorMetrics {
        &mut self.metrics
    }

    /// Publish the collected metrics. Later calls are no-ops.
    pub fn flush(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.record(&self.id, self.metrics.clone());
        }
    }
}

/// Wall-clock timer for one operator phase.
#[derive(Debug)]
pub struct ExecutionTimer {
    start: Instant,
}

impl ExecutionTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_metrics() {
        let mut m = OperatorMetrics::default();
        m.add_rows_in(100);
        m.add_rows_out(25);
        m.update_peak_rows(40);
        m.update_peak_rows(10);

        assert_eq!(m.peak_rows, 40);
        assert!(m.to_string().starts_with("rows_in=100, rows_out=25"));
    }

    #[test]
    fn test_metrics_sink() {
        let sink = MetricsSink::new();
        assert!(sink.format_analyze().contains("No metrics"));

        let scan = OperatorMetrics {
            rows_in: 7,
            ..OperatorMetrics::default()
        };
        sink.record("TableScanExec-1", scan.clone());
        sink.record("TableScanExec-2", scan);
        sink.record("HashJoinExec-0", OperatorMetrics::default());

        assert_eq!(sink.all().len(), 3);
        assert_eq!(sink.remote_rows(), 14);
        assert_eq!(sink.get("TableScanExec-2").unwrap().rows_in, 7);

        let report = sink.format_analyze();
        assert!(report.find("HashJoinExec-0").unwrap() < report.find("TableScanExec-1").unwrap());
    }
}
