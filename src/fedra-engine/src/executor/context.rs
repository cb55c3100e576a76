//! Execution context for query execution.
//!
//! This module provides the context operators use to reach data source
//! connectors, the intermediate result budget and the metrics sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common_config::{DEFAULT_INTERMEDIATE_RESULT_LIMIT, ExecutionConfig};

use crate::connector::ConnectorRegistry;
use crate::memory::RowBudget;
use crate::metrics::MetricsSink;

// ============================================================================
// Runtime Configuration
// ============================================================================

/// Runtime configuration for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum rows any blocking operator may accumulate (0 = unlimited).
    pub intermediate_result_limit: usize,
    /// Enable metrics collection.
    pub collect_metrics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            intermediate_result_limit: DEFAULT_INTERMEDIATE_RESULT_LIMIT,
            collect_metrics: true,
        }
    }
}

impl From<&ExecutionConfig> for RuntimeConfig {
    fn from(config: &ExecutionConfig) -> Self {
        Self {
            intermediate_result_limit: config.intermediate_result_limit,
            collect_metrics: config.collect_metrics,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_intermediate_result_limit(mut self, limit: usize) -> Self {
        self.intermediate_result_limit = limit;
        self
    }

    /// Enable or disable metrics collection.
    #[must_use]
    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.collect_metrics = enabled;
        self
    }

    pub fn budget(&self) -> RowBudget {
        RowBudget::new(self.intermediate_result_limit)
    }
}

// ============================================================================
// Execution Context
// ============================================================================

/// Context passed to every operator's `open()`.
///
/// The context is read-only to operators. Each stage gets its own context,
/// so operator ids and metrics never mix across stages.
#[derive(Clone)]
pub struct ExecutionContext {
    connectors: Arc<ConnectorRegistry>,
    metrics: Option<MetricsSink>,
    config: RuntimeConfig,
    operator_seq: Arc<AtomicUsize>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("config", &self.config)
            .field("metrics_enabled", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    pub fn new(connectors: Arc<ConnectorRegistry>) -> Self {
        Self {
            connectors,
            metrics: Some(MetricsSink::new()),
            config: RuntimeConfig::default(),
            operator_seq: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Context with no connectors, for operator trees without table scans.
    pub fn local() -> Self {
        Self::new(Arc::new(ConnectorRegistry::default()))
    }

    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        if !config.collect_metrics {
            self.metrics = None;
        }
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsSink) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn without_metrics(mut self) -> Self {
        self.metrics = None;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn connectors(&self) -> &ConnectorRegistry {
        &self.connectors
    }

    /// Intermediate result budget for blocking operators.
    pub fn budget(&self) -> RowBudget {
        self.config.budget()
    }

    pub fn metrics(&self) -> Option<&MetricsSink> {
        self.metrics.as_ref()
    }

    /// Unique id for an operator instance, e.g. `SortExec-3`.
    pub fn next_operator_id(&self, name: &str) -> String {
        let seq = self.operator_seq.fetch_add(1, Ordering::Relaxed);
        format!("{name}-{seq}")
    }
}
