//! Configuration management for fedra.
//!
//! Provides runtime configuration for query execution, the rule-driven
//! optimizer, and the tunable constants of the federated cost model.

use serde::{Deserialize, Serialize};

use common_error::FedraResult;

/// Default cap on rows accumulated by any single stage.
pub const DEFAULT_INTERMEDIATE_RESULT_LIMIT: usize = 100_000;

/// Global fedra configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FedraConfig {
    /// Execution configuration.
    pub execution: ExecutionConfig,
    /// Optimizer configuration.
    pub optimizer: OptimizerSettings,
    /// Cost model constants.
    pub cost: CostConfig,
}

impl FedraConfig {
    /// Parse a configuration from JSON. Missing sections take their defaults.
    pub fn from_json_str(json: &str) -> FedraResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this configuration to pretty-printed JSON.
    pub fn to_json_string(&self) -> FedraResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Execution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Hard cap on rows held by a join build side, aggregate map or sort buffer.
    pub intermediate_result_limit: usize,
    /// Collect per-operator metrics.
    pub collect_metrics: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            intermediate_result_limit: DEFAULT_INTERMEDIATE_RESULT_LIMIT,
            collect_metrics: true,
        }
    }
}

/// Optimizer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Maximum number of fixed-point iterations.
    pub max_iterations: usize,
    /// Record before/after plans for each rule application.
    pub enable_trace: bool,
    /// Row-count ratio above which join inputs are swapped.
    pub join_reorder_ratio: f64,
    /// Consecutive iterations without a strict cost improvement before stopping.
    pub stall_iterations: usize,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            enable_trace: false,
            join_reorder_ratio: 1.5,
            stall_iterations: 3,
        }
    }
}

/// Weights and coefficients of the federated cost model.
///
/// These are design constants, not derived values. They are kept here so
/// deployments can tune them without touching the estimators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Weight of the CPU dimension in the total cost.
    pub cpu_weight: f64,
    /// Weight of the I/O dimension in the total cost.
    pub io_weight: f64,
    /// Weight of the network dimension in the total cost.
    pub network_weight: f64,
    /// Weight of the memory dimension in the total cost.
    pub memory_weight: f64,

    /// CPU units per scanned row.
    pub scan_cpu_per_row: f64,
    /// Bytes per I/O page.
    pub io_page_bytes: f64,
    /// Bytes per network transfer unit.
    pub network_packet_bytes: f64,
    /// Bytes per memory unit.
    pub memory_unit_bytes: f64,
    /// Estimated bytes per hash table entry.
    pub hash_entry_bytes: f64,
    /// CPU factor per (input row x group).
    pub aggregate_cpu_factor: f64,
    /// Bytes of accumulator state per (output row x group).
    pub aggregate_state_bytes: f64,
    /// CPU factor applied to `rows * ln(rows + 1)`.
    pub sort_cpu_factor: f64,
    /// Bytes per buffered row for in-memory sorts.
    pub sort_row_bytes: f64,
    /// Average width of one column, used to derive bytes per row.
    pub avg_column_bytes: f64,
    /// Row count assumed for tables without statistics.
    pub default_table_rows: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            cpu_weight: 1.0,
            io_weight: 4.0,
            network_weight: 10.0,
            memory_weight: 0.01,
            scan_cpu_per_row: 0.1,
            io_page_bytes: 8192.0,
            network_packet_bytes: 1024.0,
            memory_unit_bytes: 1024.0,
            hash_entry_bytes: 64.0,
            aggregate_cpu_factor: 0.1,
            aggregate_state_bytes: 16.0,
            sort_cpu_factor: 0.1,
            sort_row_bytes: 64.0,
            avg_column_bytes: 8.0,
            default_table_rows: 100.0,
        }
    }
}
