//! Unit tests for common-config crate

use common_config::{
    CostConfig, DEFAULT_INTERMEDIATE_RESULT_LIMIT, ExecutionConfig, FedraConfig,
    OptimizerSettings,
};

#[test]
fn test_fedra_config_default() {
    let config = FedraConfig::default();

    assert_eq!(config.execution.intermediate_result_limit, 100_000);
    assert!(config.execution.collect_metrics);
    assert_eq!(config.optimizer.max_iterations, 100);
    assert!(!config.optimizer.enable_trace);
    assert_eq!(config.optimizer.join_reorder_ratio, 1.5);
}

#[test]
fn test_execution_config_default() {
    let config = ExecutionConfig::default();
    assert_eq!(
        config.intermediate_result_limit,
        DEFAULT_INTERMEDIATE_RESULT_LIMIT
    );
}

#[test]
fn test_cost_config_default_coefficients() {
    let cost = CostConfig::default();

    assert_eq!(cost.scan_cpu_per_row, 0.1);
    assert_eq!(cost.io_page_bytes, 8192.0);
    assert_eq!(cost.network_packet_bytes, 1024.0);
    assert_eq!(cost.memory_unit_bytes, 1024.0);
    assert_eq!(cost.hash_entry_bytes, 64.0);
    assert_eq!(cost.aggregate_cpu_factor, 0.1);
    assert_eq!(cost.aggregate_state_bytes, 16.0);
    assert_eq!(cost.sort_cpu_factor, 0.1);
    assert_eq!(cost.sort_row_bytes, 64.0);
}

#[test]
fn test_fedra_config_serialization() {
    let mut config = FedraConfig::default();
    config.execution.intermediate_result_limit = 500;
    config.optimizer.enable_trace = true;
    config.cost.network_weight = 25.0;

    let json = config.to_json_string().unwrap();
    let deserialized = FedraConfig::from_json_str(&json).unwrap();

    assert_eq!(deserialized, config);
}

#[test]
fn test_partial_json_uses_defaults() {
    let json = r#"{ "execution": { "intermediate_result_limit": 42 } }"#;
    let config = FedraConfig::from_json_str(json).unwrap();

    assert_eq!(config.execution.intermediate_result_limit, 42);
    assert!(config.execution.collect_metrics);
    assert_eq!(config.optimizer, OptimizerSettings::default());
    assert_eq!(config.cost, CostConfig::default());
}

#[test]
fn test_invalid_json_is_an_error() {
    let err = FedraConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.to_string().starts_with("SerdeJsonError"));
}

#[test]
fn test_config_debug_format() {
    let config = FedraConfig::default();
    let debug_str = format!("{:?}", config);
    assert!(debug_str.contains("FedraConfig"));
    assert!(debug_str.contains("ExecutionConfig"));
    assert!(debug_str.contains("CostConfig"));
}
