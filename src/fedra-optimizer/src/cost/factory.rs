//! Per-operator cost formulas.

use common_config::CostConfig;

use super::{CostWeights, FederatedCost};

/// Builds [`FederatedCost`] values from cardinalities.
///
/// Every estimator is a pure function of its arguments and the
/// configured constants.
#[derive(Debug, Clone, Default)]
pub struct CostFactory {
    config: CostConfig,
    weights: CostWeights,
}

impl CostFactory {
    pub fn new(config: CostConfig) -> Self {
        let weights = CostWeights::from(&config);
        Self { config, weights }
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    pub fn weights(&self) -> CostWeights {
        self.weights
    }

    pub fn make_cost(&self, rows: f64, cpu: f64, io: f64, network: f64, memory: f64) -> FederatedCost {
        FederatedCost::new(rows, cpu, io, network, memory, self.weights)
    }

    pub fn zero(&self) -> FederatedCost {
        FederatedCost::zero(self.weights)
    }

    /// Smallest non-zero cost: one row, one unit of CPU.
    pub fn tiny(&self) -> FederatedCost {
        self.make_cost(1.0, 1.0, 0.0, 0.0, 0.0)
    }

    pub fn infinite(&self) -> FederatedCost {
        FederatedCost::infinite(self.weights)
    }

    /// Cost of reading `rows` rows of `bytes_per_row` from a table.
    pub fn table_scan(&self, rows: f64, bytes_per_row: f64, is_remote: bool) -> FederatedCost {
        let bytes = rows * bytes_per_row;
        let network = if is_remote {
            bytes / self.config.network_packet_bytes
        } else {
            0.0
        };
        self.make_cost(
            rows,
            rows * self.config.scan_cpu_per_row,
            bytes / self.config.io_page_bytes,
            network,
            bytes / self.config.memory_unit_bytes,
        )
    }

    /// Cost of a local hash join. The smaller input is the build side.
    pub fn join(&self, left_rows: f64, right_rows: f64, is_cross_join: bool) -> FederatedCost {
        let build = left_rows.min(right_rows);
        let (cpu, rows) = if is_cross_join {
            (left_rows * right_rows, left_rows * right_rows)
        } else {
            (left_rows + right_rows, left_rows.max(right_rows))
        };
        self.make_cost(rows, cpu, 0.0, 0.0, build * self.config.hash_entry_bytes)
    }

    pub fn aggregate(&self, input_rows: f64, output_rows: f64, group_count: f64) -> FederatedCost {
        self.make_cost(
            output_rows,
            input_rows * group_count * self.config.aggregate_cpu_factor,
            0.0,
            0.0,
            output_rows * group_count * self.config.aggregate_state_bytes,
        )
    }

    pub fn sort(&self, rows: f64, in_memory: bool) -> FederatedCost {
        let memory = if in_memory {
            rows * self.config.sort_row_bytes
        } else {
            0.0
        };
        self.make_cost(
            rows,
            rows * (rows + 1.0).ln() * self.config.sort_cpu_factor,
            0.0,
            0.0,
            memory,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::PlanCost;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_table_scan_formula() {
        let factory = CostFactory::default();
        let remote = factory.table_scan(1_000.0, 64.0, true);
        assert!(close(remote.cpu(), 100.0));
        assert!(close(remote.io(), 64_000.0 / 8192.0));
        assert!(close(remote.network(), 62.5));
        assert!(close(remote.memory(), 62.5));

        let local = factory.table_scan(1_000.0, 64.0, false);
        assert_eq!(local.network(), 0.0);
        assert!(local.is_lt(&remote));
    }

    #[test]
    fn test_join_formula() {
        let factory = CostFactory::default();
        let equi = factory.join(100.0, 10.0, false);
        assert!(close(equi.cpu(), 110.0));
        assert!(close(equi.memory(), 640.0));
        assert_eq!(equi.network(), 0.0);
        assert_eq!(equi.rows(), 100.0);

        let cross = factory.join(100.0, 10.0, true);
        assert!(close(cross.cpu(), 1_000.0));
        assert_eq!(cross.rows(), 1_000.0);
    }

    #[test]
    fn test_aggregate_and_sort_formulas() {
        let factory = CostFactory::default();
        let agg = factory.aggregate(1_000.0, 10.0, 2.0);
        assert!(close(agg.cpu(), 200.0));
        assert!(close(agg.memory(), 320.0));

        let sort = factory.sort(100.0, true);
        assert!(close(sort.cpu(), 100.0 * 101f64.ln() * 0.1));
        assert!(close(sort.memory(), 6_400.0));
        assert_eq!(factory.sort(100.0, false).memory(), 0.0);
    }

    #[test]
    fn test_constants_are_overridable() {
        let factory = CostFactory::new(CostConfig {
            scan_cpu_per_row: 1.0,
            ..CostConfig::default()
        });
        assert!(close(factory.table_scan(10.0, 8.0, false).cpu(), 10.0));
    }
}
