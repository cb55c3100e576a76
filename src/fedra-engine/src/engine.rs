//! Query engine facade: optimize, convert, execute.

use std::sync::Arc;

use common_config::FedraConfig;
use common_error::FedraResult;
use fedra_catalog::MetadataRegistry;
use fedra_core::Row;
use fedra_logical::{LogicalPlan, Statistics};
use fedra_optimizer::{CostFactory, OptimizedPlan, Optimizer};
use log::{debug, info};

use crate::connector::{ConnectorRegistry, QueryResult};
use crate::executor::{FederatedExecutor, RuntimeConfig};
use crate::physical::ExecutionPlan;
use crate::planner::PhysicalPlanConverter;

/// Entry point for running logical plans against federated data sources.
#[derive(Debug)]
pub struct QueryEngine {
    optimizer: Optimizer,
    converter: PhysicalPlanConverter,
    executor: FederatedExecutor,
}

impl QueryEngine {
    pub fn new(
        registry: Arc<MetadataRegistry>,
        connectors: Arc<ConnectorRegistry>,
        config: &FedraConfig,
    ) -> Self {
        let stats: Arc<dyn Statistics> = registry.clone();
        Self {
            optimizer: Optimizer::federated(stats, &config.optimizer, &config.cost),
            converter: PhysicalPlanConverter::new(registry)
                .with_costs(CostFactory::new(config.cost.clone())),
            executor: FederatedExecutor::new(connectors)
                .with_config(RuntimeConfig::from(&config.execution)),
        }
    }

    pub fn optimize(&self, plan: LogicalPlan) -> FedraResult<OptimizedPlan> {
        let optimized = self.optimizer.optimize(plan)?;
        debug!(
            "Optimized in {} iterations ({} rewrites): cost {} -> {}",
            optimized.iterations,
            optimized.rules_applied,
            optimized.cost_before,
            optimized.cost_after
        );
        Ok(optimized)
    }

    /// Optimize and convert without executing.
    pub fn plan(&self, plan: LogicalPlan) -> FedraResult<ExecutionPlan> {
        let optimized = self.optimize(plan)?;
        self.converter.create_plan(&optimized.plan)
    }

    /// Logical plan after optimization followed by the execution plan.
    pub fn explain(&self, plan: LogicalPlan) -> FedraResult<String> {
        let optimized = self.optimize(plan)?;
        let execution = self.converter.create_plan(&optimized.plan)?;
        Ok(format!("{}\n{}", optimized.plan.explain(), execution.explain()))
    }

    /// Run a plan; planning errors and execution failures both land in the result.
    pub async fn execute(&self, plan: LogicalPlan) -> QueryResult {
        match self.plan(plan) {
            Ok(execution) => self.executor.execute(execution).await,
            Err(e) => QueryResult::failure(e),
        }
    }

    /// Run a plan and return its rows.
    pub async fn query(&self, plan: LogicalPlan) -> FedraResult<Vec<Row>> {
        let execution = self.plan(plan)?;
        let result = self.executor.execute(execution).await;
        if let Some(error) = result.error() {
            info!("Query failed: {}", error);
        }
        result.into_result()
    }
}
