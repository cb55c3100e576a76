//! Query optimizer for fedra logical plans.
//!
//! Provides the federated cost model and the rule-based rewrites that push
//! filtering, projection and limits toward remote data sources.

pub mod cost;
mod rules;

pub use cost::{CostEstimator, CostFactory, CostWeights, FederatedCost, PlanCost};
pub use rules::{
    DEFAULT_REORDER_RATIO, JoinReordering, LimitPushdown, OptimizationRule, OptimizedPlan,
    Optimizer, OptimizerConfig, PredicatePushdown, ProjectionPushdown, RuleTrace,
    SubqueryRewrite, Transformed,
};

use common_error::FedraResult;
use fedra_logical::LogicalPlan;

/// Optimize a logical plan using the default optimizer.
pub fn optimize(plan: LogicalPlan) -> FedraResult<LogicalPlan> {
    let optimizer = Optimizer::default();
    Ok(optimizer.optimize(plan)?.plan)
}
