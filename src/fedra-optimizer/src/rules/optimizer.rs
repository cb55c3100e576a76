//! The main optimizer that applies rules to logical plans.
//!
//! The optimizer applies rules in a fixed-point iteration until no more changes occur,
//! a maximum number of iterations is reached, or the estimated cost stops improving.

use std::sync::Arc;

use common_config::{CostConfig, OptimizerSettings};
use common_error::FedraResult;
use fedra_logical::{LogicalPlan, NoStatistics, Statistics};
use log::debug;

use super::rule::{OptimizationRule, OptimizedPlan, RuleTrace};
use super::{
    JoinReordering, LimitPushdown, PredicatePushdown, ProjectionPushdown, SubqueryRewrite,
};
use crate::cost::{CostEstimator, CostFactory, FederatedCost, PlanCost};

/// Configuration for the optimizer.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Maximum number of iterations before stopping.
    pub max_iterations: usize,
    /// Whether to enable detailed tracing.
    pub enable_trace: bool,
    /// Consecutive changed iterations without a strict cost improvement
    /// before stopping. `0` disables the check.
    pub stall_iterations: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::from(&OptimizerSettings::default())
    }
}

impl From<&OptimizerSettings> for OptimizerConfig {
    fn from(settings: &OptimizerSettings) -> Self {
        Self {
            max_iterations: settings.max_iterations,
            enable_trace: settings.enable_trace,
            stall_iterations: settings.stall_iterations,
        }
    }
}

impl OptimizerConfig {
    /// Create a new config with the given max iterations.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Enable or disable tracing.
    pub fn with_trace(mut self, enable: bool) -> Self {
        self.enable_trace = enable;
        self
    }

    pub fn with_stall_iterations(mut self, stall: usize) -> Self {
        self.stall_iterations = stall;
        self
    }
}

/// The main optimizer that applies rules to logical plans.
///
/// # Rewrite Ordering
///
/// The federated rule set runs in this order:
///
/// 1. Subquery rewrite
/// 2. Predicate pushdown
/// 3. Projection pushdown
/// 4. Limit pushdown
/// 5. Join reordering
///
/// Each rule walks the plan bottom-up. The whole sequence repeats until a
/// fixpoint is reached.
///
/// # Termination
///
/// Iteration stops at `max_iterations`, and after `stall_iterations`
/// consecutive changed iterations whose estimated cost is not strictly
/// lower than the best seen so far.
pub struct Optimizer {
    /// The rules to apply (in order).
    rules: Vec<Box<dyn OptimizationRule>>,
    /// Configuration.
    config: OptimizerConfig,
    stats: Arc<dyn Statistics>,
    costs: CostFactory,
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("rules", &self.rule_names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Optimizer {
    /// Create a new optimizer with the given rules.
    pub fn new(rules: Vec<Box<dyn OptimizationRule>>) -> Self {
        Self::with_config(rules, OptimizerConfig::default())
    }

    /// Create a new optimizer with custom config.
    pub fn with_config(rules: Vec<Box<dyn OptimizationRule>>, config: OptimizerConfig) -> Self {
        Self {
            rules,
            config,
            stats: Arc::new(NoStatistics),
            costs: CostFactory::default(),
        }
    }

    /// The default federated rule set, estimating with `stats`.
    pub fn federated(
        stats: Arc<dyn Statistics>,
        settings: &OptimizerSettings,
        cost: &CostConfig,
    ) -> Self {
        let rules: Vec<Box<dyn OptimizationRule>> = vec![
            Box::new(SubqueryRewrite),
            Box::new(PredicatePushdown),
            Box::new(ProjectionPushdown),
            Box::new(LimitPushdown),
            Box::new(
                JoinReordering::new(Arc::clone(&stats))
                    .with_ratio(settings.join_reorder_ratio)
                    .with_default_rows(cost.default_table_rows),
            ),
        ];
        Self {
            rules,
            config: OptimizerConfig::from(settings),
            stats,
            costs: CostFactory::new(cost.clone()),
        }
    }

    /// Add a rule to the optimizer.
    pub fn add_rule<R: OptimizationRule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    /// Use `stats` for cost estimates.
    #[must_use]
    pub fn with_statistics(mut self, stats: Arc<dyn Statistics>) -> Self {
        self.stats = stats;
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Estimated cost of executing `plan`.
    pub fn estimate_cost(&self, plan: &LogicalPlan) -> FederatedCost {
        CostEstimator::new(&self.costs, self.stats.as_ref()).cumulative_cost(plan.root())
    }

    /// Optimize a logical plan.
    ///
    /// Applies rules in fixed-point iteration until no changes occur.
    pub fn optimize(&self, plan: LogicalPlan) -> FedraResult<OptimizedPlan> {
        let cost_before = self.estimate_cost(&plan);
        let mut best_cost = cost_before;
        let mut stalled = 0;
        let mut current_plan = plan;
        let mut iterations = 0;
        let mut total_rules_applied = 0;
        let mut trace = Vec::new();

        loop {
            if iterations >= self.config.max_iterations {
                debug!(
                    "Optimizer reached max iterations ({}), stopping",
                    self.config.max_iterations
                );
                break;
            }

            iterations += 1;
            let (next_plan, applied) = self.run_rules(current_plan, iterations, &mut trace)?;
            current_plan = next_plan;
            total_rules_applied += applied;

            if applied == 0 {
                debug!("No changes in iteration {}, reached fixpoint", iterations);
                break;
            }

            let cost = self.estimate_cost(&current_plan);
            if cost.is_lt(&best_cost) {
                best_cost = cost;
                stalled = 0;
            } else {
                stalled += 1;
                if self.config.stall_iterations > 0 && stalled >= self.config.stall_iterations {
                    debug!(
                        "Cost has not improved for {} iterations, stopping at {}",
                        stalled, cost
                    );
                    break;
                }
            }
        }

        let cost_after = self.estimate_cost(&current_plan);
        debug!("Optimized plan cost: {cost_before} -> {cost_after}");
        Ok(OptimizedPlan {
            plan: current_plan,
            iterations,
            rules_applied: total_rules_applied,
            cost_before,
            cost_after,
            trace,
        })
    }

    /// Optimize with a single pass (no fixpoint iteration).
    pub fn optimize_once(&self, plan: LogicalPlan) -> FedraResult<OptimizedPlan> {
        let cost_before = self.estimate_cost(&plan);
        let mut trace = Vec::new();
        let (plan, rules_applied) = self.run_rules(plan, 1, &mut trace)?;
        let cost_after = self.estimate_cost(&plan);

        Ok(OptimizedPlan {
            plan,
            iterations: 1,
            rules_applied,
            cost_before,
            cost_after,
            trace,
        })
    }

    fn run_rules(
        &self,
        plan: LogicalPlan,
        iteration: usize,
        trace: &mut Vec<RuleTrace>,
    ) -> FedraResult<(LogicalPlan, usize)> {
        let mut current_plan = plan;
        let mut applied = 0;

        for rule in &self.rules {
            let before = self.config.enable_trace.then(|| current_plan.explain());
            let result = rule.apply(current_plan)?;

            if result.changed {
                applied += 1;
                debug!("Rule '{}' applied in iteration {}", rule.name(), iteration);
                if let Some(before) = before {
                    trace.push(RuleTrace {
                        rule_name: rule.name(),
                        iteration,
                        before,
                        after: result.plan.explain(),
                        cost: self.estimate_cost(&result.plan),
                    });
                }
            }
            current_plan = result.plan;
        }

        Ok((current_plan, applied))
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::federated(
            Arc::new(NoStatistics),
            &OptimizerSettings::default(),
            &CostConfig::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::rule::Transformed;
    use fedra_logical::{LogicalOp, PlanBuilder, SortOp, col, lit};

    struct AddLimitRule;

    impl OptimizationRule for AddLimitRule {
        fn name(&self) -> &'static str {
            "AddLimit"
        }

        fn apply(&self, plan: LogicalPlan) -> FedraResult<Transformed> {
            // Only add limit if not already present
            if matches!(plan.root(), LogicalOp::Sort { .. }) {
                return Ok(Transformed::no(plan));
            }

            Ok(Transformed::yes(LogicalPlan::new(LogicalOp::sort(
                plan.into_root(),
                SortOp::limit(0, Some(1000)),
            ))))
        }
    }

    /// Always reports a change, never improving the cost.
    struct ChurnRule;

    impl OptimizationRule for ChurnRule {
        fn name(&self) -> &'static str {
            "Churn"
        }

        fn apply(&self, plan: LogicalPlan) -> FedraResult<Transformed> {
            Ok(Transformed::yes(plan))
        }
    }

    #[test]
    fn test_optimizer_basic() {
        let optimizer = Optimizer::new(vec![Box::new(AddLimitRule)]);

        let plan = PlanBuilder::table("people", ["name", "age"])
            .filter(col(1).gt(lit(18i64)))
            .build();

        let result = optimizer.optimize(plan).unwrap();

        assert!(result.rules_applied > 0);
        assert!(
            result
                .plan
                .contains_op(|op| matches!(op, LogicalOp::Sort { .. }))
        );
    }

    #[test]
    fn test_optimizer_fixpoint() {
        // Rule that does nothing - should reach fixpoint immediately
        struct NoChangeRule;

        impl OptimizationRule for NoChangeRule {
            fn name(&self) -> &'static str {
                "NoChange"
            }

            fn apply(&self, plan: LogicalPlan) -> FedraResult<Transformed> {
                Ok(Transformed::no(plan))
            }
        }

        let optimizer = Optimizer::new(vec![Box::new(NoChangeRule)]);

        let plan = PlanBuilder::table("t", ["a"]).build();

        let result = optimizer.optimize(plan).unwrap();

        assert_eq!(result.iterations, 1);
        assert_eq!(result.rules_applied, 0);
    }

    #[test]
    fn test_optimizer_with_trace() {
        let config = OptimizerConfig::default().with_trace(true);
        let optimizer = Optimizer::with_config(vec![Box::new(AddLimitRule)], config);

        let plan = PlanBuilder::table("t", ["a"]).build();

        let result = optimizer.optimize(plan).unwrap();

        assert!(!result.trace.is_empty());
        assert_eq!(result.trace[0].iteration, 1);
        assert_eq!(result.trace[0].rule_name, "AddLimit");
        assert!(result.format_trace().contains("AddLimit"));
    }

    #[test]
    fn test_stall_guard_stops_churning_rules() {
        let config = OptimizerConfig::default().with_stall_iterations(3);
        let optimizer = Optimizer::with_config(vec![Box::new(ChurnRule)], config);

        let result = optimizer
            .optimize(PlanBuilder::table("t", ["a"]).build())
            .unwrap();

        assert_eq!(result.iterations, 3);
    }

    #[test]
    fn test_max_iterations_bounds_churn_without_stall_guard() {
        let config = OptimizerConfig::default()
            .with_stall_iterations(0)
            .with_max_iterations(7);
        let optimizer = Optimizer::with_config(vec![Box::new(ChurnRule)], config);

        let result = optimizer
            .optimize(PlanBuilder::table("t", ["a"]).build())
            .unwrap();

        assert_eq!(result.iterations, 7);
        assert_eq!(result.rules_applied, 7);
    }

    #[test]
    fn test_default_rule_order() {
        assert_eq!(
            Optimizer::default().rule_names(),
            vec![
                "SubqueryRewrite",
                "PredicatePushdown",
                "ProjectionPushdown",
                "LimitPushdown",
                "JoinReordering"
            ]
        );
    }
}
