//! Optimization rule trait and framework.

use std::fmt::Write;

use common_error::FedraResult;
use fedra_logical::{LogicalOp, LogicalPlan};

use crate::cost::{FederatedCost, PlanCost};

/// A single optimization rule that can transform a logical plan.
///
/// A rewrite is legal only if the rewritten plan returns the same multiset
/// of rows, with the same column order and the same three-valued NULL
/// behavior, as the input plan.
pub trait OptimizationRule: Send + Sync {
    /// Get the name of this rule.
    fn name(&self) -> &'static str;

    /// Get a description of what this rule does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Apply this rule to the plan, returning a potentially transformed plan.
    fn apply(&self, plan: LogicalPlan) -> FedraResult<Transformed>;
}

/// The result of applying an optimization rule.
#[derive(Debug, Clone)]
pub struct Transformed {
    /// The (potentially transformed) plan.
    pub plan: LogicalPlan,
    /// Whether the plan was actually changed.
    pub changed: bool,
}

impl Transformed {
    pub fn yes(plan: LogicalPlan) -> Self {
        Self {
            plan,
            changed: true,
        }
    }

    pub fn no(plan: LogicalPlan) -> Self {
        Self {
            plan,
            changed: false,
        }
    }

    pub(crate) fn new(plan: LogicalPlan, changed: bool) -> Self {
        Self { plan, changed }
    }
}

/// Apply `f` to every operator, children first.
///
/// Returns the rewritten tree and whether any call of `f` reported a change.
pub(crate) fn transform_up<F>(op: LogicalOp, f: &F) -> FedraResult<(LogicalOp, bool)>
where
    F: Fn(LogicalOp) -> FedraResult<(LogicalOp, bool)>,
{
    let mut changed = false;
    let op = op.try_map_children(|child| {
        let (child, child_changed) = transform_up(child, f)?;
        changed |= child_changed;
        FedraResult::Ok(child)
    })?;
    let (op, self_changed) = f(op)?;
    Ok((op, changed || self_changed))
}

/// Run `f` bottom-up over a whole plan.
pub(crate) fn rewrite_plan<F>(plan: LogicalPlan, f: F) -> FedraResult<Transformed>
where
    F: Fn(LogicalOp) -> FedraResult<(LogicalOp, bool)>,
{
    let (root, changed) = transform_up(plan.into_root(), &f)?;
    Ok(Transformed::new(LogicalPlan::new(root), changed))
}

/// One rewrite recorded while tracing is enabled.
#[derive(Debug, Clone)]
pub struct RuleTrace {
    pub rule_name: &'static str,
    /// Fixed-point iteration the rewrite happened in, starting at 1.
    pub iteration: usize,
    /// `explain()` output before and after the rewrite.
    pub before: String,
    pub after: String,
    /// Estimated cost of the rewritten plan.
    pub cost: FederatedCost,
}

/// Outcome of [`Optimizer::optimize`](crate::Optimizer::optimize).
#[derive(Debug, Clone)]
pub struct OptimizedPlan {
    pub plan: LogicalPlan,
    pub iterations: usize,
    /// Rule applications that changed the plan, over all iterations.
    pub rules_applied: usize,
    pub cost_before: FederatedCost,
    pub cost_after: FederatedCost,
    /// Empty unless tracing is enabled.
    pub trace: Vec<RuleTrace>,
}

impl OptimizedPlan {
    /// Whether the optimizer lowered the estimated cost.
    pub fn improved(&self) -> bool {
        self.cost_after.is_lt(&self.cost_before)
    }

    /// Render the rewrites for logs or EXPLAIN output.
    pub fn format_trace(&self) -> String {
        let mut output = format!(
            "{} rewrite(s) in {} iteration(s), cost {} -> {}\n",
            self.rules_applied, self.iterations, self.cost_before, self.cost_after
        );
        if self.trace.is_empty() {
            output.push_str("  (tracing disabled or nothing rewritten)\n");
            return output;
        }
        for entry in &self.trace {
            let _ = write!(
                output,
                "\n[{}] {} (cost {})\nBefore:\n{}\nAfter:\n{}",
                entry.iteration, entry.rule_name, entry.cost, entry.before, entry.after
            );
        }
        output
    }
}
