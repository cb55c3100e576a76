//! End-to-end tests of the default federated rule set.

use std::collections::HashMap;
use std::sync::Arc;

use common_config::{CostConfig, OptimizerSettings};
use fedra_logical::{
    AggCall, LogicalExpr, LogicalOp, LogicalPlan, PlanBuilder, SortKey, SubqueryExpr, col, lit,
};
use fedra_optimizer::{LimitPushdown, OptimizationRule, Optimizer, PlanCost};

// =============================================================================
// Helpers
// =============================================================================

fn optimizer() -> Optimizer {
    let stats: HashMap<String, u64> = HashMap::from([
        ("orders".to_string(), 1_000_000),
        ("customers".to_string(), 5_000),
    ]);
    Optimizer::federated(
        Arc::new(stats),
        &OptimizerSettings::default(),
        &CostConfig::default(),
    )
}

fn find_scan<'a>(op: &'a LogicalOp, table: &str) -> &'a fedra_logical::ScanOp {
    op.scans()
        .into_iter()
        .find(|s| s.table.table == table)
        .unwrap_or_else(|| panic!("no scan of {table}"))
}

// =============================================================================
// Pushdown
// =============================================================================

#[test]
fn test_filter_projection_and_limit_reach_the_scan() {
    // SELECT id, amount FROM orders WHERE status = 'open' LIMIT 10
    let plan = PlanBuilder::table("orders", ["id", "status", "amount", "note"])
        .filter(col(1).eq(lit("open")))
        .project_columns(&[0, 2])
        .limit(0, Some(10))
        .build();

    let result = optimizer().optimize(plan).unwrap();

    let root = result.plan.root();
    assert!(!root.contains_sort(), "bare limit should be absorbed:\n{}", result.plan);
    let scan = find_scan(root, "orders");
    assert_eq!(scan.filters, vec![col(1).eq(lit("open"))]);
    assert_eq!(scan.fetch, Some(10));
    assert_eq!(root.output_names(), vec!["id", "amount"]);
    assert!(result.cost_after.is_lt(&result.cost_before));
}

#[test]
fn test_limit_over_join_is_not_pushed() {
    let join = PlanBuilder::table("orders", ["id", "customer_id"])
        .join(
            PlanBuilder::table("customers", ["id", "name"]),
            col(1).eq(col(2)),
        )
        .build_op();
    let plan = PlanBuilder::from_op(join.clone()).limit(0, Some(5)).build();

    let result = LimitPushdown.apply(plan.clone()).unwrap();

    assert!(!result.changed);
    let LogicalOp::Sort { input, sort } = result.plan.root() else {
        panic!("sort must remain on top");
    };
    assert_eq!(sort.fetch, Some(5));
    assert_eq!(input.as_ref(), &join);
    assert_eq!(result.plan, plan);
}

#[test]
fn test_ordered_limit_keeps_sort_and_pushes_ordering() {
    let plan = PlanBuilder::table("orders", ["id", "amount"])
        .sort(vec![SortKey::desc(1)])
        .limit(20, Some(10))
        .build();

    let result = optimizer().optimize(plan).unwrap();

    let LogicalOp::Sort { sort, input } = result.plan.root() else {
        panic!("ordered sort must be retained:\n{}", result.plan);
    };
    assert_eq!((sort.offset, sort.fetch), (20, Some(10)));
    let scan = find_scan(input, "orders");
    assert_eq!(scan.order, vec![SortKey::desc(1)]);
    assert_eq!(scan.fetch, Some(30));
}

// =============================================================================
// Joins and subqueries
// =============================================================================

#[test]
fn test_join_inputs_swapped_and_columns_restored() {
    let plan = PlanBuilder::table("orders", ["id", "customer_id"])
        .join(
            PlanBuilder::table("customers", ["cid", "name"]),
            col(1).eq(col(2)),
        )
        .build();
    let names_before = plan.root().output_names();

    let result = optimizer().optimize(plan).unwrap();

    assert_eq!(result.plan.root().output_names(), names_before);
    let join = result
        .plan
        .root()
        .find_join()
        .expect("join survives optimization");
    let LogicalOp::Join { left, .. } = join else {
        unreachable!()
    };
    assert_eq!(left.scans()[0].table.table, "customers");
}

#[test]
fn test_in_subquery_rewritten_and_pushed() {
    let vips = PlanBuilder::table("customers", ["cid", "name"])
        .filter(col(1).eq(lit("acme")))
        .project_columns(&[0])
        .build_op();
    let plan = PlanBuilder::table("orders", ["id", "customer_id"])
        .filter(LogicalExpr::from(SubqueryExpr::in_list(col(1), vips)))
        .build();

    let result = optimizer().optimize(plan).unwrap();

    assert!(!result.plan.to_string().contains("subquery"));
    assert_eq!(
        find_scan(result.plan.root(), "customers").filters,
        vec![col(1).eq(lit("acme"))]
    );
    assert_eq!(result.plan.root().output_names(), vec!["id", "customer_id"]);
}

#[test]
fn test_aggregate_blocks_limit() {
    let plan = PlanBuilder::table("orders", ["customer_id", "amount"])
        .aggregate(vec![0], vec![AggCall::sum(1, "total")])
        .limit(0, Some(3))
        .build();

    let result = optimizer().optimize(plan).unwrap();

    assert!(result.plan.root().contains_sort());
    assert_eq!(find_scan(result.plan.root(), "orders").fetch, None);
}

#[test]
fn test_optimization_terminates_and_is_stable() {
    let plan = PlanBuilder::table("orders", ["id", "customer_id", "amount"])
        .filter(col(2).gt(lit(100i64)).and(col(0).is_not_null()))
        .join(
            PlanBuilder::table("customers", ["cid", "name", "region"]),
            col(1).eq(col(3)),
        )
        .filter(col(5).eq(lit("eu")))
        .project_columns(&[0, 4])
        .sort(vec![SortKey::asc(1)])
        .limit(0, Some(50))
        .build();

    let optimizer = optimizer();
    let first = optimizer.optimize(plan).unwrap();
    assert!(first.iterations < 100);

    let second = optimizer.optimize(first.plan.clone()).unwrap();
    assert_eq!(second.rules_applied, 0);
    assert_eq!(second.plan, first.plan);
}

// =============================================================================
// Helpers on plans
// =============================================================================

trait PlanProbe {
    fn contains_sort(&self) -> bool;
    fn find_join(&self) -> Option<&LogicalOp>;
}

impl PlanProbe for LogicalOp {
    fn contains_sort(&self) -> bool {
        LogicalPlan::new(self.clone()).contains_op(|op| matches!(op, LogicalOp::Sort { .. }))
    }

    fn find_join(&self) -> Option<&LogicalOp> {
        match self {
            LogicalOp::Join { .. } => Some(self),
            other => other.inputs().into_iter().find_map(PlanProbe::find_join),
        }
    }
}
