//! Logical to physical plan conversion.

use std::collections::BTreeSet;
use std::sync::Arc;

use common_error::{FedraError, FedraResult};
use fedra_catalog::MetadataRegistry;
use fedra_core::RowSchema;
use fedra_logical::{JoinType, LogicalOp, LogicalPlan, ScanOp};
use fedra_optimizer::{CostEstimator, CostFactory};
use log::{debug, warn};

use crate::connector::RemoteQuery;
use crate::operators::{
    BoxedOperator, FilterExec, HashAggregateExec, HashJoinExec, ProjectExec, SortExec,
    TableScanExec,
};
use crate::physical::{ExecutionPlan, ExecutionStage, StageTarget};

/// Data source id used for tables the registry does not map.
pub const DEFAULT_DATA_SOURCE: &str = "default";

/// Converts optimized logical plans into operator trees.
///
/// Conversion is pure: it resolves tables through the metadata registry
/// but opens no connections. Plan shapes the engine cannot execute are
/// rejected here rather than at execution time.
#[derive(Debug)]
pub struct PhysicalPlanConverter {
    registry: Arc<MetadataRegistry>,
    costs: CostFactory,
}

impl PhysicalPlanConverter {
    pub fn new(registry: Arc<MetadataRegistry>) -> Self {
        Self {
            registry,
            costs: CostFactory::default(),
        }
    }

    #[must_use]
    pub fn with_costs(mut self, costs: CostFactory) -> Self {
        self.costs = costs;
        self
    }

    /// Convert a plan into one operator tree.
    pub fn convert(&self, plan: &LogicalPlan) -> FedraResult<BoxedOperator> {
        self.convert_op(plan.root())
    }

    /// Convert a plan into a single-stage [`ExecutionPlan`].
    ///
    /// The stage targets the data source shared by every scan, or runs
    /// locally when scans span several data sources.
    pub fn create_plan(&self, plan: &LogicalPlan) -> FedraResult<ExecutionPlan> {
        let root = self.convert(plan)?;
        let sources: BTreeSet<String> = plan
            .root()
            .scans()
            .into_iter()
            .map(|scan| self.resolve_data_source(scan))
            .collect();
        let target = match sources.len() {
            1 => sources
                .into_iter()
                .next()
                .map_or(StageTarget::Local, StageTarget::DataSource),
            _ => StageTarget::Local,
        };
        let estimated_rows =
            CostEstimator::new(&self.costs, self.registry.as_ref()).row_count(plan.root());
        debug!(
            "Created stage 0 targeting {} (estimated {:.0} rows)",
            target, estimated_rows
        );
        Ok(ExecutionPlan::new(vec![ExecutionStage::new(
            0,
            target,
            root,
            estimated_rows,
        )]))
    }

    fn convert_op(&self, op: &LogicalOp) -> FedraResult<BoxedOperator> {
        match op {
            LogicalOp::Scan(scan) => self.convert_scan(scan, None),

            LogicalOp::Filter { input, filter } => {
                let child = self.convert_op(input)?;
                Ok(Box::new(FilterExec::try_new(child, filter.condition.clone())?))
            }

            LogicalOp::Project { input, project } => {
                // a pure column selection over a scan becomes the remote SELECT list
                if let (LogicalOp::Scan(scan), Some(refs)) = (input.as_ref(), project.pure_refs()) {
                    return self.convert_scan(scan, Some((refs, project.names.clone())));
                }
                let child = self.convert_op(input)?;
                Ok(Box::new(ProjectExec::try_new(
                    child,
                    project.exprs.clone(),
                    project.names.clone(),
                )?))
            }

            LogicalOp::Join { left, right, join } => {
                if join.join_type != JoinType::Inner {
                    return Err(FedraError::unsupported_operator(format!(
                        "{} join",
                        join.join_type
                    )));
                }
                let keys = join.split_keys(left.output_width());
                let left = self.convert_op(left)?;
                let right = self.convert_op(right)?;
                Ok(Box::new(HashJoinExec::try_new(
                    left,
                    right,
                    keys.pairs,
                    keys.residual,
                )?))
            }

            LogicalOp::Aggregate { input, aggregate } => {
                let child = self.convert_op(input)?;
                Ok(Box::new(HashAggregateExec::try_new(
                    child,
                    aggregate.group_by.clone(),
                    aggregate.aggs.clone(),
                )?))
            }

            LogicalOp::Sort { input, sort } => {
                let child = self.convert_op(input)?;
                Ok(Box::new(SortExec::try_new(
                    child,
                    sort.keys.clone(),
                    sort.offset,
                    sort.fetch,
                )?))
            }
        }
    }

    fn convert_scan(
        &self,
        scan: &ScanOp,
        projection: Option<(Vec<usize>, Vec<String>)>,
    ) -> FedraResult<BoxedOperator> {
        let data_source = self.resolve_data_source(scan);
        let query = RemoteQuery::from_scan(scan);
        let (query, schema) = match projection {
            Some((refs, names)) => (query.with_projection(refs), RowSchema::from(names)),
            None => {
                let schema = RowSchema::new(query.output_columns());
                (query, schema)
            }
        };
        // surface unrenderable pushdowns now, not when the scan opens
        let sql = query.sql()?;
        debug!("Scan of {} on '{}': {}", scan.table, data_source, sql);
        Ok(Box::new(TableScanExec::with_schema(data_source, query, schema)))
    }

    fn resolve_data_source(&self, scan: &ScanOp) -> String {
        self.registry
            .data_source_for_table(&scan.table)
            .unwrap_or_else(|| {
                warn!(
                    "Table {} is not mapped to a data source; using '{}'",
                    scan.table, DEFAULT_DATA_SOURCE
                );
                DEFAULT_DATA_SOURCE.to_string()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedra_catalog::{Column, DataSource, DataSourceKind, Schema, Table};
    use fedra_core::DataType;
    use fedra_logical::{AggCall, JoinOp, PlanBuilder, SortKey, col, lit};

    fn registry() -> Arc<MetadataRegistry> {
        let registry = MetadataRegistry::new();
        for (id, table, rows) in [("ds1", "orders", 1_000), ("ds2", "customers", 50)] {
            registry
                .register_data_source(DataSource::new(
                    id,
                    format!("{id}_name"),
                    DataSourceKind::relational("postgres"),
                ))
                .unwrap();
            registry
                .register_schema(
                    Schema::for_data_source(format!("{id}_schema"), id).with_table(
                        Table::new(table, id)
                            .with_column(Column::new("id", DataType::Int64))
                            .with_column(Column::new("amount", DataType::Float64))
                            .with_row_count(rows),
                    ),
                )
                .unwrap();
        }
        Arc::new(registry)
    }

    fn converter() -> PhysicalPlanConverter {
        PhysicalPlanConverter::new(registry())
    }

    #[test]
    fn test_scan_issues_select_star() {
        let plan = PlanBuilder::table("orders", ["id", "amount"]).build();
        let op = converter().convert(&plan).unwrap();
        assert_eq!(op.display(), "TableScanExec(ds1: SELECT * FROM orders)");
        assert_eq!(op.schema().names(), &["id", "amount"]);
    }

    #[test]
    fn test_unmapped_table_uses_default_source() {
        let plan = PlanBuilder::table("ghost", ["x"]).build();
        let op = converter().convert(&plan).unwrap();
        assert_eq!(op.display(), "TableScanExec(default: SELECT * FROM ghost)");
    }

    #[test]
    fn test_pure_projection_fuses_into_scan() {
        let plan = PlanBuilder::table("orders", ["id", "amount"])
            .project(vec![col(1)], vec!["total".into()])
            .build();
        let op = converter().convert(&plan).unwrap();
        assert_eq!(op.display(), "TableScanExec(ds1: SELECT amount FROM orders)");
        assert_eq!(op.schema().names(), &["total"]);
    }

    #[test]
    fn test_computed_projection_stays_local() {
        let plan = PlanBuilder::table("orders", ["id", "amount"])
            .project(vec![col(1).mul(lit(2i64))], vec!["double".into()])
            .build();
        let op = converter().convert(&plan).unwrap();
        assert_eq!(op.name(), "ProjectExec");
        assert_eq!(op.children()[0].name(), "TableScanExec");
    }

    #[test]
    fn test_join_across_sources_is_a_local_stage() {
        let plan = PlanBuilder::table("orders", ["id", "amount"])
            .join(
                PlanBuilder::table("customers", ["id", "amount"]),
                col(0).eq(col(2)),
            )
            .aggregate(vec![0], vec![AggCall::count_star("n")])
            .sort(vec![SortKey::desc(1)])
            .build();
        let execution = converter().create_plan(&plan).unwrap();
        assert_eq!(execution.len(), 1);

        let stage = &execution.stages()[0];
        assert_eq!(stage.target, StageTarget::Local);
        assert_eq!(stage.operator_count(), 5);
        assert!(stage.estimated_rows > 0.0);
        let explain = execution.explain();
        assert!(explain.contains("HashJoinExec(keys=[$0=$0])"));
        assert!(explain.contains("TableScanExec(ds2: SELECT * FROM customers)"));
    }

    #[test]
    fn test_single_source_stage_targets_it() {
        let plan = PlanBuilder::table("orders", ["id", "amount"])
            .filter(col(1).gt(lit(10i64)))
            .build();
        let execution = converter().create_plan(&plan).unwrap();
        assert_eq!(
            execution.stages()[0].target,
            StageTarget::DataSource("ds1".into())
        );
    }

    #[test]
    fn test_outer_join_is_unsupported() {
        let mut join = JoinOp::inner(col(0).eq(col(2)));
        join.join_type = JoinType::Left;
        let plan = PlanBuilder::table("orders", ["id", "amount"])
            .join_with(PlanBuilder::table("customers", ["id", "amount"]), join)
            .build();
        let err = converter().convert(&plan).unwrap_err();
        assert!(matches!(err, FedraError::UnsupportedOperator(_)));
    }

    #[test]
    fn test_unrenderable_pushdown_rejected_at_conversion() {
        let scan = ScanOp::new(fedra_logical::TableRef::new("orders"), vec!["id".into()])
            .with_filter(col(4).eq(lit(1i64)));
        let plan = LogicalPlan::new(LogicalOp::scan(scan));
        assert!(converter().convert(&plan).is_err());
    }
}
