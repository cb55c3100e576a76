//! Stage executor.

use std::sync::Arc;
use std::time::Instant;

use common_error::{FedraError, FedraResult};
use fedra_core::Row;
use futures::future::join_all;
use log::{debug, warn};

use crate::connector::{ConnectorRegistry, QueryResult};
use crate::executor::{ExecutionContext, RuntimeConfig};
use crate::operators::BoxedOperator;
use crate::physical::{ExecutionPlan, ExecutionStage};

/// Executes the stages of an [`ExecutionPlan`].
///
/// Each stage gets a fresh [`ExecutionContext`]; its operator tree is
/// opened, drained and closed on the calling task. Failures never escape
/// as `Err`: they come back as a failed [`QueryResult`].
#[derive(Debug, Clone)]
pub struct FederatedExecutor {
    config: RuntimeConfig,
    connectors: Arc<ConnectorRegistry>,
}

impl FederatedExecutor {
    pub fn new(connectors: Arc<ConnectorRegistry>) -> Self {
        Self {
            config: RuntimeConfig::default(),
            connectors,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    fn context(&self) -> ExecutionContext {
        ExecutionContext::new(Arc::clone(&self.connectors)).with_config(self.config.clone())
    }

    /// Run one stage to completion.
    pub async fn execute_stage(&self, stage: ExecutionStage) -> QueryResult {
        let ExecutionStage { id, mut root, .. } = stage;
        let ctx = self.context();
        let start = Instant::now();

        match run_stage(&mut root, &ctx).await {
            Ok(rows) => {
                debug!(
                    "Stage {} completed: {} rows in {:?}",
                    id,
                    rows.len(),
                    start.elapsed()
                );
                let result = QueryResult::success(root.schema().clone(), rows);
                match ctx.metrics() {
                    Some(metrics) => result.with_metrics(metrics.clone()),
                    None => result,
                }
            }
            Err(e) => {
                warn!("Stage {} failed: {}", id, e);
                QueryResult::failure(e)
            }
        }
    }

    /// Run the stages in order, stopping at the first failure.
    ///
    /// Returns the last stage's result, or the failing stage's.
    pub async fn execute(&self, plan: ExecutionPlan) -> QueryResult {
        let stages = plan.into_stages();
        debug!("Executing plan with {} stage(s)", stages.len());
        let mut last = None;
        for stage in stages {
            let result = self.execute_stage(stage).await;
            if !result.is_success() {
                return result;
            }
            last = Some(result);
        }
        last.unwrap_or_else(|| {
            QueryResult::failure(FedraError::planning("execution plan has no stages"))
        })
    }

    /// Run stages that do not depend on each other concurrently, one tokio
    /// task per stage. Results come back in input order.
    pub async fn execute_independent(&self, stages: Vec<ExecutionStage>) -> Vec<QueryResult> {
        let handles = stages.into_iter().map(|stage| {
            let executor = self.clone();
            let id = stage.id;
            let handle = tokio::spawn(async move { executor.execute_stage(stage).await });
            async move {
                handle.await.unwrap_or_else(|e| {
                    QueryResult::failure(FedraError::internal(format!("stage {id} task failed: {e}")))
                })
            }
        });
        join_all(handles).await
    }
}

/// Open, drain and close `root`. The tree is closed on every path.
async fn run_stage(root: &mut BoxedOperator, ctx: &ExecutionContext) -> FedraResult<Vec<Row>> {
    let drained = drain(root, ctx).await;
    let closed = root.close().await;
    let rows = drained?;
    closed?;
    Ok(rows)
}

async fn drain(root: &mut BoxedOperator, ctx: &ExecutionContext) -> FedraResult<Vec<Row>> {
    root.open(ctx).await?;
    let budget = ctx.budget();
    let mut rows = Vec::new();
    while let Some(row) = root.try_next().await? {
        rows.push(row);
        budget.check("stage result", rows.len())?;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::operators::testing::{ProbeExec, int_rows};
    use crate::operators::{FilterExec, SortExec};
    use crate::physical::StageTarget;
    use fedra_core::Value;
    use fedra_logical::{SortKey, col, lit};

    fn executor() -> FederatedExecutor {
        FederatedExecutor::new(Arc::new(ConnectorRegistry::default()))
    }

    fn local(id: usize, root: BoxedOperator) -> ExecutionStage {
        ExecutionStage::new(id, StageTarget::Local, root, 0.0)
    }

    #[tokio::test]
    async fn test_execute_stage_collects_rows_and_metrics() {
        let input = int_rows(&["x"], &[&[3], &[1], &[2]]);
        let sort = SortExec::try_new(input, vec![SortKey::asc(0)], 0, None).unwrap();
        let result = executor().execute_stage(local(0, Box::new(sort))).await;

        assert!(result.is_success());
        assert_eq!(result.columns().names(), &["x"]);
        let first: Vec<&Value> = result.rows().iter().map(|r| &r.values()[0]).collect();
        assert_eq!(first, vec![&Value::Int64(1), &Value::Int64(2), &Value::Int64(3)]);

        let metrics = result.metrics().unwrap().all();
        assert_eq!(metrics.len(), 2);
        assert!(metrics.keys().any(|k| k.starts_with("SortExec-")));
    }

    #[tokio::test]
    async fn test_failed_stage_closes_tree() {
        let (probe, closed) = ProbeExec::new(int_rows(&["x"], &[&[1]]));
        let filter = FilterExec::try_new(Box::new(probe), col(0).eq(lit("a"))).unwrap();
        let result = executor().execute_stage(local(0, Box::new(filter))).await;

        assert!(matches!(result.error(), Some(FedraError::TypeError(_))));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_execute_stops_at_first_failure() {
        let (failing, _) = ProbeExec::failing(int_rows(&["x"], &[]));
        let (never_run, never_closed) = ProbeExec::new(int_rows(&["x"], &[&[1]]));
        let plan = ExecutionPlan::new(vec![
            local(0, Box::new(failing)),
            local(1, Box::new(never_run)),
        ]);

        let result = executor().execute(plan).await;
        assert!(result.error().unwrap().is_remote());
        assert!(!never_closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stage_result_over_budget() {
        let config = RuntimeConfig::default().with_intermediate_result_limit(1);
        let result = executor()
            .with_config(config)
            .execute_stage(local(0, int_rows(&["x"], &[&[1], &[2]])))
            .await;
        assert!(result.error().unwrap().is_resource_exhausted());
    }

    #[tokio::test]
    async fn test_independent_stages_keep_order() {
        let stages = vec![
            local(0, int_rows(&["a"], &[&[1]])),
            local(1, int_rows(&["b"], &[&[2], &[3]])),
        ];
        let results = executor().execute_independent(stages).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].row_count(), 1);
        assert_eq!(results[1].row_count(), 2);
        assert_eq!(results[1].columns().names(), &["b"]);
    }

    #[tokio::test]
    async fn test_empty_plan_is_a_failure() {
        let result = executor().execute(ExecutionPlan::default()).await;
        assert!(!result.is_success());
    }
}
