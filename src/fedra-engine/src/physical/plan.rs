//! Execution plan structure.

use std::fmt::Write;

use fedra_core::RowSchema;

use crate::operators::{BoxedOperator, PhysicalOperator};

/// Where a stage runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StageTarget {
    /// Every scan in the stage reads from this data source.
    DataSource(String),
    /// Cross-source work computed by the engine itself.
    Local,
}

impl StageTarget {
    pub fn data_source_id(&self) -> Option<&str> {
        match self {
            Self::DataSource(id) => Some(id),
            Self::Local => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

impl std::fmt::Display for StageTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataSource(id) => write!(f, "{id}"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// One operator tree addressed to one target.
///
/// A stage owns its operator tree exclusively; it is consumed by
/// execution.
#[derive(Debug)]
pub struct ExecutionStage {
    pub id: usize,
    pub target: StageTarget,
    pub root: BoxedOperator,
    pub estimated_rows: f64,
}

impl ExecutionStage {
    pub fn new(id: usize, target: StageTarget, root: BoxedOperator, estimated_rows: f64) -> Self {
        Self {
            id,
            target,
            root,
            estimated_rows,
        }
    }

    pub fn schema(&self) -> &RowSchema {
        self.root.schema()
    }

    /// Count the number of operators in the stage.
    pub fn operator_count(&self) -> usize {
        fn count(op: &dyn PhysicalOperator) -> usize {
            1 + op.children().into_iter().map(count).sum::<usize>()
        }
        count(self.root.as_ref())
    }
}

/// Ordered stages produced from one logical plan.
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    stages: Vec<ExecutionStage>,
}

impl ExecutionPlan {
    pub fn new(stages: Vec<ExecutionStage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[ExecutionStage] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<ExecutionStage> {
        self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Generate EXPLAIN output.
    pub fn explain(&self) -> String {
        let mut output = String::from("Execution Plan:\n");
        for stage in &self.stages {
            let _ = writeln!(
                output,
                "  Stage {} [target={}, estimated_rows={:.0}]",
                stage.id, stage.target, stage.estimated_rows
            );
            output.push_str(&stage.root.explain(2));
        }
        output
    }
}

impl std::fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.explain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{FilterExec, ValuesExec};
    use fedra_core::Value;
    use fedra_logical::{col, lit};

    #[test]
    fn test_explain_lists_stages() {
        let values =
            ValuesExec::from_values(["x"], vec![vec![Value::Int64(1)], vec![Value::Int64(2)]])
                .unwrap();
        let filter = FilterExec::try_new(Box::new(values), col(0).gt(lit(1i64))).unwrap();
        let stage = ExecutionStage::new(0, StageTarget::Local, Box::new(filter), 1.0);
        assert_eq!(stage.operator_count(), 2);

        let plan = ExecutionPlan::new(vec![stage]);
        let explain = plan.explain();
        assert!(explain.contains("Stage 0 [target=local, estimated_rows=1]"));
        assert!(explain.contains("    FilterExec("));
        assert!(explain.contains("      ValuesExec(rows=2)"));
    }

    #[test]
    fn test_stage_target() {
        let target = StageTarget::DataSource("ds1".into());
        assert_eq!(target.data_source_id(), Some("ds1"));
        assert!(StageTarget::Local.is_local());
        assert_eq!(target.to_string(), "ds1");
    }
}
