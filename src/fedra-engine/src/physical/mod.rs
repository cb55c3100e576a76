//! Executable plans: operator trees grouped into stages.

mod plan;

pub use plan::{ExecutionPlan, ExecutionStage, StageTarget};
