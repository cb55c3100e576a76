//! Execution context and the stage executor.

mod context;
mod federated;

pub use context::{ExecutionContext, RuntimeConfig};
pub use federated::FederatedExecutor;
