//! Fedra - federated SQL query engine core
//!
//! Fedra plans relational queries over tables that live in different
//! external systems, pushes as much work as it can into each source and
//! joins, aggregates and sorts the rest locally with pull-based operators.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

// Re-export core crates
pub use common_config as config;
pub use common_error as error;
pub use fedra_catalog as catalog;
pub use fedra_core as core;
pub use fedra_engine as engine;
pub use fedra_logical as logical;
pub use fedra_optimizer as optimizer;

pub use common_config::FedraConfig;
pub use common_error::{FedraError, FedraResult};
pub use fedra_engine::{QueryEngine, QueryResult};

/// Fedra version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
