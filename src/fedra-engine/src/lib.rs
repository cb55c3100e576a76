//! Federated execution engine for fedra.
//!
//! This crate turns optimized logical plans into trees of pull-based
//! operators and runs them against remote data sources.

#![allow(clippy::missing_const_for_fn)] // Builder patterns often can't be const
#![allow(clippy::return_self_not_must_use)] // Builder patterns don't always need must_use
#![allow(clippy::doc_markdown)] // Documentation backticks are sometimes unnecessary
#![allow(clippy::cast_precision_loss)] // Row counts feed float estimates
#![allow(clippy::uninlined_format_args)] // Format args are sometimes clearer inline
#![allow(clippy::significant_drop_tightening)] // Some temporaries with Drop must stay alive
#![allow(clippy::module_name_repetitions)]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌───────────────────┐
//! │  LogicalPlan    │ ──▶ │ PhysicalPlan     │ ──▶ │ FederatedExecutor │
//! │ (fedra-logical) │     │ Converter        │     │                   │
//! └─────────────────┘     └──────────────────┘     └───────────────────┘
//!                                │                         │
//!                                ▼                         ▼
//!                         ExecutionPlan               QueryResult
//! ```
//!
//! # Key Components
//!
//! ## Operators ([`operators`])
//!
//! All operators implement [`PhysicalOperator`]: `open`, then
//! `has_next`/`next` one row at a time, then `close`.
//!
//! - **Leaf**: [`TableScanExec`] ships a [`RemoteQuery`] to one data source,
//!   [`ValuesExec`] replays rows already in memory
//! - **Streaming**: [`FilterExec`], [`ProjectExec`]
//! - **Blocking**: [`HashJoinExec`] (build side), [`HashAggregateExec`],
//!   [`SortExec`], bounded by the intermediate result limit
//!
//! ## Connectors ([`connector`])
//!
//! [`ConnectorRegistry`] maps a data source's kind to a [`Connector`];
//! [`MemoryConnector`] serves in-memory tables.
//!
//! ## Planning and execution
//!
//! - [`PhysicalPlanConverter`]: logical plan to [`ExecutionPlan`]
//! - [`FederatedExecutor`]: runs stages, sequentially or concurrently
//! - [`QueryEngine`]: optimize, convert and execute in one call
//!
//! # Example
//!
//! ```rust,ignore
//! use fedra_engine::{ConnectorRegistry, MemoryConnector, QueryEngine};
//!
//! let engine = QueryEngine::new(registry, connectors, &FedraConfig::default());
//! let rows = engine.query(plan).await?;
//! ```

pub mod connector;
mod engine;
pub mod executor;
pub mod expr;
pub mod memory;
pub mod metrics;
pub mod operators;
pub mod physical;
pub mod planner;

pub use connector::{
    Connection, Connector, ConnectorRegistry, MemoryConnection, MemoryConnector, MemoryTable,
    QueryResult, RemoteQuery,
};
pub use engine::QueryEngine;
pub use executor::{ExecutionContext, FederatedExecutor, RuntimeConfig};
pub use expr::{CompiledExpr, KeyExtractor, ProjectionFn, RowPredicate};
pub use memory::RowBudget;
pub use metrics::{MetricsSink, OperatorMetrics};
pub use operators::{
    BoxedOperator, FilterExec, HashAggregateExec, HashJoinExec, OperatorState, PhysicalOperator,
    ProjectExec, SortExec, TableScanExec, ValuesExec, compare_rows,
};
pub use physical::{ExecutionPlan, ExecutionStage, StageTarget};
pub use planner::{DEFAULT_DATA_SOURCE, PhysicalPlanConverter};
