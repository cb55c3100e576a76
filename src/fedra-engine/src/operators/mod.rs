//! Physical operators.
//!
//! Every operator implements [`PhysicalOperator`] and owns its children
//! as [`BoxedOperator`]s; a plan is a tree pulled from its root.

mod aggregate;
mod filter;
mod hash_join;
mod project;
mod scan;
mod sort;
mod traits;
mod values;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{
    Accumulator, AvgAccumulator, CountAccumulator, ExtremumAccumulator, HashAggregateExec,
    SumAccumulator, create_accumulator,
};
pub use filter::FilterExec;
pub use hash_join::HashJoinExec;
pub use project::ProjectExec;
pub use scan::TableScanExec;
pub use sort::{SortExec, compare_rows};
pub use traits::{BoxedOperator, OperatorState, PhysicalOperator};
pub use values::ValuesExec;
