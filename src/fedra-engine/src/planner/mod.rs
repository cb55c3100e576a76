//! Physical planning.

mod converter;

pub use converter::{DEFAULT_DATA_SOURCE, PhysicalPlanConverter};
