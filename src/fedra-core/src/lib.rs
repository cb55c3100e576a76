//! Core data model for fedra.
//!
//! This crate defines the unit of data that flows between operators:
//!
//! - [`Value`]: a single typed cell
//! - [`KeyValue`]: canonical, hashable form of a value used for hash joins and grouping
//! - [`Row`]: an immutable ordered tuple of values paired with column names
//! - [`DataType`]: column types reported by data sources

mod proptest_utils;
mod row;
pub mod types;

pub use row::{Row, RowSchema};
pub use types::{CompositeKey, DataType, KeyValue, Value};
