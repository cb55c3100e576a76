//! Type system for fedra rows.

mod data_type;
mod key;
mod value;

pub use data_type::DataType;
pub use key::{CompositeKey, KeyValue};
pub use value::Value;
