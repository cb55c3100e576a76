//! Error types and result aliases for fedra.
//!
//! Every crate in the workspace reports failures through [`FedraError`] so
//! callers can match on one taxonomy regardless of which layer failed.

mod error;

pub use error::{FedraError, FedraResult, GenericError};
