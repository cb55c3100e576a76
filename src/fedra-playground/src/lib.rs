//! Fedra Playground - Experiments and Examples
//!
//! Executable apps for trying federated queries against in-memory data
//! sources.
//!
//! # Available Binaries
//!
//! - **`federation-demo`**: scans, filters, joins and aggregates across the
//!   `sales` and `crm` sample sources
//!
//! # Usage
//!
//! ```bash
//! cargo run --package fedra-playground --bin federation-demo -- demo
//! RUST_LOG=debug cargo run --package fedra-playground --bin federation-demo -- explain
//! ```

pub mod data;
pub mod utils;

pub use data::{CUSTOMER_COLUMNS, Federation, ORDER_COLUMNS, create_retail_federation};
pub use utils::{format_rows, print_divider, print_header, print_results};
