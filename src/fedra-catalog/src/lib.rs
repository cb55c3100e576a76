//! Federation metadata registry.
//!
//! Holds the data sources, schemas and tables that make up the federated
//! namespace and answers which data source owns a table. The planner and the
//! physical converter read an immutable [`RootSchema`] snapshot; registration
//! and discovery may run concurrently with query planning.

mod discovery;
mod lifecycle;
mod model;
mod registry;
mod snapshot;

pub use discovery::{
    DiscoveryReport, SchemaDiscovery, SourceCatalog, SourceColumn, SourceSchema, SourceTable,
};
pub use lifecycle::DataSourceStatus;
pub use model::{
    Column, ConnectionDescriptor, ConnectorFamily, DataSource, DataSourceKind, Schema, Table,
};
pub use registry::MetadataRegistry;
pub use snapshot::{RootSchema, SchemaView};
