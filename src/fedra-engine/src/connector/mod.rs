//! Data source connectors.
//!
//! A [`Connector`] opens [`Connection`]s for one family of data sources;
//! the [`ConnectorRegistry`] picks the connector for a data source by its
//! kind. Scans ship a [`RemoteQuery`] and receive a [`QueryResult`].

mod memory;
mod query;
mod registry;

pub use memory::{MemoryConnection, MemoryConnector, MemoryTable};
pub use query::{QueryResult, RemoteQuery};
pub use registry::{Connection, Connector, ConnectorRegistry};
