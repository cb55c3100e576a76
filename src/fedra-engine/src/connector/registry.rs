//! Connection capabilities and the connector registry.

use std::sync::Arc;

use async_trait::async_trait;
use common_error::{FedraError, FedraResult};
use dashmap::DashMap;
use fedra_catalog::{ConnectorFamily, DataSource, MetadataRegistry};
use log::debug;

use super::{QueryResult, RemoteQuery};

/// A live session with one data source.
///
/// Connections are owned by the scan that opened them and closed when the
/// scan closes.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a query. A query the source rejects yields a failed [`QueryResult`];
    /// `Err` is reserved for transport failures.
    async fn execute_query(&self, query: &RemoteQuery) -> FedraResult<QueryResult>;

    async fn is_valid(&self) -> bool;

    async fn close(&self) -> FedraResult<()>;
}

/// Factory for connections to one family of data sources.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Short name for logs (`jdbc`, `memory`, ...).
    fn kind_name(&self) -> &'static str;

    async fn connect(&self, data_source: &DataSource) -> FedraResult<Box<dyn Connection>>;
}

/// Connectors keyed by connector family, with data sources looked up in
/// the metadata registry.
pub struct ConnectorRegistry {
    metadata: Arc<MetadataRegistry>,
    connectors: DashMap<ConnectorFamily, Arc<dyn Connector>>,
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let families: Vec<ConnectorFamily> = self.connectors.iter().map(|e| *e.key()).collect();
        f.debug_struct("ConnectorRegistry")
            .field("families", &families)
            .finish_non_exhaustive()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new(Arc::new(MetadataRegistry::new()))
    }
}

impl ConnectorRegistry {
    pub fn new(metadata: Arc<MetadataRegistry>) -> Self {
        Self {
            metadata,
            connectors: DashMap::new(),
        }
    }

    /// Register (or replace) the connector serving `family`.
    pub fn register(&self, family: ConnectorFamily, connector: Arc<dyn Connector>) {
        debug!("Registering {} connector for {:?}", connector.kind_name(), family);
        self.connectors.insert(family, connector);
    }

    #[must_use]
    pub fn with_connector(self, family: ConnectorFamily, connector: Arc<dyn Connector>) -> Self {
        self.register(family, connector);
        self
    }

    pub fn metadata(&self) -> &Arc<MetadataRegistry> {
        &self.metadata
    }

    pub fn connector_for(&self, data_source: &DataSource) -> FedraResult<Arc<dyn Connector>> {
        let family = data_source.kind.family();
        self.connectors
            .get(&family)
            .map(|c| Arc::clone(c.value()))
            .ok_or_else(|| {
                FedraError::configuration(format!(
                    "no connector registered for {} data source '{}'",
                    data_source.kind, data_source.id
                ))
            })
    }

    /// Open a connection to a registered data source.
    pub async fn connect(&self, data_source_id: &str) -> FedraResult<Box<dyn Connection>> {
        let data_source = self.metadata.get_data_source(data_source_id).ok_or_else(|| {
            FedraError::configuration(format!("unknown data source '{data_source_id}'"))
        })?;
        let connector = self.connector_for(&data_source)?;
        debug!(
            "Connecting to data source '{}' via {}",
            data_source_id,
            connector.kind_name()
        );
        connector.connect(&data_source).await
    }
}
