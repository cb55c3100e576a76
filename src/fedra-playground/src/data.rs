//! Sample data sources for playground examples.
//!
//! The retail federation spans two data sources served by one
//! [`MemoryConnector`]:
//! - `sales` (`ds1`, relational): `orders(id, customer_id, status, amount)`
//! - `crm` (`ds2`, document): `customers(id, name, country)`

use std::sync::Arc;

use common_error::{FedraError, FedraResult};
use fedra_catalog::{
    ConnectorFamily, DataSource, DataSourceKind, MetadataRegistry, SchemaDiscovery,
};
use fedra_core::{DataType, Value};
use fedra_engine::{ConnectorRegistry, MemoryConnector, MemoryTable};
use log::info;

pub const ORDER_COLUMNS: [&str; 4] = ["id", "customer_id", "status", "amount"];
pub const CUSTOMER_COLUMNS: [&str; 3] = ["id", "name", "country"];

/// A registry and connectors wired over the same in-memory store.
#[derive(Debug, Clone)]
pub struct Federation {
    pub registry: Arc<MetadataRegistry>,
    pub connectors: Arc<ConnectorRegistry>,
    pub memory: MemoryConnector,
}

fn orders() -> MemoryTable {
    let statuses = ["open", "closed", "open", "shipped"];
    MemoryTable::new(
        "orders",
        [
            ("id", DataType::Int64),
            ("customer_id", DataType::Int64),
            ("status", DataType::String),
            ("amount", DataType::Float64),
        ],
    )
    .with_rows((1..=24i64).map(|id| {
        vec![
            Value::Int64(id),
            Value::Int64(10 + id % 5),
            Value::from(statuses[(id % 4) as usize]),
            Value::Float64((id * 37 % 200) as f64 + 0.5),
        ]
    }))
}

fn customers() -> MemoryTable {
    MemoryTable::new(
        "customers",
        [
            ("id", DataType::Int64),
            ("name", DataType::String),
            ("country", DataType::String),
        ],
    )
    .with_rows([
        vec![Value::Int64(10), "ada".into(), "uk".into()],
        vec![Value::Int64(11), "bob".into(), "us".into()],
        vec![Value::Int64(12), "chen".into(), "sg".into()],
        vec![Value::Int64(13), "dara".into(), Value::Null],
    ])
}

/// Create the retail federation and run schema discovery over it.
///
/// # Example
///
/// ```rust,ignore
/// let federation = create_retail_federation().await?;
/// println!("{:?}", federation.registry.list_tables());
/// ```
pub async fn create_retail_federation() -> FedraResult<Federation> {
    let memory = MemoryConnector::new()
        .with_table("ds1", orders())
        .with_table("ds2", customers());
    let registry = Arc::new(MetadataRegistry::new());
    let discovery: Arc<dyn SchemaDiscovery> = Arc::new(memory.clone());

    let report = registry
        .initialize(vec![
            (
                DataSource::new("ds1", "sales", DataSourceKind::relational("postgres")),
                Arc::clone(&discovery),
            ),
            (
                DataSource::new("ds2", "crm", DataSourceKind::Document),
                discovery,
            ),
        ])
        .await;
    if let Some((id, error)) = report.failed.first() {
        return Err(FedraError::discovery(id, error.clone()));
    }
    info!("Registered data sources: {}", report.succeeded.join(", "));

    let connectors = ConnectorRegistry::new(Arc::clone(&registry))
        .with_connector(ConnectorFamily::Relational, Arc::new(memory.clone()))
        .with_connector(ConnectorFamily::DocumentSearch, Arc::new(memory.clone()));

    Ok(Federation {
        registry,
        connectors: Arc::new(connectors),
        memory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedra_logical::TableRef;

    #[tokio::test]
    async fn test_federation_maps_tables_to_sources() {
        let federation = create_retail_federation().await.unwrap();
        let registry = &federation.registry;
        assert_eq!(
            registry.data_source_for_table(&TableRef::new("orders")).as_deref(),
            Some("ds1")
        );
        assert_eq!(
            registry.data_source_for_table(&TableRef::new("customers")).as_deref(),
            Some("ds2")
        );
        assert_eq!(registry.get_table("orders").unwrap().row_count, Some(24));
    }
}
