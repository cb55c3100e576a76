//! Integration tests for the federation metadata registry.

use std::sync::Arc;

use async_trait::async_trait;
use common_error::{FedraError, FedraResult};
use fedra_catalog::{
    DataSource, DataSourceKind, DataSourceStatus, MetadataRegistry, Schema, SchemaDiscovery,
    SourceCatalog, SourceColumn, SourceSchema, SourceTable, Table,
};
use fedra_core::DataType;

// =============================================================================
// Helpers
// =============================================================================

fn relational(id: &str) -> DataSource {
    DataSource::new(id, id, DataSourceKind::relational("postgres"))
}

struct FixedDiscovery(SourceCatalog);

#[async_trait]
impl SchemaDiscovery for FixedDiscovery {
    async fn discover(&self, _data_source: &DataSource) -> FedraResult<SourceCatalog> {
        Ok(self.0.clone())
    }
}

struct FailingDiscovery;

#[async_trait]
impl SchemaDiscovery for FailingDiscovery {
    async fn discover(&self, data_source: &DataSource) -> FedraResult<SourceCatalog> {
        Err(FedraError::remote(&data_source.id, "connection refused"))
    }
}

fn catalog(schema: &str, tables: &[&str]) -> SourceCatalog {
    SourceCatalog {
        schemas: vec![SourceSchema {
            name: schema.to_string(),
            tables: tables
                .iter()
                .map(|t| SourceTable {
                    name: t.to_string(),
                    columns: vec![
                        SourceColumn::new("id", "bigint"),
                        SourceColumn::new("label", "keyword"),
                    ],
                    row_count: Some(1_000),
                })
                .collect(),
        }],
    }
}

// =============================================================================
// Cascades
// =============================================================================

#[test]
fn test_unregister_data_source_cascades_to_schemas() {
    let registry = MetadataRegistry::new();
    registry.register_data_source(relational("ds1")).unwrap();
    registry
        .register_schema(Schema::for_data_source("s1", "ds1").with_table(Table::new("orders", "ds1")))
        .unwrap();

    let removed = registry.unregister_data_source("ds1");

    assert!(removed.is_some());
    assert!(registry.get_schema("s1").is_none());
    assert!(registry.get_table("orders").is_none());
    assert!(registry.get_root_schema().resolve("orders").is_none());
}

#[test]
fn test_cascade_leaves_other_data_sources_alone() {
    let registry = MetadataRegistry::new();
    registry.register_data_source(relational("ds1")).unwrap();
    registry.register_data_source(relational("ds2")).unwrap();
    registry
        .register_schema(Schema::for_data_source("s1", "ds1"))
        .unwrap();
    registry
        .register_schema(Schema::for_data_source("s2", "ds2"))
        .unwrap();

    registry.unregister_data_source("ds1");

    assert_eq!(registry.list_schemas(), vec!["s2"]);
    assert!(registry.get_data_source("ds2").is_some());
}

#[test]
fn test_unregister_schema_repoints_shared_table_name() {
    let registry = MetadataRegistry::new();
    registry.register_data_source(relational("ds1")).unwrap();
    registry.register_data_source(relational("ds2")).unwrap();
    registry
        .register_schema(Schema::for_data_source("a", "ds1").with_table(Table::new("events", "ds1")))
        .unwrap();
    registry
        .register_schema(Schema::for_data_source("b", "ds2").with_table(Table::new("events", "ds2")))
        .unwrap();

    assert_eq!(registry.get_table("events").unwrap().data_source_id, "ds1");

    registry.unregister_schema("a");

    assert_eq!(registry.get_table("events").unwrap().data_source_id, "ds2");
    assert!(registry.get_table("b.events").is_some());
    assert_eq!(
        registry
            .get_root_schema()
            .resolve("events")
            .unwrap()
            .data_source_id,
        "ds2"
    );
}

#[test]
fn test_lookups_never_fail_for_missing_entities() {
    let registry = MetadataRegistry::new();
    assert!(registry.get_data_source("nope").is_none());
    assert!(registry.find_data_source_by_name("nope").is_none());
    assert!(registry.get_schema("nope").is_none());
    assert!(registry.get_table("nope.nope").is_none());
    assert!(registry.unregister_schema("nope").is_none());
    assert!(registry.unregister_table("nope", "nope").is_none());
}

#[test]
fn test_clear_removes_everything() {
    let registry = MetadataRegistry::new();
    registry.register_data_source(relational("ds1")).unwrap();
    registry
        .register_schema(Schema::for_data_source("s1", "ds1").with_table(Table::new("t", "ds1")))
        .unwrap();

    registry.clear();

    assert!(registry.list_data_sources().is_empty());
    assert!(registry.list_schemas().is_empty());
    assert!(registry.list_tables().is_empty());
    assert!(registry.get_root_schema().is_empty());
}

// =============================================================================
// Discovery
// =============================================================================

#[tokio::test]
async fn test_initialize_tolerates_partial_failure() {
    let registry = MetadataRegistry::new();
    let sources: Vec<(DataSource, Arc<dyn SchemaDiscovery>)> = vec![
        (
            relational("pg"),
            Arc::new(FixedDiscovery(catalog("sales", &["orders", "customers"]))),
        ),
        (relational("broken"), Arc::new(FailingDiscovery)),
        (
            DataSource::new("es", "search", DataSourceKind::Search),
            Arc::new(FixedDiscovery(catalog("", &["logs"]))),
        ),
    ];

    let report = registry.initialize(sources).await;

    assert_eq!(report.succeeded, vec!["pg", "es"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "broken");
    assert!(!report.is_complete());

    let orders = registry.get_table("sales.orders").unwrap();
    assert_eq!(orders.data_source_id, "pg");
    assert_eq!(orders.columns[0].data_type, DataType::Int64);
    assert_eq!(orders.columns[1].data_type, DataType::String);
    assert_eq!(orders.row_count, Some(1_000));

    // unnamed schemas take the data source name
    assert!(registry.get_table("search.logs").is_some());

    assert_eq!(
        registry.get_data_source("pg").unwrap().status(),
        &DataSourceStatus::Active
    );
    assert!(matches!(
        registry.get_data_source("broken").unwrap().status(),
        DataSourceStatus::Failed(_)
    ));
}

#[tokio::test]
async fn test_discovered_schema_name_clash_is_prefixed() {
    let registry = MetadataRegistry::new();
    let sources: Vec<(DataSource, Arc<dyn SchemaDiscovery>)> = vec![
        (relational("east"), Arc::new(FixedDiscovery(catalog("public", &["a"])))),
        (relational("west"), Arc::new(FixedDiscovery(catalog("public", &["b"])))),
    ];

    let report = registry.initialize(sources).await;

    assert!(report.is_complete());
    assert_eq!(registry.list_schemas(), vec!["public", "west_public"]);
    assert_eq!(registry.get_table("west_public.b").unwrap().data_source_id, "west");
}

#[tokio::test]
async fn test_rediscovery_keeps_source_active() {
    let registry = MetadataRegistry::new();
    let discovery: Arc<dyn SchemaDiscovery> =
        Arc::new(FixedDiscovery(catalog("sales", &["orders"])));

    let first = registry
        .initialize(vec![(relational("pg"), Arc::clone(&discovery))])
        .await;
    let second = registry.initialize(vec![(relational("pg"), discovery)]).await;

    assert!(first.is_complete());
    assert!(second.is_complete());
    assert_eq!(
        registry.get_data_source("pg").unwrap().status(),
        &DataSourceStatus::Active
    );
    assert!(registry.get_table("sales.orders").is_some());
}

#[tokio::test]
async fn test_rejected_discovered_schema_marks_source_failed() {
    let registry = MetadataRegistry::new();
    let mut discovered = catalog("good", &["orders"]);
    discovered.schemas.push(SourceSchema {
        name: "bad".into(),
        tables: vec![SourceTable {
            name: String::new(),
            columns: vec![],
            row_count: None,
        }],
    });

    let report = registry
        .initialize(vec![(relational("pg"), Arc::new(FixedDiscovery(discovered)))])
        .await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "pg");
    assert!(matches!(
        registry.get_data_source("pg").unwrap().status(),
        DataSourceStatus::Failed(_)
    ));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_registration_and_reads() {
    let registry = Arc::new(MetadataRegistry::new());
    registry.register_data_source(relational("ds")).unwrap();

    let writers: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let schema = Schema::for_data_source(format!("s{i}"), "ds")
                    .with_table(Table::new(format!("t{i}"), "ds"));
                registry.register_schema(schema).unwrap();
                for j in 0..10 {
                    registry
                        .register_table(&format!("s{i}"), Table::new(format!("x{i}_{j}"), ""))
                        .unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let root = registry.get_root_schema();
                    // every table visible in a snapshot resolves within that snapshot
                    for name in root.table_names() {
                        assert!(root.resolve(name).is_some());
                    }
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }

    assert_eq!(registry.list_schemas().len(), 8);
    assert_eq!(registry.list_tables().len(), 8 * 11);
    assert_eq!(registry.get_root_schema().qualified_table_names().len(), 8 * 11);
}

#[test]
fn test_schema_never_outlives_racing_unregister() {
    for round in 0..200 {
        let registry = Arc::new(MetadataRegistry::new());
        registry.register_data_source(relational("ds")).unwrap();
        let barrier = Arc::new(std::sync::Barrier::new(2));

        let register = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                // fails cleanly when the unregister wins
                let _ = registry.register_schema(Schema::for_data_source("s", "ds"));
            })
        };
        let unregister = {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                registry.unregister_data_source("ds");
            })
        };
        register.join().unwrap();
        unregister.join().unwrap();

        assert!(registry.get_data_source("ds").is_none());
        assert!(registry.get_schema("s").is_none(), "round {round}: dangling schema");
    }
}
