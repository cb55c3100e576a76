//! Schema discovery contract and translation into registry types.

use async_trait::async_trait;
use common_error::FedraResult;
use fedra_core::DataType;

use crate::model::{Column, DataSource, Schema, Table};

/// A column as described by a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceColumn {
    pub name: String,
    /// Source-specific type name (`varchar(32)`, `keyword`, ...).
    pub type_name: String,
    pub nullable: bool,
}

impl SourceColumn {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
        }
    }
}

/// A table (or index / collection) as described by a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    pub name: String,
    pub columns: Vec<SourceColumn>,
    pub row_count: Option<u64>,
}

/// A schema (or database / namespace) as described by a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    pub name: String,
    pub tables: Vec<SourceTable>,
}

/// Everything a data source reported during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceCatalog {
    pub schemas: Vec<SourceSchema>,
}

/// Per-source schema introspection.
#[async_trait]
pub trait SchemaDiscovery: Send + Sync {
    /// Describe the schemas and tables exposed by `data_source`.
    async fn discover(&self, data_source: &DataSource) -> FedraResult<SourceCatalog>;
}

/// Outcome of a registry initialization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Data source ids whose discovery succeeded.
    pub succeeded: Vec<String>,
    /// `(data source id, error)` for every data source that was skipped.
    pub failed: Vec<(String, String)>,
}

impl DiscoveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Translate a discovered schema into a registry schema owned by `data_source_id`.
pub(crate) fn translate_schema(
    schema_name: String,
    source: &SourceSchema,
    data_source_id: &str,
) -> Schema {
    let mut schema = Schema::for_data_source(schema_name, data_source_id);
    for source_table in &source.tables {
        let mut table = Table::new(&source_table.name, data_source_id);
        table.row_count = source_table.row_count;
        table.columns = source_table
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                data_type: DataType::from_type_name(&c.type_name),
                nullable: c.nullable,
            })
            .collect();
        schema.tables.insert(table.name.clone(), table);
    }
    schema
}
