//! In-memory data sources.
//!
//! Tables live in process memory and queries are evaluated structurally,
//! so the rendered SQL is only logged. Useful for tests, demos and as a
//! reference for real connectors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common_error::{FedraError, FedraResult};
use dashmap::DashMap;
use fedra_catalog::{
    DataSource, SchemaDiscovery, SourceCatalog, SourceColumn, SourceSchema, SourceTable,
};
use fedra_core::{DataType, Row, RowSchema, Value};
use log::debug;
use parking_lot::Mutex;

use super::{Connection, Connector, QueryResult, RemoteQuery};
use crate::expr::RowPredicate;
use crate::operators::compare_rows;

/// A table held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTable {
    pub name: String,
    pub columns: Vec<(String, DataType)>,
    pub rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (S, DataType)>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(|(n, t)| (n.into(), t)).collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    #[must_use]
    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Vec<Value>>) -> Self {
        self.rows.extend(rows);
        self
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    /// Evaluate `query` against this table.
    fn evaluate(&self, query: &RemoteQuery) -> FedraResult<(RowSchema, Vec<Row>)> {
        let positions = query
            .columns
            .iter()
            .map(|name| {
                self.column_index(name).ok_or_else(|| {
                    FedraError::execution(format!("no column '{name}' in table {}", self.name))
                })
            })
            .collect::<FedraResult<Vec<_>>>()?;
        let predicates = query
            .filters
            .iter()
            .map(|f| RowPredicate::compile(f, positions.len()))
            .collect::<FedraResult<Vec<_>>>()?;

        let mut rows = Vec::new();
        for source in &self.rows {
            let values: Vec<Value> = positions
                .iter()
                .map(|&p| source.get(p).cloned().unwrap_or(Value::Null))
                .collect();
            let mut keep = true;
            for predicate in &predicates {
                if !predicate.test_values(&values)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                rows.push(values);
            }
        }

        if !query.order.is_empty() {
            rows.sort_by(|a, b| compare_rows(&query.order, a, b));
        }
        if let Some(fetch) = query.fetch {
            rows.truncate(fetch);
        }

        let schema = RowSchema::new(query.output_columns());
        let rows = rows
            .into_iter()
            .map(|values| {
                let values = match &query.projection {
                    Some(indices) => indices
                        .iter()
                        .map(|&i| values.get(i).cloned().unwrap_or(Value::Null))
                        .collect(),
                    None => values,
                };
                Row::try_new(schema.clone(), values)
            })
            .collect::<FedraResult<Vec<_>>>()?;
        Ok((schema, rows))
    }
}

#[derive(Debug, Default)]
struct MemoryDatabase {
    tables: Vec<MemoryTable>,
    failure: Option<String>,
}

impl MemoryDatabase {
    fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Default)]
struct MemoryStore {
    databases: DashMap<String, MemoryDatabase>,
    issued: Mutex<Vec<(String, String)>>,
}

/// Connector serving in-memory tables, keyed by data source id.
///
/// Clones share the same tables and query log.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table served for `data_source_id`.
    #[must_use]
    pub fn with_table(self, data_source_id: impl Into<String>, table: MemoryTable) -> Self {
        self.add_table(data_source_id, table);
        self
    }

    pub fn add_table(&self, data_source_id: impl Into<String>, table: MemoryTable) {
        let mut database = self.store.databases.entry(data_source_id.into()).or_default();
        database.tables.retain(|t| t.name != table.name);
        database.tables.push(table);
    }

    /// Make every query against `data_source_id` fail with `message`.
    #[must_use]
    pub fn with_failure(self, data_source_id: impl Into<String>, message: impl Into<String>) -> Self {
        self.store
            .databases
            .entry(data_source_id.into())
            .or_default()
            .failure = Some(message.into());
        self
    }

    /// `(data source id, SQL)` of every query received so far, in order.
    pub fn issued_queries(&self) -> Vec<(String, String)> {
        self.store.issued.lock().clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    fn kind_name(&self) -> &'static str {
        "memory"
    }

    async fn connect(&self, data_source: &DataSource) -> FedraResult<Box<dyn Connection>> {
        Ok(Box::new(MemoryConnection {
            data_source_id: data_source.id.clone(),
            store: Arc::clone(&self.store),
            closed: AtomicBool::new(false),
        }))
    }
}

#[async_trait]
impl SchemaDiscovery for MemoryConnector {
    async fn discover(&self, data_source: &DataSource) -> FedraResult<SourceCatalog> {
        let database = self.store.databases.get(&data_source.id).ok_or_else(|| {
            FedraError::discovery(&data_source.id, "no in-memory tables registered")
        })?;
        let tables = database
            .tables
            .iter()
            .map(|t| SourceTable {
                name: t.name.clone(),
                columns: t
                    .columns
                    .iter()
                    .map(|(name, data_type)| SourceColumn::new(name, sql_type_name(*data_type)))
                    .collect(),
                row_count: Some(t.rows.len() as u64),
            })
            .collect();
        Ok(SourceCatalog {
            schemas: vec![SourceSchema {
                name: String::new(),
                tables,
            }],
        })
    }
}

fn sql_type_name(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Bool => "boolean",
        DataType::Int64 => "bigint",
        DataType::Float64 => "double",
        DataType::String => "varchar",
        DataType::Binary => "varbinary",
        DataType::Date => "date",
        DataType::Timestamp => "timestamp",
        DataType::Unknown => "unknown",
    }
}

/// A session with one in-memory data source.
#[derive(Debug)]
pub struct MemoryConnection {
    data_source_id: String,
    store: Arc<MemoryStore>,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn execute_query(&self, query: &RemoteQuery) -> FedraResult<QueryResult> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(FedraError::usage(format!(
                "connection to '{}' is closed",
                self.data_source_id
            )));
        }
        let sql = query.sql()?;
        debug!("[{}] {}", self.data_source_id, sql);
        self.store
            .issued
            .lock()
            .push((self.data_source_id.clone(), sql));

        let Some(database) = self.store.databases.get(&self.data_source_id) else {
            return Ok(QueryResult::failure(FedraError::remote(
                &self.data_source_id,
                "no in-memory tables registered",
            )));
        };
        if let Some(message) = &database.failure {
            return Ok(QueryResult::failure(FedraError::remote(
                &self.data_source_id,
                message.clone(),
            )));
        }
        let Some(table) = database.table(&query.table.table) else {
            return Ok(QueryResult::failure(FedraError::remote(
                &self.data_source_id,
                format!("table {} does not exist", query.table),
            )));
        };
        Ok(match table.evaluate(query) {
            Ok((schema, rows)) => QueryResult::success(schema, rows),
            Err(e) => QueryResult::failure(FedraError::remote(&self.data_source_id, e.to_string())),
        })
    }

    async fn is_valid(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    async fn close(&self) -> FedraResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
