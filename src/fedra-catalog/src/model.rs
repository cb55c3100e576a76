//! Metadata entities owned by the registry.

use std::collections::{BTreeMap, HashMap};

use fedra_core::DataType;
use serde::{Deserialize, Serialize};

use crate::lifecycle::DataSourceStatus;

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

/// The kind of system behind a data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSourceKind {
    /// A relational database speaking some SQL dialect.
    Relational { dialect: String },
    /// A document store.
    Document,
    /// A search engine.
    Search,
}

impl DataSourceKind {
    pub fn relational(dialect: impl Into<String>) -> Self {
        Self::Relational {
            dialect: dialect.into(),
        }
    }

    /// Connector family serving this kind.
    pub fn family(&self) -> ConnectorFamily {
        match self {
            Self::Relational { .. } => ConnectorFamily::Relational,
            Self::Document | Self::Search => ConnectorFamily::DocumentSearch,
        }
    }
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Relational { dialect } => write!(f, "relational({dialect})"),
            Self::Document => write!(f, "document"),
            Self::Search => write!(f, "search"),
        }
    }
}

/// Connector families; a connector registry holds one connector per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorFamily {
    Relational,
    DocumentSearch,
}

/// How to reach a data source. Opaque to the core.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub endpoint: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
    #[serde(default, skip_serializing)]
    pub credentials: Option<String>,
}

impl ConnectionDescriptor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: impl Into<String>) -> Self {
        self.credentials = Some(credentials.into());
        self
    }
}

impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("endpoint", &self.endpoint)
            .field("properties", &self.properties)
            .field("credentials", &self.credentials.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A configured external data source.
///
/// The status is only changed through the registry's transition operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub name: String,
    pub kind: DataSourceKind,
    pub descriptor: ConnectionDescriptor,
    pub(crate) status: DataSourceStatus,
}

impl DataSource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: DataSourceKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            descriptor: ConnectionDescriptor::default(),
            status: DataSourceStatus::Created,
        }
    }

    #[must_use]
    pub fn with_descriptor(mut self, descriptor: ConnectionDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    pub fn status(&self) -> &DataSourceStatus {
        &self.status
    }
}

// ---------------------------------------------------------------------------
// Schemas and tables
// ---------------------------------------------------------------------------

/// A column of a federated table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A table bound to the data source that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub data_source_id: String,
    pub columns: Vec<Column>,
    /// Row count reported by the source, used for cost estimation.
    pub row_count: Option<u64>,
}

impl Table {
    pub fn new(name: impl Into<String>, data_source_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_source_id: data_source_id.into(),
            columns: Vec::new(),
            row_count: None,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn with_row_count(mut self, rows: u64) -> Self {
        self.row_count = Some(rows);
        self
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// A named group of tables, optionally tied to one data source.
///
/// Virtual schemas (`data_source_id == None`) may hold tables from several
/// data sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub data_source_id: Option<String>,
    pub tables: BTreeMap<String, Table>,
}

impl Schema {
    pub fn new(name: impl Into<String>, data_source_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            data_source_id,
            tables: BTreeMap::new(),
        }
    }

    /// Schema tied to one data source.
    pub fn for_data_source(name: impl Into<String>, data_source_id: impl Into<String>) -> Self {
        Self::new(name, Some(data_source_id.into()))
    }

    /// Schema not tied to any data source.
    pub fn virtual_schema(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}
