//! The federation metadata registry.

use std::collections::BTreeSet;
use std::sync::Arc;

use common_error::{FedraError, FedraResult, ensure};
use dashmap::DashMap;
use fedra_logical::{Statistics, TableRef};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

use crate::discovery::{DiscoveryReport, SchemaDiscovery, translate_schema};
use crate::lifecycle::DataSourceStatus;
use crate::model::{DataSource, Schema, Table};
use crate::snapshot::RootSchema;

/// Registry of data sources, schemas and tables shared by every query.
///
/// Maps are concurrent; mutations are serialized and each one publishes a
/// fresh [`RootSchema`] snapshot, so planners never observe a half-applied
/// change and never rebuild the namespace themselves.
pub struct MetadataRegistry {
    data_sources: DashMap<String, DataSource>,
    schemas: DashMap<String, Schema>,
    /// Bare table name to the schemas defining a table of that name.
    table_index: DashMap<String, BTreeSet<String>>,
    root: RwLock<Arc<RootSchema>>,
    /// Serializes mutations; holds the snapshot version counter.
    write_lock: Mutex<u64>,
}

impl Default for MetadataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetadataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataRegistry")
            .field("data_sources", &self.data_sources.len())
            .field("schemas", &self.schemas.len())
            .field("tables", &self.table_index.len())
            .finish()
    }
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self {
            data_sources: DashMap::new(),
            schemas: DashMap::new(),
            table_index: DashMap::new(),
            root: RwLock::new(Arc::new(RootSchema::default())),
            write_lock: Mutex::new(0),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Insert or replace a data source, keyed by id.
    ///
    /// Replacing keeps the registered lifecycle status; only the lifecycle
    /// calls move it.
    pub fn register_data_source(&self, mut data_source: DataSource) -> FedraResult<()> {
        ensure!(
            !data_source.id.trim().is_empty(),
            InvalidParameter: "data source id must not be empty"
        );
        ensure!(
            !data_source.name.trim().is_empty(),
            InvalidParameter: "data source name must not be empty"
        );

        let mut version = self.write_lock.lock();
        let existing = self
            .data_sources
            .get(&data_source.id)
            .map(|d| d.status.clone());
        if let Some(status) = existing {
            data_source.status = status;
        }
        info!(
            "Registering data source '{}' ({}, {})",
            data_source.id, data_source.name, data_source.kind
        );
        self.data_sources.insert(data_source.id.clone(), data_source);
        self.publish(&mut version);
        Ok(())
    }

    /// Insert or replace a schema, keyed by name, together with its tables.
    pub fn register_schema(&self, mut schema: Schema) -> FedraResult<()> {
        ensure!(
            !schema.name.trim().is_empty(),
            InvalidParameter: "schema name must not be empty"
        );
        for table in schema.tables.values_mut() {
            Self::bind_table(&schema.name, schema.data_source_id.as_deref(), table)?;
        }

        let mut version = self.write_lock.lock();
        // checked under the lock so a concurrent unregister cannot strand the schema
        if let Some(ds) = &schema.data_source_id {
            if !self.data_sources.contains_key(ds) {
                return Err(FedraError::configuration(format!(
                    "schema '{}' references unknown data source '{ds}'",
                    schema.name
                )));
            }
        }
        self.remove_schema_locked(&schema.name);
        for table_name in schema.tables.keys() {
            self.index_add(table_name, &schema.name);
        }
        info!(
            "Registering schema '{}' with {} tables",
            schema.name,
            schema.tables.len()
        );
        self.schemas.insert(schema.name.clone(), schema);
        self.publish(&mut version);
        Ok(())
    }

    /// Insert or replace a table in an existing schema.
    pub fn register_table(&self, schema_name: &str, mut table: Table) -> FedraResult<()> {
        let mut version = self.write_lock.lock();
        {
            let mut schema = self.schemas.get_mut(schema_name).ok_or_else(|| {
                FedraError::configuration(format!("unknown schema '{schema_name}'"))
            })?;
            Self::bind_table(schema_name, schema.data_source_id.as_deref(), &mut table)?;
            debug!("Registering table '{}.{}'", schema_name, table.name);
            schema.tables.insert(table.name.clone(), table.clone());
        }
        self.index_add(&table.name, schema_name);
        self.publish(&mut version);
        Ok(())
    }

    fn bind_table(schema: &str, schema_ds: Option<&str>, table: &mut Table) -> FedraResult<()> {
        ensure!(
            !table.name.trim().is_empty(),
            InvalidParameter: "table name must not be empty (schema '{}')", schema
        );
        if table.data_source_id.is_empty() {
            match schema_ds {
                Some(ds) => table.data_source_id = ds.to_string(),
                None => {
                    return Err(FedraError::invalid_parameter(format!(
                        "table '{schema}.{}' has no data source and its schema is virtual",
                        table.name
                    )));
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove a data source and every schema bound to it.
    pub fn unregister_data_source(&self, id: &str) -> Option<DataSource> {
        let mut version = self.write_lock.lock();
        let (_, removed) = self.data_sources.remove(id)?;

        let owned: Vec<String> = self
            .schemas
            .iter()
            .filter(|s| s.data_source_id.as_deref() == Some(id))
            .map(|s| s.name.clone())
            .collect();
        for name in &owned {
            self.remove_schema_locked(name);
        }

        info!(
            "Unregistered data source '{}' (cascaded {} schemas)",
            id,
            owned.len()
        );
        self.publish(&mut version);
        Some(removed)
    }

    /// Remove a schema and drop its tables from the root namespace.
    ///
    /// Same-named tables of other schemas stay reachable; the bare name
    /// then resolves to one of them.
    pub fn unregister_schema(&self, name: &str) -> Option<Schema> {
        let mut version = self.write_lock.lock();
        let removed = self.remove_schema_locked(name)?;
        info!("Unregistered schema '{}'", name);
        self.publish(&mut version);
        Some(removed)
    }

    pub fn unregister_table(&self, schema_name: &str, table_name: &str) -> Option<Table> {
        let mut version = self.write_lock.lock();
        let removed = self
            .schemas
            .get_mut(schema_name)
            .and_then(|mut s| s.tables.remove(table_name))?;
        self.index_remove(table_name, schema_name);
        debug!("Unregistered table '{}.{}'", schema_name, table_name);
        self.publish(&mut version);
        Some(removed)
    }

    /// Remove every entity at once.
    pub fn clear(&self) {
        let mut version = self.write_lock.lock();
        self.schemas.clear();
        self.table_index.clear();
        self.data_sources.clear();
        info!("Cleared federation metadata");
        self.publish(&mut version);
    }

    fn remove_schema_locked(&self, name: &str) -> Option<Schema> {
        let (_, schema) = self.schemas.remove(name)?;
        for table_name in schema.tables.keys() {
            self.index_remove(table_name, name);
        }
        Some(schema)
    }

    fn index_add(&self, table: &str, schema: &str) {
        self.table_index
            .entry(table.to_string())
            .or_default()
            .insert(schema.to_string());
    }

    fn index_remove(&self, table: &str, schema: &str) {
        let now_empty = match self.table_index.get_mut(table) {
            Some(mut schemas) => {
                schemas.remove(schema);
                schemas.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.table_index.remove_if(table, |_, schemas| schemas.is_empty());
        }
    }

    fn publish(&self, version: &mut u64) {
        *version += 1;
        let schemas: Vec<Schema> = self.schemas.iter().map(|s| s.value().clone()).collect();
        let root = RootSchema::build(*version, &schemas);
        *self.root.write() = Arc::new(root);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn begin_connect(&self, id: &str) -> FedraResult<()> {
        self.transition(id, DataSourceStatus::Connecting)
    }

    pub fn mark_connected(&self, id: &str) -> FedraResult<()> {
        self.transition(id, DataSourceStatus::Connected)
    }

    pub fn mark_active(&self, id: &str) -> FedraResult<()> {
        self.transition(id, DataSourceStatus::Active)
    }

    pub fn mark_disconnected(&self, id: &str) -> FedraResult<()> {
        self.transition(id, DataSourceStatus::Disconnected)
    }

    pub fn mark_failed(&self, id: &str, reason: impl Into<String>) -> FedraResult<()> {
        self.transition(id, DataSourceStatus::Failed(reason.into()))
    }

    fn transition(&self, id: &str, next: DataSourceStatus) -> FedraResult<()> {
        let mut ds = self
            .data_sources
            .get_mut(id)
            .ok_or_else(|| FedraError::configuration(format!("unknown data source '{id}'")))?;
        if !ds.status.can_transition_to(&next) {
            return Err(FedraError::invalid_transition(format!(
                "data source '{id}' cannot move from {} to {}",
                ds.status, next
            )));
        }
        debug!("Data source '{}': {} -> {}", id, ds.status, next);
        ds.status = next;
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn get_data_source(&self, id: &str) -> Option<DataSource> {
        self.data_sources.get(id).map(|d| d.value().clone())
    }

    pub fn find_data_source_by_name(&self, name: &str) -> Option<DataSource> {
        self.data_sources
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value().clone())
    }

    pub fn get_schema(&self, name: &str) -> Option<Schema> {
        self.schemas.get(name).map(|s| s.value().clone())
    }

    /// Look up `table` or `schema.table`.
    pub fn get_table(&self, name: &str) -> Option<Table> {
        match TableRef::parse(name) {
            TableRef {
                schema: Some(schema),
                table,
            } => self.get_table_in(&schema, &table),
            TableRef { schema: None, table } => {
                let schema = self.table_index.get(&table)?.iter().next()?.clone();
                self.get_table_in(&schema, &table)
            }
        }
    }

    pub fn get_table_in(&self, schema: &str, table: &str) -> Option<Table> {
        self.schemas.get(schema)?.tables.get(table).cloned()
    }

    /// Id of the data source owning the referenced table.
    pub fn data_source_for_table(&self, table: &TableRef) -> Option<String> {
        self.get_root_schema()
            .data_source_for(table)
            .map(ToString::to_string)
    }

    /// Data sources sorted by id.
    pub fn list_data_sources(&self) -> Vec<DataSource> {
        let mut all: Vec<DataSource> = self.data_sources.iter().map(|d| d.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Schema names, sorted.
    pub fn list_schemas(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.iter().map(|s| s.key().clone()).collect();
        names.sort();
        names
    }

    /// Bare table names, sorted.
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table_index.iter().map(|t| t.key().clone()).collect();
        names.sort();
        names
    }

    /// The current planner-facing namespace.
    pub fn get_root_schema(&self) -> Arc<RootSchema> {
        Arc::clone(&self.root.read())
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Register each data source and the schemas its discovery reports.
    ///
    /// A failing data source is logged, marked failed and skipped; the
    /// remaining ones are still registered.
    pub async fn initialize(
        &self,
        sources: Vec<(DataSource, Arc<dyn SchemaDiscovery>)>,
    ) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        for (data_source, discovery) in sources {
            let id = data_source.id.clone();
            match self.discover_one(data_source, discovery.as_ref()).await {
                Ok(tables) => {
                    info!("Discovered {} tables for data source '{}'", tables, id);
                    report.succeeded.push(id);
                }
                Err(e) => {
                    warn!("Skipping data source '{}': {}", id, e);
                    report.failed.push((id, e.to_string()));
                }
            }
        }
        report
    }

    async fn discover_one(
        &self,
        data_source: DataSource,
        discovery: &dyn SchemaDiscovery,
    ) -> FedraResult<usize> {
        let id = data_source.id.clone();
        self.register_data_source(data_source.clone())?;
        // rediscovering an available source reconnects it
        if self
            .get_data_source(&id)
            .is_some_and(|d| d.status().is_available())
        {
            self.mark_disconnected(&id)?;
        }
        self.begin_connect(&id)?;

        let catalog = match discovery.discover(&data_source).await {
            Ok(catalog) => catalog,
            Err(e) => {
                if let Err(transition) = self.mark_failed(&id, e.to_string()) {
                    debug!("Could not mark '{}' failed: {}", id, transition);
                }
                return Err(FedraError::discovery(&id, e.to_string()));
            }
        };
        self.mark_connected(&id)?;

        let mut tables = 0;
        for source_schema in &catalog.schemas {
            let name = self.schema_name_for(&data_source, &source_schema.name);
            let schema = translate_schema(name, source_schema, &id);
            tables += schema.tables.len();
            if let Err(e) = self.register_schema(schema) {
                if let Err(transition) = self.mark_failed(&id, e.to_string()) {
                    debug!("Could not mark '{}' failed: {}", id, transition);
                }
                return Err(FedraError::discovery(&id, e.to_string()));
            }
        }

        self.mark_active(&id)?;
        Ok(tables)
    }

    /// Registry name for a discovered schema.
    ///
    /// Unnamed schemas take the data source name; a name already owned by
    /// another data source is prefixed with this data source's name.
    fn schema_name_for(&self, data_source: &DataSource, source_name: &str) -> String {
        if source_name.is_empty() {
            return data_source.name.clone();
        }
        let taken_by_other = self.schemas.get(source_name).is_some_and(|s| {
            s.data_source_id.as_deref() != Some(data_source.id.as_str())
        });
        if taken_by_other {
            format!("{}_{}", data_source.name, source_name)
        } else {
            source_name.to_string()
        }
    }
}

impl Statistics for MetadataRegistry {
    fn row_count(&self, table: &TableRef) -> Option<u64> {
        self.get_root_schema().resolve_ref(table)?.row_count
    }
}
