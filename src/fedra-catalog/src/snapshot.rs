//! Immutable planner-facing view of the registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use fedra_logical::TableRef;

use crate::model::{Schema, Table};

/// Tables of one schema as seen by the planner.
#[derive(Debug, Clone, Default)]
pub struct SchemaView {
    pub data_source_id: Option<String>,
    pub tables: BTreeMap<String, Arc<Table>>,
}

/// Root namespace exposing every registered table both unqualified and
/// qualified under its owning schema.
///
/// A snapshot never changes after it is published; the registry replaces
/// it wholesale after each mutation.
#[derive(Debug, Clone, Default)]
pub struct RootSchema {
    version: u64,
    schemas: BTreeMap<String, SchemaView>,
    /// Bare table name to the table of the first schema (by name) defining it.
    unqualified: BTreeMap<String, Arc<Table>>,
}

impl RootSchema {
    /// Build a snapshot from the registered schemas.
    pub(crate) fn build<'a>(version: u64, schemas: impl IntoIterator<Item = &'a Schema>) -> Self {
        let mut views = BTreeMap::new();
        for schema in schemas {
            let tables = schema
                .tables
                .iter()
                .map(|(name, table)| (name.clone(), Arc::new(table.clone())))
                .collect();
            views.insert(
                schema.name.clone(),
                SchemaView {
                    data_source_id: schema.data_source_id.clone(),
                    tables,
                },
            );
        }

        let mut unqualified = BTreeMap::new();
        // BTreeMap iteration is in schema-name order, so the first insert wins.
        for view in views.values() {
            for (name, table) in &view.tables {
                unqualified
                    .entry(name.clone())
                    .or_insert_with(|| Arc::clone(table));
            }
        }

        Self {
            version,
            schemas: views,
            unqualified,
        }
    }

    /// Monotonic snapshot counter; grows with every published mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Resolve `table` or `schema.table`.
    pub fn resolve(&self, name: &str) -> Option<&Arc<Table>> {
        self.resolve_ref(&TableRef::parse(name))
    }

    pub fn resolve_ref(&self, table: &TableRef) -> Option<&Arc<Table>> {
        match &table.schema {
            Some(schema) => self.schemas.get(schema)?.tables.get(&table.table),
            None => self.unqualified.get(&table.table),
        }
    }

    /// Data source owning the referenced table.
    pub fn data_source_for(&self, table: &TableRef) -> Option<&str> {
        self.resolve_ref(table).map(|t| t.data_source_id.as_str())
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaView> {
        self.schemas.get(name)
    }

    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Every bare table name visible at the root.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.unqualified.keys().map(String::as_str)
    }

    /// Every `schema.table` name.
    pub fn qualified_table_names(&self) -> Vec<String> {
        self.schemas
            .iter()
            .flat_map(|(schema, view)| view.tables.keys().map(move |t| format!("{schema}.{t}")))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schemas() -> Vec<Schema> {
        vec![
            Schema::for_data_source("zeta", "ds2").with_table(Table::new("orders", "ds2")),
            Schema::for_data_source("alpha", "ds1")
                .with_table(Table::new("orders", "ds1"))
                .with_table(Table::new("customers", "ds1")),
        ]
    }

    #[test]
    fn test_qualified_and_unqualified_resolution() {
        let root = RootSchema::build(1, &schemas());

        assert_eq!(root.resolve("zeta.orders").unwrap().data_source_id, "ds2");
        assert_eq!(root.resolve("customers").unwrap().data_source_id, "ds1");
        assert!(root.resolve("missing").is_none());
        assert!(root.resolve("nope.orders").is_none());
    }

    #[test]
    fn test_ambiguous_bare_name_uses_first_schema() {
        let root = RootSchema::build(1, &schemas());
        assert_eq!(root.data_source_for(&TableRef::new("orders")), Some("ds1"));
    }

    #[test]
    fn test_names() {
        let root = RootSchema::build(7, &schemas());
        assert_eq!(root.version(), 7);
        assert_eq!(root.schema_names().collect::<Vec<_>>(), vec!["alpha", "zeta"]);
        assert_eq!(root.table_names().collect::<Vec<_>>(), vec!["customers", "orders"]);
        assert_eq!(
            root.qualified_table_names(),
            vec!["alpha.customers", "alpha.orders", "zeta.orders"]
        );
    }
}
