//! Table scan operator.

use serde::{Deserialize, Serialize};

use super::SortKey;
use crate::expr::LogicalExpr;

/// Reference to a federated table, optionally qualified by schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub table: String,
}

impl TableRef {
    /// Unqualified table reference.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
        }
    }

    /// `schema.table` reference.
    pub fn qualified(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            table: table.into(),
        }
    }

    /// Parse `table` or `schema.table`.
    pub fn parse(name: &str) -> Self {
        match name.split_once('.') {
            Some((schema, table)) => Self::qualified(schema, table),
            None => Self::new(name),
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        }
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Scan of one federated table.
///
/// Work pushed down to the owning data source accumulates here: `filters`
/// and `order` reference the scan's own columns by position, and `fetch`
/// bounds the number of rows requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOp {
    pub table: TableRef,
    /// Columns of the table, in output order.
    pub columns: Vec<String>,
    /// Conjuncts evaluated by the data source.
    pub filters: Vec<LogicalExpr>,
    /// Ordering requested from the data source.
    pub order: Vec<SortKey>,
    /// Maximum number of rows requested from the data source.
    pub fetch: Option<usize>,
}

impl ScanOp {
    pub fn new(table: TableRef, columns: Vec<String>) -> Self {
        Self {
            table,
            columns,
            filters: Vec::new(),
            order: Vec::new(),
            fetch: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: LogicalExpr) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn with_fetch(mut self, fetch: usize) -> Self {
        self.fetch = Some(fetch);
        self
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Whether any work has been pushed into this scan.
    pub fn has_pushdown(&self) -> bool {
        !self.filters.is_empty() || !self.order.is_empty() || self.fetch.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_ref_parse() {
        assert_eq!(TableRef::parse("orders"), TableRef::new("orders"));
        assert_eq!(
            TableRef::parse("sales.orders"),
            TableRef::qualified("sales", "orders")
        );
        assert_eq!(TableRef::parse("sales.orders").to_string(), "sales.orders");
    }

    #[test]
    fn test_scan_pushdown_flags() {
        let scan = ScanOp::new(TableRef::new("t"), vec!["a".into()]);
        assert!(!scan.has_pushdown());
        assert!(scan.with_fetch(10).has_pushdown());
    }
}
