//! Queries shipped to data sources and the results they return.

use std::sync::Arc;

use common_error::{FedraError, FedraResult};
use fedra_core::{Row, RowSchema};
use fedra_logical::{LogicalExpr, ScanOp, SortKey, TableRef, sql_ident};
use sqlparser::ast::{
    BinaryOperator, Expr as SqlExpr, Ident, LimitClause, ObjectName, ObjectNamePart, OrderBy,
    OrderByExpr, OrderByKind, OrderByOptions, Query, SelectItem, SetExpr, Statement,
    TableFactor, TableWithJoins, Value as SqlValue,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::metrics::MetricsSink;

/// A scan, with everything pushed into it, addressed to one data source.
///
/// SQL sources receive [`RemoteQuery::sql`]; document and search sources
/// can interpret the structured fields directly.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteQuery {
    pub table: TableRef,
    /// Columns of the table; `filters` and `order` refer to these by position.
    pub columns: Vec<String>,
    /// Positions of `columns` to return; `None` returns every column.
    pub projection: Option<Vec<usize>>,
    pub filters: Vec<LogicalExpr>,
    pub order: Vec<SortKey>,
    pub fetch: Option<usize>,
}

impl RemoteQuery {
    /// `SELECT *` over every column of `table`.
    pub fn table(table: TableRef, columns: Vec<String>) -> Self {
        Self {
            table,
            columns,
            projection: None,
            filters: Vec::new(),
            order: Vec::new(),
            fetch: None,
        }
    }

    /// The remote query equivalent to a (possibly pushed-down) scan.
    pub fn from_scan(scan: &ScanOp) -> Self {
        Self {
            table: scan.table.clone(),
            columns: scan.columns.clone(),
            projection: None,
            filters: scan.filters.clone(),
            order: scan.order.clone(),
            fetch: scan.fetch,
        }
    }

    /// Return only the given column positions.
    #[must_use]
    pub fn with_projection(mut self, projection: Vec<usize>) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Names of the returned columns, in order.
    pub fn output_columns(&self) -> Vec<String> {
        match &self.projection {
            Some(indices) => indices
                .iter()
                .map(|&i| self.columns.get(i).cloned().unwrap_or_else(|| format!("${i}")))
                .collect(),
            None => self.columns.clone(),
        }
    }

    /// Build the `sqlparser` query.
    ///
    /// Fails when a projected position, filter or ordering cannot be
    /// expressed over the table's columns.
    pub fn to_statement(&self) -> FedraResult<Query> {
        let mut query = skeleton()?;
        let SetExpr::Select(select) = query.body.as_mut() else {
            return Err(FedraError::internal("skeleton query is not a SELECT"));
        };

        if let Some(TableWithJoins {
            relation: TableFactor::Table { name, .. },
            ..
        }) = select.from.first_mut()
        {
            *name = self.table_name()?;
        }

        if let Some(indices) = &self.projection {
            select.projection = indices
                .iter()
                .map(|&i| self.column(i).map(|c| SelectItem::UnnamedExpr(SqlExpr::Identifier(c))))
                .collect::<FedraResult<Vec<_>>>()?;
        }

        let predicates = self
            .filters
            .iter()
            .map(|filter| {
                filter.to_sql_expr(&self.columns).ok_or_else(|| {
                    FedraError::unsupported_expression(format!(
                        "filter {filter} cannot be sent to the data source of {}",
                        self.table
                    ))
                })
            })
            .collect::<FedraResult<Vec<_>>>()?;
        let several = predicates.len() > 1;
        let selection = predicates
            .into_iter()
            .map(|p| if several { parenthesize_or(p) } else { p })
            .reduce(|conjunction, p| SqlExpr::BinaryOp {
                left: Box::new(conjunction),
                op: BinaryOperator::And,
                right: Box::new(p),
            });
        select.selection = selection;

        if !self.order.is_empty() {
            let keys = self
                .order
                .iter()
                .map(|k| {
                    Ok(OrderByExpr {
                        expr: SqlExpr::Identifier(self.column(k.column)?),
                        options: OrderByOptions {
                            asc: Some(k.ascending),
                            // matches compare_rows: nulls last ascending, first descending
                            nulls_first: Some(!k.ascending),
                        },
                        with_fill: None,
                    })
                })
                .collect::<FedraResult<Vec<_>>>()?;
            query.order_by = Some(OrderBy {
                kind: OrderByKind::Expressions(keys),
                interpolate: None,
            });
        }

        if let Some(fetch) = self.fetch {
            query.limit_clause = Some(LimitClause::LimitOffset {
                limit: Some(SqlExpr::Value(SqlValue::Number(fetch.to_string(), false).into())),
                offset: None,
                limit_by: vec![],
            });
        }
        Ok(query)
    }

    /// Render as SQL text.
    pub fn sql(&self) -> FedraResult<String> {
        self.to_statement().map(|query| query.to_string())
    }

    fn table_name(&self) -> FedraResult<ObjectName> {
        let parts = self
            .table
            .schema
            .iter()
            .chain(std::iter::once(&self.table.table))
            .map(|part| {
                sql_ident(part).map(ObjectNamePart::Identifier).ok_or_else(|| {
                    FedraError::planning(format!("table name {} cannot be quoted", self.table))
                })
            })
            .collect::<FedraResult<Vec<_>>>()?;
        Ok(ObjectName(parts))
    }

    fn column(&self, index: usize) -> FedraResult<Ident> {
        let name = self.columns.get(index).ok_or_else(|| {
            FedraError::planning(format!(
                "column ${index} out of range for {} ({} columns)",
                self.table,
                self.columns.len()
            ))
        })?;
        sql_ident(name).ok_or_else(|| {
            FedraError::planning(format!("column name {name:?} of {} cannot be quoted", self.table))
        })
    }
}

/// `SELECT * FROM t`, filled in by [`RemoteQuery::to_statement`].
fn skeleton() -> FedraResult<Query> {
    let statements = Parser::parse_sql(&GenericDialect {}, "SELECT * FROM t")
        .map_err(|e| FedraError::internal(format!("skeleton query: {e}")))?;
    match statements.into_iter().next() {
        Some(Statement::Query(query)) => Ok(*query),
        _ => Err(FedraError::internal("skeleton query is not a SELECT")),
    }
}

/// An `OR` conjunct needs parentheses under `AND`.
fn parenthesize_or(expr: SqlExpr) -> SqlExpr {
    match expr {
        SqlExpr::BinaryOp {
            op: BinaryOperator::Or,
            ..
        } => SqlExpr::Nested(Box::new(expr)),
        other => other,
    }
}

impl std::fmt::Display for RemoteQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.sql() {
            Ok(sql) => f.write_str(&sql),
            Err(_) => write!(f, "<unrenderable query on {}>", self.table),
        }
    }
}

/// Rows returned by a data source or a stage, or the error that stopped it.
#[derive(Debug, Clone)]
pub struct QueryResult {
    columns: RowSchema,
    rows: Vec<Row>,
    error: Option<Arc<FedraError>>,
    metrics: Option<MetricsSink>,
}

impl QueryResult {
    pub fn success(columns: RowSchema, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            error: None,
            metrics: None,
        }
    }

    pub fn failure(error: FedraError) -> Self {
        Self {
            columns: RowSchema::default(),
            rows: Vec::new(),
            error: Some(Arc::new(error)),
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: MetricsSink) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&FedraError> {
        self.error.as_deref()
    }

    pub fn columns(&self) -> &RowSchema {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn metrics(&self) -> Option<&MetricsSink> {
        self.metrics.as_ref()
    }

    /// The rows, or the error that stopped the query.
    pub fn into_result(self) -> FedraResult<Vec<Row>> {
        match self.error {
            None => Ok(self.rows),
            Some(error) => Err(Arc::try_unwrap(error).unwrap_or_else(|shared| {
                FedraError::ExternalError(Box::new(SharedError(shared)))
            })),
        }
    }
}

/// A failure still referenced by other clones of its result.
#[derive(Debug)]
struct SharedError(Arc<FedraError>);

impl std::fmt::Display for SharedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for SharedError {}

#[cfg(test)]
mod tests {
    use super::*;
    use fedra_core::Value;
    use fedra_logical::{col, lit};

    fn orders() -> RemoteQuery {
        RemoteQuery::table(
            TableRef::new("orders"),
            vec!["id".into(), "status".into(), "amount".into()],
        )
    }

    #[test]
    fn test_bare_scan_sql() {
        assert_eq!(orders().sql().unwrap(), "SELECT * FROM orders");
    }

    #[test]
    fn test_pushed_down_sql() {
        let mut query = orders().with_projection(vec![0, 2]);
        query.filters = vec![col(1).eq(lit("open")), col(2).gt(lit(10i64))];
        query.order = vec![SortKey::desc(2)];
        query.fetch = Some(5);

        assert_eq!(
            query.sql().unwrap(),
            "SELECT id, amount FROM orders WHERE status = 'open' AND amount > 10 \
             ORDER BY amount DESC NULLS FIRST LIMIT 5"
        );
        assert_eq!(query.output_columns(), vec!["id", "amount"]);
    }

    #[test]
    fn test_reserved_and_spaced_names_are_quoted() {
        let mut query = RemoteQuery::table(
            TableRef::new("order"),
            vec!["select".into(), "first name".into()],
        )
        .with_projection(vec![1]);
        query.order = vec![SortKey::asc(0)];
        query.fetch = Some(3);

        assert_eq!(
            query.sql().unwrap(),
            r#"SELECT "first name" FROM "order" ORDER BY "select" ASC NULLS LAST LIMIT 3"#
        );
    }

    #[test]
    fn test_qualified_table_name() {
        let query = RemoteQuery::table(TableRef::qualified("sales", "orders"), vec!["id".into()]);
        assert_eq!(query.sql().unwrap(), "SELECT * FROM sales.orders");
    }

    #[test]
    fn test_pushed_arithmetic_keeps_grouping() {
        let mut query = orders();
        query.filters = vec![
            col(0).add(col(2)).mul(lit(2i64)).gt(lit(10i64)),
            col(1).eq(lit("open")).or(col(1).eq(lit("new"))),
        ];
        assert_eq!(
            query.sql().unwrap(),
            "SELECT * FROM orders WHERE (id + amount) * 2 > 10 \
             AND (status = 'open' OR status = 'new')"
        );
    }

    #[test]
    fn test_unquotable_column_is_rejected() {
        let query = RemoteQuery::table(TableRef::new("t"), vec!["a\"b".into()])
            .with_projection(vec![0]);
        assert!(matches!(query.sql().unwrap_err(), FedraError::PlanningError(_)));
    }

    #[test]
    fn test_unrenderable_filter_is_rejected() {
        let mut query = orders();
        query.filters = vec![col(7).is_null()];
        let err = query.sql().unwrap_err();
        assert!(matches!(err, FedraError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_failed_result() {
        let result = QueryResult::failure(FedraError::remote("ds1", "timeout"));
        assert!(!result.is_success());
        assert!(result.error().unwrap().is_remote());
        assert_eq!(result.row_count(), 0);

        let ok = QueryResult::success(
            RowSchema::new(["a"]),
            vec![Row::from_columns(["a"], vec![Value::Int64(1)]).unwrap()],
        );
        assert!(ok.is_success());
        assert_eq!(ok.row_count(), 1);
    }

    #[test]
    fn test_into_result_keeps_error_kind() {
        let failed = QueryResult::failure(FedraError::resource_exhausted("SortExec", 5));
        let shared = failed.clone();
        // `failed` still holds the error, so the clone's copy comes back wrapped
        let wrapped = shared.into_result().unwrap_err();
        assert!(matches!(wrapped, FedraError::ExternalError(_)));
        assert!(wrapped.to_string().contains("SortExec"));
        assert!(failed.into_result().unwrap_err().is_resource_exhausted());
    }
}
