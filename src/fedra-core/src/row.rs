//! Immutable rows flowing through the operator tree.

use std::sync::Arc;

use common_error::{FedraError, FedraResult};
use serde::{Deserialize, Serialize};

use crate::types::Value;

/// Shared, ordered list of column names.
///
/// Names need not be unique: after a join both sides may contribute an `id`
/// column. Positional access is authoritative; [`RowSchema::index_of`]
/// returns the first match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowSchema {
    names: Arc<[String]>,
}

impl RowSchema {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of the first column with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Left columns followed by right columns.
    pub fn merge(&self, other: &Self) -> Self {
        Self::new(self.names.iter().chain(other.names.iter()).cloned())
    }

    /// Columns at the given positions, in the given order.
    pub fn project(&self, indices: &[usize]) -> FedraResult<Self> {
        let names = indices
            .iter()
            .map(|&i| {
                self.names.get(i).cloned().ok_or_else(|| {
                    FedraError::invalid_parameter(format!(
                        "column index {i} out of range for {} columns",
                        self.names.len()
                    ))
                })
            })
            .collect::<FedraResult<Vec<_>>>()?;
        Ok(Self::new(names))
    }
}

impl From<Vec<String>> for RowSchema {
    fn from(names: Vec<String>) -> Self {
        Self {
            names: names.into(),
        }
    }
}

/// An ordered tuple of values paired with column names.
///
/// Rows are immutable: operators build a new row whenever they combine or
/// project data. `values.len() == columns.len()` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    values: Vec<Value>,
    schema: RowSchema,
}

impl Row {
    /// Create a row, validating that every column has exactly one value.
    pub fn try_new(schema: RowSchema, values: Vec<Value>) -> FedraResult<Self> {
        if values.len() != schema.len() {
            return Err(FedraError::invalid_parameter(format!(
                "row has {} values but {} column names",
                values.len(),
                schema.len()
            )));
        }
        Ok(Self { values, schema })
    }

    /// Convenience constructor from column names and values.
    pub fn from_columns<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        values: Vec<Value>,
    ) -> FedraResult<Self> {
        Self::try_new(RowSchema::new(columns), values)
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value of the first column with the given name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn column_names(&self) -> &[String] {
        self.schema.names()
    }

    pub fn schema(&self) -> &RowSchema {
        &self.schema
    }

    /// Concatenate two rows: left values and names, then right.
    pub fn merge(left: &Row, right: &Row) -> Row {
        let mut values = Vec::with_capacity(left.len() + right.len());
        values.extend_from_slice(&left.values);
        values.extend_from_slice(&right.values);
        Row {
            values,
            schema: left.schema.merge(&right.schema),
        }
    }

    /// Merge with a precomputed output schema, avoiding a name-list allocation per row.
    pub fn merge_with_schema(left: &Row, right: &Row, schema: &RowSchema) -> FedraResult<Row> {
        let mut values = Vec::with_capacity(left.len() + right.len());
        values.extend_from_slice(&left.values);
        values.extend_from_slice(&right.values);
        Row::try_new(schema.clone(), values)
    }

    /// Keep only the values at the given positions.
    pub fn project(&self, indices: &[usize]) -> FedraResult<Row> {
        let schema = self.schema.project(indices)?;
        let values = indices.iter().map(|&i| self.values[i].clone()).collect();
        Ok(Row { values, schema })
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cols: &[&str], values: Vec<Value>) -> Row {
        Row::from_columns(cols.iter().copied(), values).unwrap()
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = Row::from_columns(["a", "b"], vec![Value::Int64(1)]).unwrap_err();
        assert!(matches!(err, FedraError::InvalidParameter(_)));
    }

    #[test]
    fn test_merge_concatenates_values_and_names() {
        let left = row(&["id", "name"], vec![Value::Int64(1), Value::from("a")]);
        let right = row(&["id", "tag"], vec![Value::Int64(1), Value::from("x")]);

        let merged = Row::merge(&left, &right);
        assert_eq!(merged.len(), left.len() + right.len());
        assert_eq!(merged.column_names(), &["id", "name", "id", "tag"]);
        assert_eq!(merged.get(3), Some(&Value::from("x")));
        // duplicate names resolve to the first occurrence
        assert_eq!(merged.get_by_name("id"), Some(&Value::Int64(1)));
    }

    #[test]
    fn test_project() {
        let r = row(
            &["a", "b", "c"],
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)],
        );
        let p = r.project(&[2, 0]).unwrap();
        assert_eq!(p.column_names(), &["c", "a"]);
        assert_eq!(p.values(), &[Value::Int64(3), Value::Int64(1)]);
        assert!(r.project(&[5]).is_err());
    }

    #[test]
    fn test_display() {
        let r = row(&["a", "b"], vec![Value::Int64(1), Value::from("x")]);
        assert_eq!(r.to_string(), "(1, x)");
    }
}
