//! Data type definitions for federated table columns.

use serde::{Deserialize, Serialize};

/// Data type of a column as seen by the federation layer.
///
/// Connectors report source-specific type names; [`DataType::from_type_name`]
/// folds them into this closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataType {
    /// Type unknown to the federation layer.
    #[default]
    Unknown,
    /// Boolean type.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Binary data.
    Binary,
    /// Date (days since epoch).
    Date,
    /// Timestamp (milliseconds since epoch).
    Timestamp,
}

impl DataType {
    /// Map a source-reported type name (SQL or document mapping) to a data type.
    pub fn from_type_name(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        let base = lower.split('(').next().unwrap_or_default().trim();
        match base {
            "bool" | "boolean" | "bit" => Self::Bool,
            "tinyint" | "smallint" | "int" | "integer" | "bigint" | "int2" | "int4" | "int8"
            | "long" | "short" | "byte" | "serial" | "bigserial" => Self::Int64,
            "real" | "float" | "double" | "double precision" | "decimal" | "numeric" | "float4"
            | "float8" | "half_float" | "scaled_float" => Self::Float64,
            "char" | "varchar" | "character varying" | "text" | "string" | "keyword" | "uuid"
            | "nvarchar" | "json" | "jsonb" => Self::String,
            "binary" | "varbinary" | "blob" | "bytea" => Self::Binary,
            "date" => Self::Date,
            "timestamp" | "timestamptz" | "datetime" | "timestamp with time zone"
            | "timestamp without time zone" => Self::Timestamp,
            _ => Self::Unknown,
        }
    }

    /// Check if this type is numeric.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }

    /// Check if this type is a temporal type.
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Timestamp | Self::Date)
    }

    /// Get the display name for this type.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Bool => "Bool",
            Self::Int64 => "Int64",
            Self::Float64 => "Float64",
            Self::String => "String",
            Self::Binary => "Binary",
            Self::Date => "Date",
            Self::Timestamp => "Timestamp",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
