//! Logical schema types
//!
//! The logical schema is the connector's portable view of a table:
//! column names and coarse type tags, independent of any warehouse's
//! native type system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portable column type tag
///
/// Upstream ingestion infers these from incoming events. Every value has
/// a warehouse mapping; types the mapping table does not know fall back
/// to `String` on translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    /// Boolean type
    Bool,

    /// Integer type (any precision)
    Int,

    /// Floating point (any precision)
    Float,

    /// String/text type
    String,

    /// Date (no time component)
    Date,

    /// Timestamp (with time component)
    Timestamp,

    /// JSON/semi-structured type
    Json,

    /// Unknown type (cannot infer)
    Unknown,
}

impl std::fmt::Display for LogicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "BOOL"),
            Self::Int => write!(f, "INT"),
            Self::Float => write!(f, "FLOAT"),
            Self::String => write!(f, "STRING"),
            Self::Date => write!(f, "DATE"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Json => write!(f, "JSON"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A named table in the logical schema
///
/// Column names are unique and column order carries no meaning, so the
/// columns live in a map keyed by name. Instances are immutable inputs to
/// the connector for the duration of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalTable {
    /// Table name, unique within the configured dataset
    pub name: String,

    /// Column name to type tag
    pub columns: BTreeMap<String, LogicalType>,
}

impl LogicalTable {
    /// Create a new table with no columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Add a column, replacing any previous type for the same name
    pub fn with_column(mut self, name: impl Into<String>, logical_type: LogicalType) -> Self {
        self.columns.insert(name.into(), logical_type);
        self
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Look up a column's type by name
    pub fn column_type(&self, name: &str) -> Option<LogicalType> {
        self.columns.get(name).copied()
    }

    /// Column names in map order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(|n| n.as_str()).collect()
    }
}
