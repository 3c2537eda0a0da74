//! Typed records shared by the discovery analyses.
//!
//! Raw provider rows are decoded into these shapes once, in the collector.
//! Nothing downstream of the collector reads a [`Row`](crate::metadata::Row).

use serde::Serialize;
use std::fmt;

use crate::metadata::Value;

use super::rules::{type_family, TypeFamily};

/// A base table, qualified by schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Reference a column of this table.
    pub fn column(&self, column: impl Into<String>) -> ColumnRef {
        ColumnRef {
            schema: self.schema.clone(),
            table: self.table.clone(),
            column: column.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// A fully-qualified column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ColumnRef {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    /// The owning table.
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.schema.clone(), self.table.clone())
    }

    /// Positional parameters `(schema, table, column)` for statements.
    pub fn params(&self) -> [Value; 3] {
        [
            Value::from(self.schema.as_str()),
            Value::from(self.table.as_str()),
            Value::from(self.column.as_str()),
        ]
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.column)
    }
}

/// Catalog description of one column at scan time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMetadata {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub data_type: String,
    pub nullable: bool,
    pub ordinal_position: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_maximum_length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_precision: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_scale: Option<i64>,
}

impl ColumnMetadata {
    pub fn column_ref(&self) -> ColumnRef {
        ColumnRef::new(self.schema.clone(), self.table.clone(), self.column.clone())
    }

    pub fn type_family(&self) -> TypeFamily {
        type_family(&self.data_type)
    }
}

/// Counts measured for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnStatistics {
    pub total_count: u64,
    pub non_null_count: u64,
    pub distinct_count: u64,
    pub null_percentage: f64,
    pub distinct_percentage: f64,
}

impl ColumnStatistics {
    /// Build statistics and derive the percentages.
    ///
    /// Both percentages are 0 for an empty table.
    pub fn new(total_count: u64, non_null_count: u64, distinct_count: u64) -> Self {
        let null_count = total_count.saturating_sub(non_null_count);
        Self {
            total_count,
            non_null_count,
            distinct_count,
            null_percentage: percentage(null_count, total_count),
            distinct_percentage: percentage(distinct_count, total_count),
        }
    }

    pub fn null_count(&self) -> u64 {
        self.total_count.saturating_sub(self.non_null_count)
    }

    /// Exactly unique and non-null over a non-empty table.
    pub fn is_unique_non_null(&self) -> bool {
        self.total_count > 0
            && self.distinct_count == self.total_count
            && self.non_null_count == self.total_count
    }
}

/// `part / whole * 100`, or 0 when `whole` is 0.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Round to two decimals for reporting.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A data-quality problem found while profiling a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum DataQualityIssue {
    HighNullRate { null_percentage: f64 },
    ExtremeNullRate { null_percentage: f64 },
    SingleValue,
}

/// Best guess at what a column is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPurpose {
    PrimaryKeyCandidate,
    ForeignKeyCandidate,
    AuditTimestamp,
    BusinessTimestamp,
    Categorical,
    Unknown,
}

/// One profiled column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub metadata: ColumnMetadata,
    pub statistics: ColumnStatistics,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<Value>,
    pub purpose: ColumnPurpose,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DataQualityIssue>,
}

impl ColumnProfile {
    pub fn column_ref(&self) -> ColumnRef {
        self.metadata.column_ref()
    }
}

/// One profiled base table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableProfile {
    pub table: TableRef,
    pub row_count: u64,
    pub columns: Vec<ColumnProfile>,
}

impl TableProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns
            .iter()
            .find(|c| c.metadata.column.eq_ignore_ascii_case(name))
    }
}
