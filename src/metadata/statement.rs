//! Named read-only statements understood by every provider.
//!
//! The discovery engine never builds SQL text. It asks for one of these
//! statements and passes identifiers and limits as positional parameters;
//! the provider renders them for its engine.
//!
//! | Statement | Parameters | Result fields |
//! |-----------|------------|---------------|
//! | `Ping` | – | `ok` |
//! | `ListBaseTables` | – | `table_schema`, `table_name` |
//! | `TableRowCount` | schema, table | `row_count` |
//! | `TableColumns` | schema, table | `column_name`, `data_type`, `is_nullable`, `ordinal_position`, `character_maximum_length`, `numeric_precision`, `numeric_scale` |
//! | `ColumnStatistics` | schema, table, column | `total_count`, `non_null_count`, `distinct_count` |
//! | `SampleValues` | schema, table, column, limit | `value` |
//! | `DeclaredPrimaryKeys` | – | `table_schema`, `table_name`, `constraint_name`, `column_name`, `ordinal_position` |
//! | `DeclaredForeignKeys` | – | `constraint_name`, `source_schema`, `source_table`, `source_column`, `target_schema`, `target_table`, `target_column`, `update_rule`, `delete_rule` |
//! | `ValueOverlap` | source schema, table, column, target schema, table, column, limit | `sample_count`, `match_count` |
//! | `RelationshipProfile` | source schema, table, column, target schema, table, column | see [`Statement::RelationshipProfile`] |

use std::fmt;

/// A read-only statement the discovery engine can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statement {
    /// Connectivity check; returns one row.
    Ping,
    /// All user base tables (views and system catalogs excluded).
    ListBaseTables,
    /// Exact row count of one table.
    TableRowCount,
    /// Column metadata of one table in ordinal order.
    TableColumns,
    /// Total, non-null and distinct counts of one column.
    ColumnStatistics,
    /// Up to `limit` distinct non-null values of one column.
    SampleValues,
    /// Primary key constraint columns, one row per key column.
    DeclaredPrimaryKeys,
    /// Foreign key constraint columns, one row per referencing column.
    DeclaredForeignKeys,
    /// Sample up to `limit` distinct non-null source values and count how
    /// many appear among the distinct target values.
    ValueOverlap,
    /// Joined statistics for a source → target column pair:
    /// `source_total_rows`, `source_distinct_values`, `source_non_null_values`,
    /// `target_total_rows`, `target_distinct_values`, `target_non_null_values`,
    /// `matching_records`, `matching_distinct_source`, `matching_distinct_target`,
    /// `orphaned_records`.
    RelationshipProfile,
}

impl Statement {
    /// Stable statement name, used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Statement::Ping => "ping",
            Statement::ListBaseTables => "list_base_tables",
            Statement::TableRowCount => "table_row_count",
            Statement::TableColumns => "table_columns",
            Statement::ColumnStatistics => "column_statistics",
            Statement::SampleValues => "sample_values",
            Statement::DeclaredPrimaryKeys => "declared_primary_keys",
            Statement::DeclaredForeignKeys => "declared_foreign_keys",
            Statement::ValueOverlap => "value_overlap",
            Statement::RelationshipProfile => "relationship_profile",
        }
    }

    /// Number of positional parameters the statement takes.
    pub fn arity(&self) -> usize {
        match self {
            Statement::Ping
            | Statement::ListBaseTables
            | Statement::DeclaredPrimaryKeys
            | Statement::DeclaredForeignKeys => 0,
            Statement::TableRowCount | Statement::TableColumns => 2,
            Statement::ColumnStatistics => 3,
            Statement::SampleValues => 4,
            Statement::RelationshipProfile => 6,
            Statement::ValueOverlap => 7,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
