//! Column statistics collector.
//!
//! The collector issues every catalog and table statement discovery needs and
//! decodes the provider's rows into typed records. It never swallows errors:
//! any [`MetadataError`] goes back to the caller, which decides whether the
//! failure costs a column, a table or a whole analysis unit.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Thresholds;
use crate::metadata::{
    MetadataError, MetadataProvider, MetadataProviderExt, MetadataResult, Row, Statement, Value,
};

use super::cardinality::RelationshipStats;
use super::rules::TypeFamily;
use super::types::{
    ColumnMetadata, ColumnProfile, ColumnPurpose, ColumnRef, ColumnStatistics, DataQualityIssue,
    TableProfile, TableRef,
};

/// Distinct values below which a string column reads as categorical.
const CATEGORICAL_DISTINCT_LIMIT: u64 = 20;

/// A primary key constraint as declared in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredPrimaryKey {
    pub table: TableRef,
    pub constraint_name: String,
    /// Key columns in key order.
    pub columns: Vec<String>,
}

impl DeclaredPrimaryKey {
    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }

    /// The key column of a single-column key.
    pub fn single_column(&self) -> Option<ColumnRef> {
        match self.columns.as_slice() {
            [column] => Some(self.table.column(column.clone())),
            _ => None,
        }
    }
}

/// A foreign key constraint as declared in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredForeignKey {
    pub constraint_name: String,
    pub source: TableRef,
    pub target: TableRef,
    /// `(source column, target column)` pairs in constraint order.
    pub columns: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_rule: Option<String>,
}

impl DeclaredForeignKey {
    pub fn is_self_referential(&self) -> bool {
        self.source == self.target
    }

    pub fn is_composite(&self) -> bool {
        self.columns.len() > 1
    }

    /// `(source, target)` columns of a single-column constraint.
    pub fn single_pair(&self) -> Option<(ColumnRef, ColumnRef)> {
        match self.columns.as_slice() {
            [(source, target)] => Some((
                self.source.column(source.clone()),
                self.target.column(target.clone()),
            )),
            _ => None,
        }
    }
}

/// Result of a sampled value-overlap check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValueOverlap {
    pub sample_count: u64,
    pub match_count: u64,
}

impl ValueOverlap {
    /// Share of sampled values found in the target, 0–100.
    pub fn match_percentage(&self) -> f64 {
        super::types::percentage(self.match_count, self.sample_count)
    }
}

/// Reads catalog metadata and column statistics for one environment.
#[derive(Clone, Copy)]
pub struct Collector<'a> {
    provider: &'a dyn MetadataProvider,
    environment: &'a str,
}

impl<'a> Collector<'a> {
    pub fn new(provider: &'a dyn MetadataProvider, environment: &'a str) -> Self {
        Self {
            provider,
            environment,
        }
    }

    pub fn environment(&self) -> &str {
        self.environment
    }

    async fn rows(&self, statement: Statement, params: &[Value]) -> MetadataResult<Vec<Row>> {
        self.provider.query(self.environment, statement, params).await
    }

    async fn row(&self, statement: Statement, params: &[Value]) -> MetadataResult<Row> {
        self.provider.query_one(self.environment, statement, params).await
    }

    /// Check the environment answers at all.
    pub async fn ping(&self) -> MetadataResult<()> {
        self.provider.ping(self.environment).await
    }

    /// All user base tables, sorted.
    pub async fn list_tables(&self) -> MetadataResult<Vec<TableRef>> {
        let mut tables = self
            .rows(Statement::ListBaseTables, &[])
            .await?
            .iter()
            .map(|row| Ok(TableRef::new(row.text("table_schema")?, row.text("table_name")?)))
            .collect::<MetadataResult<Vec<_>>>()?;
        tables.sort();
        Ok(tables)
    }

    pub async fn row_count(&self, table: &TableRef) -> MetadataResult<u64> {
        self.row(Statement::TableRowCount, &table_params(table))
            .await?
            .count("row_count")
    }

    /// Column metadata in ordinal order.
    pub async fn columns(&self, table: &TableRef) -> MetadataResult<Vec<ColumnMetadata>> {
        self.rows(Statement::TableColumns, &table_params(table))
            .await?
            .iter()
            .map(|row| decode_column(table, row))
            .collect()
    }

    /// Total, non-null and distinct counts for one column.
    pub async fn column_statistics(&self, column: &ColumnRef) -> MetadataResult<ColumnStatistics> {
        let row = self.row(Statement::ColumnStatistics, &column.params()).await?;
        let total = row.count("total_count")?;
        let non_null = row.count("non_null_count")?;
        let distinct = row.count("distinct_count")?;
        if non_null > total || distinct > non_null {
            return Err(MetadataError::query(
                Statement::ColumnStatistics.name(),
                format!(
                    "inconsistent counts for {}: total={} non_null={} distinct={}",
                    column, total, non_null, distinct
                ),
            ));
        }
        Ok(ColumnStatistics::new(total, non_null, distinct))
    }

    /// Up to `limit` distinct non-null values.
    pub async fn sample_values(&self, column: &ColumnRef, limit: usize) -> MetadataResult<Vec<Value>> {
        let [schema, table, name] = column.params();
        let params = [schema, table, name, Value::from(limit)];
        let mut values = Vec::new();
        for row in self.rows(Statement::SampleValues, &params).await? {
            let value = row
                .get("value")
                .cloned()
                .ok_or_else(|| MetadataError::MissingField("value".to_string()))?;
            values.push(value);
        }
        Ok(values)
    }

    /// Declared primary keys, one record per constraint.
    pub async fn declared_primary_keys(&self) -> MetadataResult<Vec<DeclaredPrimaryKey>> {
        let mut grouped: BTreeMap<(TableRef, String), Vec<(i64, String)>> = BTreeMap::new();
        for row in self.rows(Statement::DeclaredPrimaryKeys, &[]).await? {
            let table = TableRef::new(row.text("table_schema")?, row.text("table_name")?);
            let constraint = row.text("constraint_name")?;
            let position = row.opt_i64("ordinal_position")?.unwrap_or_default();
            grouped
                .entry((table, constraint))
                .or_default()
                .push((position, row.text("column_name")?));
        }

        Ok(grouped
            .into_iter()
            .map(|((table, constraint_name), mut columns)| {
                columns.sort();
                DeclaredPrimaryKey {
                    table,
                    constraint_name,
                    columns: columns.into_iter().map(|(_, c)| c).collect(),
                }
            })
            .collect())
    }

    /// Declared foreign keys, one record per constraint.
    pub async fn declared_foreign_keys(&self) -> MetadataResult<Vec<DeclaredForeignKey>> {
        let mut grouped: BTreeMap<(TableRef, String), DeclaredForeignKey> = BTreeMap::new();
        for row in self.rows(Statement::DeclaredForeignKeys, &[]).await? {
            let source = TableRef::new(row.text("source_schema")?, row.text("source_table")?);
            let constraint_name = row.text("constraint_name")?;
            let pair = (row.text("source_column")?, row.text("target_column")?);

            match grouped.get_mut(&(source.clone(), constraint_name.clone())) {
                Some(fk) => fk.columns.push(pair),
                None => {
                    let fk = DeclaredForeignKey {
                        constraint_name: constraint_name.clone(),
                        source: source.clone(),
                        target: TableRef::new(row.text("target_schema")?, row.text("target_table")?),
                        columns: vec![pair],
                        update_rule: row.opt_text("update_rule")?,
                        delete_rule: row.opt_text("delete_rule")?,
                    };
                    grouped.insert((source, constraint_name), fk);
                }
            }
        }
        Ok(grouped.into_values().collect())
    }

    /// Sample source values and count how many exist in the target.
    pub async fn value_overlap(
        &self,
        source: &ColumnRef,
        target: &ColumnRef,
        sample_size: usize,
    ) -> MetadataResult<ValueOverlap> {
        let params = pair_params(source, target, Some(sample_size));
        let row = self.row(Statement::ValueOverlap, &params).await?;
        Ok(ValueOverlap {
            sample_count: row.count("sample_count")?,
            match_count: row.count("match_count")?,
        })
    }

    /// Joined statistics for cardinality classification.
    pub async fn relationship_stats(
        &self,
        source: &ColumnRef,
        target: &ColumnRef,
    ) -> MetadataResult<RelationshipStats> {
        let row = self
            .row(Statement::RelationshipProfile, &pair_params(source, target, None))
            .await?;
        Ok(RelationshipStats {
            source_total_rows: row.count("source_total_rows")?,
            source_distinct_values: row.count("source_distinct_values")?,
            source_non_null_values: row.count("source_non_null_values")?,
            target_total_rows: row.count("target_total_rows")?,
            target_distinct_values: row.count("target_distinct_values")?,
            target_non_null_values: row.count("target_non_null_values")?,
            matching_records: row.count("matching_records")?,
            matching_distinct_source: row.count("matching_distinct_source")?,
            matching_distinct_target: row.count("matching_distinct_target")?,
            orphaned_records: row.count("orphaned_records")?,
        })
    }

    /// Profile every column of a table.
    ///
    /// Fails on the first statement error; a table is profiled completely or
    /// not at all.
    pub async fn profile_table(
        &self,
        table: &TableRef,
        sample_values: usize,
        thresholds: &Thresholds,
    ) -> MetadataResult<TableProfile> {
        let row_count = self.row_count(table).await?;
        let metadata = self.columns(table).await?;

        let mut columns = Vec::with_capacity(metadata.len());
        for meta in metadata {
            let column = meta.column_ref();
            let statistics = self.column_statistics(&column).await?;
            let samples = if sample_values > 0 && statistics.non_null_count > 0 {
                self.sample_values(&column, sample_values).await?
            } else {
                Vec::new()
            };

            columns.push(ColumnProfile {
                purpose: column_purpose(&meta, &statistics),
                issues: quality_issues(&statistics, thresholds),
                metadata: meta,
                statistics,
                samples,
            });
        }

        tracing::debug!(table = %table, rows = row_count, columns = columns.len(), "profiled table");

        Ok(TableProfile {
            table: table.clone(),
            row_count,
            columns,
        })
    }
}

fn table_params(table: &TableRef) -> [Value; 2] {
    [
        Value::from(table.schema.as_str()),
        Value::from(table.table.as_str()),
    ]
}

fn pair_params(source: &ColumnRef, target: &ColumnRef, limit: Option<usize>) -> Vec<Value> {
    let mut params: Vec<Value> = source.params().into_iter().chain(target.params()).collect();
    if let Some(limit) = limit {
        params.push(Value::from(limit));
    }
    params
}

fn decode_column(table: &TableRef, row: &Row) -> MetadataResult<ColumnMetadata> {
    let ordinal = row.opt_i64("ordinal_position")?.unwrap_or_default();
    Ok(ColumnMetadata {
        schema: table.schema.clone(),
        table: table.table.clone(),
        column: row.text("column_name")?,
        data_type: row.opt_text("data_type")?.unwrap_or_default(),
        nullable: row.flag("is_nullable")?,
        ordinal_position: u32::try_from(ordinal).unwrap_or_default(),
        character_maximum_length: row.opt_i64("character_maximum_length")?,
        numeric_precision: row.opt_i64("numeric_precision")?,
        numeric_scale: row.opt_i64("numeric_scale")?,
    })
}

/// Guess a column's role from its name, type and counts.
pub fn column_purpose(meta: &ColumnMetadata, stats: &ColumnStatistics) -> ColumnPurpose {
    let name = meta.column.to_lowercase();
    let family = meta.type_family();

    if stats.is_unique_non_null() {
        ColumnPurpose::PrimaryKeyCandidate
    } else if (name.contains("_id") || name.ends_with("id")) && family == TypeFamily::Integer {
        ColumnPurpose::ForeignKeyCandidate
    } else if family == TypeFamily::Temporal {
        if name.contains("created") || name.contains("updated") {
            ColumnPurpose::AuditTimestamp
        } else {
            ColumnPurpose::BusinessTimestamp
        }
    } else if family == TypeFamily::String
        && stats.distinct_count > 0
        && stats.distinct_count < CATEGORICAL_DISTINCT_LIMIT
    {
        ColumnPurpose::Categorical
    } else {
        ColumnPurpose::Unknown
    }
}

/// Data-quality issues visible in a column's statistics.
pub fn quality_issues(stats: &ColumnStatistics, thresholds: &Thresholds) -> Vec<DataQualityIssue> {
    let mut issues = Vec::new();
    if stats.null_percentage > thresholds.high_null_percentage {
        issues.push(DataQualityIssue::HighNullRate {
            null_percentage: super::types::round2(stats.null_percentage),
        });
    }
    if stats.null_percentage > thresholds.extreme_null_percentage {
        issues.push(DataQualityIssue::ExtremeNullRate {
            null_percentage: super::types::round2(stats.null_percentage),
        });
    }
    if stats.distinct_count == 1 && stats.total_count > 1 {
        issues.push(DataQualityIssue::SingleValue);
    }
    issues
}
