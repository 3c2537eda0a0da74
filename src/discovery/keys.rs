//! Primary key reconciliation.
//!
//! Two independent passes:
//!
//! 1. **Declared**: primary key constraints read from the catalog.
//! 2. **Natural**: columns measured to be exactly unique and non-null.
//!
//! The passes are then compared table by table, and their union becomes the
//! [`KeySet`]: the only columns relationship matching may target.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::Thresholds;

use super::collector::DeclaredPrimaryKey;
use super::rules::{key_score, normalize_type, KeyFacts, ScoreAdjustment, TypeFamily};
use super::types::{ColumnRef, TableProfile, TableRef};

/// Score given to declared single-column keys.
pub const DECLARED_KEY_SCORE: u8 = 100;

/// How a key column is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPattern {
    SimpleId,
    PrefixedId,
    KeyPattern,
    UuidPattern,
    Unknown,
}

/// Broad category of a key's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyTypeCategory {
    AutoIncrement,
    Numeric,
    Uuid,
    String,
    Unknown,
}

/// Best guess at how key values are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    DatabaseSequence,
    ApplicationGenerated,
    UuidGenerator,
    BusinessKey,
    Unknown,
}

/// Descriptive traits of a key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyCharacteristics {
    pub naming_pattern: NamingPattern,
    pub type_category: KeyTypeCategory,
    pub generation_method: GenerationMethod,
}

impl KeyCharacteristics {
    pub fn analyze(column: &str, data_type: &str) -> Self {
        let name = column.to_lowercase();
        let naming_pattern = if name == "id" {
            NamingPattern::SimpleId
        } else if name.ends_with("_id") {
            NamingPattern::PrefixedId
        } else if name.contains("key") {
            NamingPattern::KeyPattern
        } else if name.contains("uuid") || name.contains("guid") {
            NamingPattern::UuidPattern
        } else {
            NamingPattern::Unknown
        };

        let normalized = normalize_type(data_type);
        let (type_category, generation_method) = match super::rules::type_family(data_type) {
            TypeFamily::Integer if normalized.ends_with("serial") => {
                (KeyTypeCategory::AutoIncrement, GenerationMethod::DatabaseSequence)
            }
            // SQLite rowid aliases are sequence-generated.
            TypeFamily::Integer if normalized == "integer" && name == "id" => {
                (KeyTypeCategory::AutoIncrement, GenerationMethod::DatabaseSequence)
            }
            TypeFamily::Integer => (KeyTypeCategory::Numeric, GenerationMethod::ApplicationGenerated),
            TypeFamily::Uuid => (KeyTypeCategory::Uuid, GenerationMethod::UuidGenerator),
            TypeFamily::String => (KeyTypeCategory::String, GenerationMethod::BusinessKey),
            _ => (KeyTypeCategory::Unknown, GenerationMethod::Unknown),
        };

        Self {
            naming_pattern,
            type_category,
            generation_method,
        }
    }
}

/// Where a key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrigin {
    Declared,
    Natural,
    /// Declared and empirically confirmed.
    Both,
}

/// A column believed to identify rows of its table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyCandidate {
    pub column: ColumnRef,
    pub data_type: String,
    pub score: u8,
    pub origin: KeyOrigin,
    pub row_count: u64,
    pub characteristics: KeyCharacteristics,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<ScoreAdjustment>,
}

/// Natural pass: every exactly unique, non-null column of a non-empty table.
pub fn natural_keys(profiles: &[TableProfile], thresholds: &Thresholds) -> Vec<KeyCandidate> {
    let mut keys = Vec::new();
    for profile in profiles {
        for column in &profile.columns {
            if !column.statistics.is_unique_non_null() {
                continue;
            }
            let meta = &column.metadata;
            let scored = key_score(&KeyFacts {
                column: &meta.column,
                data_type: &meta.data_type,
                row_count: column.statistics.total_count,
                large_table_rows: thresholds.large_table_rows,
            });
            if scored.score < thresholds.min_key_score {
                continue;
            }
            keys.push(KeyCandidate {
                column: meta.column_ref(),
                data_type: meta.data_type.clone(),
                score: scored.score,
                origin: KeyOrigin::Natural,
                row_count: column.statistics.total_count,
                characteristics: KeyCharacteristics::analyze(&meta.column, &meta.data_type),
                adjustments: scored.adjustments,
            });
        }
    }
    keys
}

/// Result of comparing declared and natural keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyReconciliation {
    pub total_tables: usize,
    pub tables_with_declared_key: usize,
    pub tables_with_natural_key: usize,
    /// Declared single-column keys that are also natural keys.
    pub matching: Vec<ColumnRef>,
    pub declared_only: Vec<ColumnRef>,
    pub natural_only: Vec<ColumnRef>,
    /// Multi-column declared keys, excluded from the comparison.
    pub composite_keys: Vec<DeclaredPrimaryKey>,
    /// Tables with no declared and no natural key.
    pub tables_without_keys: Vec<TableRef>,
}

/// Compare the declared and natural passes.
pub fn reconcile(
    tables: &[TableRef],
    declared: &[DeclaredPrimaryKey],
    natural: &[KeyCandidate],
) -> KeyReconciliation {
    let declared_set: BTreeSet<ColumnRef> =
        declared.iter().filter_map(DeclaredPrimaryKey::single_column).collect();
    let natural_set: BTreeSet<ColumnRef> = natural.iter().map(|k| k.column.clone()).collect();

    let declared_tables: BTreeSet<TableRef> = declared.iter().map(|pk| pk.table.clone()).collect();
    let natural_tables: BTreeSet<TableRef> = natural.iter().map(|k| k.column.table_ref()).collect();

    let tables_without_keys = tables
        .iter()
        .filter(|t| !declared_tables.contains(*t) && !natural_tables.contains(*t))
        .cloned()
        .collect();

    KeyReconciliation {
        total_tables: tables.len(),
        tables_with_declared_key: declared_tables.len(),
        tables_with_natural_key: natural_tables.len(),
        matching: declared_set.intersection(&natural_set).cloned().collect(),
        declared_only: declared_set.difference(&natural_set).cloned().collect(),
        natural_only: natural_set.difference(&declared_set).cloned().collect(),
        composite_keys: declared.iter().filter(|pk| pk.is_composite()).cloned().collect(),
        tables_without_keys,
    }
}

/// Every relationship target of a run: declared single-column keys plus
/// natural keys, one entry per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeySet {
    keys: BTreeMap<ColumnRef, KeyCandidate>,
}

impl KeySet {
    /// Union the two passes. Declared types come from the table profiles;
    /// a declared key on an unprofiled table keeps an empty type.
    pub fn build(
        declared: &[DeclaredPrimaryKey],
        natural: Vec<KeyCandidate>,
        profiles: &[TableProfile],
    ) -> Self {
        let mut keys: BTreeMap<ColumnRef, KeyCandidate> = natural
            .into_iter()
            .map(|key| (key.column.clone(), key))
            .collect();

        for column in declared.iter().filter_map(DeclaredPrimaryKey::single_column) {
            if let Some(existing) = keys.get_mut(&column) {
                existing.origin = KeyOrigin::Both;
                existing.score = DECLARED_KEY_SCORE;
                continue;
            }

            let profile = profiles.iter().find(|p| p.table == column.table_ref());
            let data_type = profile
                .and_then(|p| p.column(&column.column))
                .map(|c| c.metadata.data_type.clone())
                .unwrap_or_default();
            let row_count = profile.map(|p| p.row_count).unwrap_or_default();

            keys.insert(
                column.clone(),
                KeyCandidate {
                    characteristics: KeyCharacteristics::analyze(&column.column, &data_type),
                    column,
                    data_type,
                    score: DECLARED_KEY_SCORE,
                    origin: KeyOrigin::Declared,
                    row_count,
                    adjustments: Vec::new(),
                },
            );
        }

        Self { keys }
    }

    pub fn contains(&self, column: &ColumnRef) -> bool {
        self.keys.contains_key(column)
    }

    pub fn get(&self, column: &ColumnRef) -> Option<&KeyCandidate> {
        self.keys.get(column)
    }

    /// Keys in column order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyCandidate> {
        self.keys.values()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
