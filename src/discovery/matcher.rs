//! Foreign key candidate matching.
//!
//! For one key column, every profiled column in the database is a potential
//! reference to it. Candidates are scored from the rule table, filtered on
//! score and name similarity without touching the database, and the survivors
//! are validated against sampled value overlap before being classified.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::{DiscoverySettings, Thresholds};
use crate::metadata::MetadataResult;

use super::cardinality::{classify_relationship, CardinalityResult};
use super::collector::{Collector, DeclaredForeignKey};
use super::inflection::singular_table_name;
use super::keys::{KeyCandidate, KeySet};
use super::rules::{
    naming_pattern, relationship_score, types_compatible, RelationshipFacts, RuleScore,
    ScoreAdjustment,
};
use super::types::{round2, ColumnMetadata, ColumnProfile, ColumnRef, TableProfile};

/// Confidence score given to declared relationships.
pub const DECLARED_RELATIONSHIP_SCORE: u8 = 100;

/// Key column names too generic to be referenced by a same-named key.
const GENERIC_KEY_NAMES: &[&str] = &["id", "key", "pk"];

/// Validation tier of an inferred relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

/// Assign a tier from overlap percentage and name similarity, or `None`
/// when the evidence is too weak to keep the candidate.
pub fn assign_tier(match_percentage: f64, name_score: f64, t: &Thresholds) -> Option<ConfidenceTier> {
    if match_percentage >= t.high_match_percentage && name_score >= t.high_name_score {
        Some(ConfidenceTier::High)
    } else if match_percentage >= t.medium_match_percentage && name_score >= t.medium_name_score {
        Some(ConfidenceTier::Medium)
    } else if match_percentage >= t.low_match_percentage && name_score >= t.low_name_score {
        Some(ConfidenceTier::Low)
    } else {
        None
    }
}

/// Similarity of a source column name to a target column name, 0–1.
pub fn name_similarity(source: &str, target: &str, target_table: &str) -> f64 {
    let s = source.to_lowercase();
    let t = target.to_lowercase();
    if s.is_empty() || t.is_empty() {
        return 0.0;
    }
    if s == t {
        return 1.0;
    }
    if s.ends_with("_id") && t == "id" {
        return 0.9;
    }

    let table = target_table.to_lowercase();
    let singular = singular_table_name(&table);
    if s == format!("{}_id", t)
        || t == format!("{}_id", s)
        || s == format!("{}_{}", singular, t)
        || s == format!("{}_{}", table, t)
    {
        return 0.8;
    }
    if s.contains(&t) || t.contains(&s) {
        return 0.6;
    }

    let sc: HashSet<char> = s.chars().collect();
    let tc: HashSet<char> = t.chars().collect();
    let common = sc.intersection(&tc).count();
    let longer = s.chars().count().max(t.chars().count());
    common as f64 / longer as f64 * 0.5
}

/// Where a relationship came from, with origin-specific evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum RelationshipOrigin {
    Declared {
        constraint_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        update_rule: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        delete_rule: Option<String>,
        self_referential: bool,
    },
    Inferred {
        #[serde(skip_serializing_if = "Option::is_none")]
        naming_pattern: Option<&'static str>,
        name_score: f64,
        sample_count: u64,
        match_count: u64,
        match_percentage: f64,
        tier: ConfidenceTier,
    },
}

/// A directed edge from a source column to a key column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipCandidate {
    pub source: ColumnRef,
    pub target: ColumnRef,
    pub confidence: u8,
    pub naming_match: bool,
    pub type_match: bool,
    #[serde(flatten)]
    pub origin: RelationshipOrigin,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<ScoreAdjustment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<CardinalityResult>,
}

impl RelationshipCandidate {
    pub fn is_declared(&self) -> bool {
        matches!(self.origin, RelationshipOrigin::Declared { .. })
    }

    pub fn tier(&self) -> Option<ConfidenceTier> {
        match self.origin {
            RelationshipOrigin::Inferred { tier, .. } => Some(tier),
            RelationshipOrigin::Declared { .. } => None,
        }
    }

    /// A declared single-column foreign key whose target is a known key.
    pub fn declared(
        fk: &DeclaredForeignKey,
        source: ColumnRef,
        target: &KeyCandidate,
        source_metadata: Option<&ColumnMetadata>,
        cardinality: CardinalityResult,
    ) -> Self {
        let naming_match =
            naming_pattern(&target.column.table, &target.column.column, &source.column).is_some();
        let type_match = source_metadata
            .map(|m| types_compatible(&m.data_type, &target.data_type))
            .unwrap_or(false);

        Self {
            source,
            target: target.column.clone(),
            confidence: DECLARED_RELATIONSHIP_SCORE,
            naming_match,
            type_match,
            origin: RelationshipOrigin::Declared {
                constraint_name: fk.constraint_name.clone(),
                update_rule: fk.update_rule.clone(),
                delete_rule: fk.delete_rule.clone(),
                self_referential: fk.is_self_referential(),
            },
            adjustments: Vec::new(),
            cardinality: Some(cardinality),
        }
    }
}

/// A candidate that passed the offline filters and awaits validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub source: ColumnRef,
    pub naming_pattern: Option<&'static str>,
    pub type_match: bool,
    pub score: RuleScore,
    pub name_score: f64,
}

/// Inputs shared by every matching unit of a run.
pub struct MatchScope<'a> {
    pub profiles: &'a [TableProfile],
    pub keys: &'a KeySet,
    /// `(source, target)` pairs already covered by declared constraints.
    pub declared_pairs: &'a HashSet<(ColumnRef, ColumnRef)>,
}

impl MatchScope<'_> {
    /// Whether `column`'s name follows a naming pattern for a key other
    /// than `target`.
    fn claimed_elsewhere(&self, column: &str, target: &ColumnRef) -> bool {
        self.keys.iter().any(|key| {
            key.column != *target
                && naming_pattern(&key.column.table, &key.column.column, column).is_some()
        })
    }

    /// Whether `column` is already the source of a declared foreign key.
    fn is_declared_source(&self, column: &ColumnRef) -> bool {
        self.declared_pairs.iter().any(|(source, _)| source == column)
    }

    fn is_generic_key_twin(&self, candidate: &ColumnProfile, target: &KeyCandidate) -> bool {
        let name = candidate.metadata.column.to_lowercase();
        GENERIC_KEY_NAMES.contains(&name.as_str())
            && name == target.column.column.to_lowercase()
            && self.keys.contains(&candidate.column_ref())
    }
}

/// Offline pass: score every column against `target` and keep the ones
/// worth a value-overlap query.
pub fn find_candidates(
    target: &KeyCandidate,
    scope: &MatchScope<'_>,
    thresholds: &Thresholds,
) -> Vec<ScoredCandidate> {
    let mut candidates = Vec::new();
    // A declared reference column is not itself a referenced key.
    if scope.is_declared_source(&target.column) {
        return candidates;
    }

    for column in scope.profiles.iter().flat_map(|p| p.columns.iter()) {
        let source = column.column_ref();
        if source == target.column
            || scope.is_declared_source(&source)
            || column.statistics.non_null_count == 0
            || scope.is_generic_key_twin(column, target)
        {
            continue;
        }

        let meta = &column.metadata;
        let pattern = naming_pattern(&target.column.table, &target.column.column, &meta.column);
        let type_match = types_compatible(&meta.data_type, &target.data_type);
        if pattern.is_none() && !type_match {
            continue;
        }
        if pattern.is_none() && scope.claimed_elsewhere(&meta.column, &target.column) {
            continue;
        }

        let score = relationship_score(&RelationshipFacts {
            candidate_column: &meta.column,
            candidate_nullable: meta.nullable,
            target_data_type: &target.data_type,
            type_match,
            naming_match: pattern.is_some(),
        });
        if score.score < thresholds.min_candidate_score {
            continue;
        }

        let name_score = name_similarity(&meta.column, &target.column.column, &target.column.table);
        if name_score < thresholds.low_name_score {
            continue;
        }

        candidates.push(ScoredCandidate {
            source,
            naming_pattern: pattern,
            type_match,
            score,
            name_score: round2(name_score),
        });
    }

    candidates
}

/// Find, validate and classify undeclared references to one key column.
///
/// An overlap query error fails the whole unit; a cardinality failure only
/// marks that relationship as `analysis_failed`.
pub async fn match_foreign_keys(
    collector: &Collector<'_>,
    target: &KeyCandidate,
    scope: &MatchScope<'_>,
    settings: &DiscoverySettings,
) -> MetadataResult<Vec<RelationshipCandidate>> {
    let thresholds = &settings.thresholds;
    let mut relationships = Vec::new();

    for candidate in find_candidates(target, scope, thresholds) {
        let overlap = collector
            .value_overlap(&candidate.source, &target.column, settings.sample_size)
            .await?;
        let match_percentage = overlap.match_percentage();

        let Some(tier) = assign_tier(match_percentage, candidate.name_score, thresholds) else {
            tracing::debug!(
                source = %candidate.source,
                target = %target.column,
                match_percentage,
                "candidate rejected by overlap validation"
            );
            continue;
        };

        let cardinality =
            classify_relationship(collector, &candidate.source, &target.column, thresholds).await;

        relationships.push(RelationshipCandidate {
            source: candidate.source,
            target: target.column.clone(),
            confidence: candidate.score.score,
            naming_match: candidate.naming_pattern.is_some(),
            type_match: candidate.type_match,
            origin: RelationshipOrigin::Inferred {
                naming_pattern: candidate.naming_pattern,
                name_score: candidate.name_score,
                sample_count: overlap.sample_count,
                match_count: overlap.match_count,
                match_percentage: round2(match_percentage),
                tier,
            },
            adjustments: candidate.score.adjustments,
            cardinality: Some(cardinality),
        });
    }

    Ok(relationships)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::collector::{column_purpose, quality_issues};
    use crate::discovery::keys::{natural_keys, KeySet};
    use crate::discovery::types::{ColumnStatistics, TableRef};

    fn column(table: &str, name: &str, ty: &str, rows: u64, distinct: u64) -> ColumnProfile {
        let metadata = ColumnMetadata {
            schema: "main".into(),
            table: table.into(),
            column: name.into(),
            data_type: ty.into(),
            nullable: name != "id",
            ordinal_position: 1,
            character_maximum_length: None,
            numeric_precision: None,
            numeric_scale: None,
        };
        let statistics = ColumnStatistics::new(rows, rows, distinct);
        ColumnProfile {
            purpose: column_purpose(&metadata, &statistics),
            issues: quality_issues(&statistics, &Thresholds::default()),
            metadata,
            statistics,
            samples: vec![],
        }
    }

    fn shop() -> Vec<TableProfile> {
        vec![
            TableProfile {
                table: TableRef::new("main", "customers"),
                row_count: 3,
                columns: vec![
                    column("customers", "id", "INTEGER", 3, 3),
                    column("customers", "name", "TEXT", 3, 2),
                ],
            },
            TableProfile {
                table: TableRef::new("main", "orders"),
                row_count: 6,
                columns: vec![
                    column("orders", "id", "INTEGER", 6, 6),
                    column("orders", "customer_id", "INTEGER", 6, 3),
                    column("orders", "quantity", "INTEGER", 6, 4),
                ],
            },
        ]
    }

    #[test]
    fn test_name_similarity() {
        assert_eq!(name_similarity("id", "id", "customers"), 1.0);
        assert_eq!(name_similarity("customer_id", "id", "customers"), 0.9);
        assert_eq!(name_similarity("country_code", "code", "countries"), 0.8);
        assert_eq!(name_similarity("code_id", "code", "things"), 0.8);
        assert_eq!(name_similarity("custid", "id", "customers"), 0.6);
        let weak = name_similarity("quantity", "id", "customers");
        assert!(weak < 0.3, "got {}", weak);
    }

    #[test]
    fn test_assign_tier() {
        let t = Thresholds::default();
        assert_eq!(assign_tier(100.0, 0.9, &t), Some(ConfidenceTier::High));
        assert_eq!(assign_tier(100.0, 0.6, &t), Some(ConfidenceTier::Medium));
        assert_eq!(assign_tier(65.0, 0.9, &t), Some(ConfidenceTier::Medium));
        assert_eq!(assign_tier(35.0, 0.3, &t), Some(ConfidenceTier::Low));
        assert_eq!(assign_tier(20.0, 1.0, &t), None);
        assert_eq!(assign_tier(100.0, 0.2, &t), None);
    }

    #[test]
    fn test_find_candidates_for_customers_id() {
        let profiles = shop();
        let thresholds = Thresholds::default();
        let keys = KeySet::build(&[], natural_keys(&profiles, &thresholds), &profiles);
        let declared = HashSet::new();
        let scope = MatchScope {
            profiles: &profiles,
            keys: &keys,
            declared_pairs: &declared,
        };

        let target = keys.get(&ColumnRef::new("main", "customers", "id")).unwrap();
        let found = find_candidates(target, &scope, &thresholds);

        // orders.id is a same-named key and quantity is too dissimilar.
        assert_eq!(found.len(), 1);
        let c = &found[0];
        assert_eq!(c.source, ColumnRef::new("main", "orders", "customer_id"));
        assert_eq!(c.naming_pattern, Some("singular_table_id"));
        assert!(c.type_match);
        assert!(c.score.score >= 75);
        assert_eq!(c.name_score, 0.9);
    }

    #[test]
    fn test_reference_claimed_by_another_key_is_skipped() {
        let profiles = shop();
        let thresholds = Thresholds::default();
        let keys = KeySet::build(&[], natural_keys(&profiles, &thresholds), &profiles);
        let declared = HashSet::new();
        let scope = MatchScope {
            profiles: &profiles,
            keys: &keys,
            declared_pairs: &declared,
        };

        let target = keys.get(&ColumnRef::new("main", "orders", "id")).unwrap();
        let found = find_candidates(target, &scope, &thresholds);
        assert!(found.iter().all(|c| c.source.column != "customer_id"));
    }

    #[test]
    fn test_declared_pairs_are_skipped() {
        let profiles = shop();
        let thresholds = Thresholds::default();
        let keys = KeySet::build(&[], natural_keys(&profiles, &thresholds), &profiles);
        let mut declared = HashSet::new();
        declared.insert((
            ColumnRef::new("main", "orders", "customer_id"),
            ColumnRef::new("main", "customers", "id"),
        ));
        let scope = MatchScope {
            profiles: &profiles,
            keys: &keys,
            declared_pairs: &declared,
        };
        let target = keys.get(&ColumnRef::new("main", "customers", "id")).unwrap();
        assert!(find_candidates(target, &scope, &thresholds).is_empty());
    }

    #[test]
    fn test_declared_reference_columns_are_not_matched() {
        let mut profiles = shop();
        profiles.push(TableProfile {
            table: TableRef::new("main", "invoices"),
            row_count: 3,
            columns: vec![
                column("invoices", "id", "INTEGER", 3, 3),
                column("invoices", "customer_id", "INTEGER", 3, 3),
            ],
        });
        let thresholds = Thresholds::default();
        let keys = KeySet::build(&[], natural_keys(&profiles, &thresholds), &profiles);
        let invoice_ref = ColumnRef::new("main", "invoices", "customer_id");
        assert!(keys.contains(&invoice_ref));

        let mut declared = HashSet::new();
        declared.insert((invoice_ref.clone(), ColumnRef::new("main", "customers", "id")));
        let scope = MatchScope {
            profiles: &profiles,
            keys: &keys,
            declared_pairs: &declared,
        };

        // A unique declared reference is never a target.
        let target = keys.get(&invoice_ref).unwrap();
        assert!(find_candidates(target, &scope, &thresholds).is_empty());

        // Nor is it a source for any other key.
        let target = keys.get(&ColumnRef::new("main", "customers", "id")).unwrap();
        let found = find_candidates(target, &scope, &thresholds);
        assert!(found.iter().all(|c| c.source != invoice_ref), "{:?}", found);
        assert!(found
            .iter()
            .any(|c| c.source == ColumnRef::new("main", "orders", "customer_id")));
    }
}
