//! Relationship cardinality classification.
//!
//! Given a source column and the key column it references, the classifier
//! measures both sides and their join, then names the relationship shape and
//! scores how well the data honours it. A failing join query never escapes:
//! the result becomes [`RelationshipPattern::AnalysisFailed`].

use serde::Serialize;
use std::fmt;

use crate::config::Thresholds;

use super::collector::Collector;
use super::types::{percentage, round2, ColumnRef};

/// Shape of a relationship, from duplicate presence on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipPattern {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
    AnalysisFailed,
}

impl RelationshipPattern {
    /// `(source has duplicates, target has duplicates)` → pattern.
    pub fn classify(source_duplicates: bool, target_duplicates: bool) -> Self {
        match (source_duplicates, target_duplicates) {
            (false, false) => Self::OneToOne,
            (true, false) => Self::ManyToOne,
            (false, true) => Self::OneToMany,
            (true, true) => Self::ManyToMany,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "one_to_one",
            Self::ManyToOne => "many_to_one",
            Self::OneToMany => "one_to_many",
            Self::ManyToMany => "many_to_many",
            Self::AnalysisFailed => "analysis_failed",
        }
    }

    fn insight(&self) -> &'static str {
        match self {
            Self::OneToOne => {
                "One-to-one relationship suggests either data normalization or a data model issue"
            }
            Self::ManyToOne => "Many-to-one relationship indicates a lookup or reference pattern",
            Self::OneToMany => {
                "One-to-many relationship suggests a parent-child or hierarchical structure"
            }
            Self::ManyToMany => {
                "Many-to-many relationship may indicate a missing junction table"
            }
            Self::AnalysisFailed => {
                "Analysis failed - unable to determine relationship characteristics"
            }
        }
    }
}

impl fmt::Display for RelationshipPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw counts behind a cardinality decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelationshipStats {
    pub source_total_rows: u64,
    pub source_distinct_values: u64,
    pub source_non_null_values: u64,
    pub target_total_rows: u64,
    pub target_distinct_values: u64,
    pub target_non_null_values: u64,
    pub matching_records: u64,
    pub matching_distinct_source: u64,
    pub matching_distinct_target: u64,
    pub orphaned_records: u64,
}

impl RelationshipStats {
    /// Some non-null source value occurs more than once.
    pub fn source_has_duplicates(&self) -> bool {
        self.source_distinct_values < self.source_non_null_values
    }

    /// Some non-null target value occurs more than once.
    pub fn target_has_duplicates(&self) -> bool {
        self.target_distinct_values < self.target_non_null_values
    }
}

/// Classified relationship with quality metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardinalityResult {
    pub pattern: RelationshipPattern,
    pub average_fanout: f64,
    pub referential_integrity: f64,
    pub data_completeness: f64,
    pub density: f64,
    pub orphan_count: u64,
    pub matching_records: u64,
    pub insights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CardinalityResult {
    /// Classify and score from measured counts.
    pub fn from_stats(stats: &RelationshipStats, thresholds: &Thresholds) -> Self {
        let pattern =
            RelationshipPattern::classify(stats.source_has_duplicates(), stats.target_has_duplicates());

        let average_fanout = if stats.matching_records > 0 && stats.matching_distinct_source > 0 {
            stats.matching_records as f64 / stats.matching_distinct_source as f64
        } else {
            0.0
        };
        let non_null = stats.source_non_null_values;
        let valid = non_null.saturating_sub(stats.orphaned_records);

        let mut result = Self {
            pattern,
            average_fanout: round2(average_fanout),
            referential_integrity: round2(percentage(valid, non_null)),
            data_completeness: round2(percentage(non_null, stats.source_total_rows)),
            density: round2(percentage(
                stats.matching_distinct_target,
                stats.target_distinct_values,
            )),
            orphan_count: stats.orphaned_records,
            matching_records: stats.matching_records,
            insights: Vec::new(),
            error: None,
        };
        result.insights = result.build_insights(stats.source_total_rows == 0, thresholds);
        result
    }

    /// Placeholder for a relationship whose join could not be measured.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            pattern: RelationshipPattern::AnalysisFailed,
            average_fanout: 0.0,
            referential_integrity: 0.0,
            data_completeness: 0.0,
            density: 0.0,
            orphan_count: 0,
            matching_records: 0,
            insights: vec![RelationshipPattern::AnalysisFailed.insight().to_string()],
            error: Some(error.into()),
        }
    }

    /// Quality warnings. An empty source table has nothing to measure, so
    /// only the pattern insight is kept.
    fn build_insights(&self, source_empty: bool, thresholds: &Thresholds) -> Vec<String> {
        let mut insights = vec![self.pattern.insight().to_string()];
        if source_empty {
            return insights;
        }
        if self.referential_integrity < thresholds.integrity_warning {
            insights.push(format!(
                "Referential integrity issues detected ({:.1}% valid references)",
                self.referential_integrity
            ));
        }
        if self.orphan_count > 0 {
            insights.push(format!(
                "Found {} orphaned records that don't match the target table",
                self.orphan_count
            ));
        }
        if self.data_completeness < thresholds.completeness_warning {
            insights.push(format!(
                "High NULL rate in foreign key column ({:.1}% NULL)",
                100.0 - self.data_completeness
            ));
        }
        if self.density < thresholds.density_warning {
            insights.push(format!(
                "Low relationship density - only {:.1}% of target records are referenced",
                self.density
            ));
        }
        if self.average_fanout > thresholds.fanout_warning {
            insights.push(format!(
                "High fan-out ratio ({:.1}) may impact query performance",
                self.average_fanout
            ));
        }
        insights
    }
}

/// Measure and classify `source → target`.
pub async fn classify_relationship(
    collector: &Collector<'_>,
    source: &ColumnRef,
    target: &ColumnRef,
    thresholds: &Thresholds,
) -> CardinalityResult {
    match collector.relationship_stats(source, target).await {
        Ok(stats) => CardinalityResult::from_stats(&stats, thresholds),
        Err(err) => {
            tracing::warn!(%source, %target, error = %err, "cardinality analysis failed");
            CardinalityResult::failed(err.to_string())
        }
    }
}

/// Relationships bucketed by referential integrity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityDistribution {
    /// Above 95%.
    pub high: usize,
    /// 80% to 95%.
    pub medium: usize,
    /// Below 80%.
    pub low: usize,
    pub with_orphans: usize,
    pub failed: usize,
}

impl IntegrityDistribution {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a CardinalityResult>) -> Self {
        let mut dist = Self::default();
        for result in results {
            if result.pattern == RelationshipPattern::AnalysisFailed {
                dist.failed += 1;
                continue;
            }
            if result.referential_integrity > 95.0 {
                dist.high += 1;
            } else if result.referential_integrity >= 80.0 {
                dist.medium += 1;
            } else {
                dist.low += 1;
            }
            if result.orphan_count > 0 {
                dist.with_orphans += 1;
            }
        }
        dist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> RelationshipStats {
        // orders.customer_id → customers.id: 6 orders over 3 customers, one NULL,
        // one order pointing at a missing customer.
        RelationshipStats {
            source_total_rows: 6,
            source_distinct_values: 3,
            source_non_null_values: 5,
            target_total_rows: 4,
            target_distinct_values: 4,
            target_non_null_values: 4,
            matching_records: 4,
            matching_distinct_source: 2,
            matching_distinct_target: 2,
            orphaned_records: 1,
        }
    }

    #[test]
    fn test_rule_table_is_deterministic() {
        assert_eq!(RelationshipPattern::classify(false, false), RelationshipPattern::OneToOne);
        assert_eq!(RelationshipPattern::classify(true, false), RelationshipPattern::ManyToOne);
        assert_eq!(RelationshipPattern::classify(false, true), RelationshipPattern::OneToMany);
        assert_eq!(RelationshipPattern::classify(true, true), RelationshipPattern::ManyToMany);
    }

    #[test]
    fn test_metrics() {
        let result = CardinalityResult::from_stats(&stats(), &Thresholds::default());
        assert_eq!(result.pattern, RelationshipPattern::ManyToOne);
        assert_eq!(result.average_fanout, 2.0);
        assert_eq!(result.referential_integrity, 80.0);
        assert_eq!(result.data_completeness, 83.33);
        assert_eq!(result.density, 50.0);
        assert_eq!(result.orphan_count, 1);
        assert!(result.insights.iter().any(|i| i.contains("orphaned")));
        assert!(result.insights.iter().any(|i| i.contains("Referential integrity")));
    }

    #[test]
    fn test_nulls_are_not_duplicates() {
        let s = RelationshipStats {
            source_total_rows: 10,
            source_distinct_values: 4,
            source_non_null_values: 4,
            ..stats()
        };
        assert!(!s.source_has_duplicates());
    }

    #[test]
    fn test_integrity_edge_cases() {
        let no_source = RelationshipStats::default();
        let result = CardinalityResult::from_stats(&no_source, &Thresholds::default());
        assert_eq!(result.referential_integrity, 0.0);
        assert_eq!(result.average_fanout, 0.0);

        let clean = RelationshipStats {
            orphaned_records: 0,
            ..stats()
        };
        let result = CardinalityResult::from_stats(&clean, &Thresholds::default());
        assert_eq!(result.referential_integrity, 100.0);
    }

    #[test]
    fn test_empty_source_has_no_quality_warnings() {
        let empty = RelationshipStats {
            target_total_rows: 3,
            target_distinct_values: 3,
            target_non_null_values: 3,
            ..RelationshipStats::default()
        };
        let result = CardinalityResult::from_stats(&empty, &Thresholds::default());
        assert_eq!(result.data_completeness, 0.0);
        assert_eq!(result.density, 0.0);
        assert_eq!(result.insights, vec![result.pattern.insight().to_string()]);
    }

    #[test]
    fn test_failed_result_is_zeroed() {
        let result = CardinalityResult::failed("no such column");
        assert_eq!(result.pattern, RelationshipPattern::AnalysisFailed);
        assert_eq!(result.referential_integrity, 0.0);
        assert_eq!(result.density, 0.0);
        assert_eq!(result.error.as_deref(), Some("no such column"));
    }

    #[test]
    fn test_integrity_distribution() {
        let t = Thresholds::default();
        let high = CardinalityResult::from_stats(&RelationshipStats { orphaned_records: 0, ..stats() }, &t);
        let medium = CardinalityResult::from_stats(&stats(), &t);
        let failed = CardinalityResult::failed("x");
        let dist = IntegrityDistribution::from_results([&high, &medium, &failed]);
        assert_eq!(dist.high, 1);
        assert_eq!(dist.medium, 1);
        assert_eq!(dist.low, 0);
        assert_eq!(dist.with_orphans, 1);
        assert_eq!(dist.failed, 1);
    }

    #[test]
    fn test_pattern_display() {
        insta::assert_snapshot!(RelationshipPattern::ManyToOne.to_string(), @"many_to_one");
    }
}
