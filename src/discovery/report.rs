//! The discovery report: everything one run learned about one environment.

use std::fmt::Write as _;

use serde::Serialize;
use uuid::Uuid;

use super::cardinality::IntegrityDistribution;
use super::collector::DeclaredForeignKey;
use super::domains::DomainAnalysis;
use super::keys::{KeyCandidate, KeyOrigin, KeyReconciliation};
use super::matcher::{ConfidenceTier, RelationshipCandidate};
use super::redundancy::{RedundancyRecommendation, RedundantTablePair};
use super::types::{DataQualityIssue, TableProfile};

/// Orchestrator phase an analysis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CatalogStatistics,
    Logical,
    Business,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CatalogStatistics => "catalog_statistics",
            Self::Logical => "logical",
            Self::Business => "business",
        }
    }
}

/// A failed analysis unit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct AnalysisError {
    pub phase: Phase,
    pub analysis: String,
    pub error: String,
}

/// A named finding worth a reader's attention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub name: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
}

impl Insight {
    fn new(name: &'static str, message: String, subjects: Vec<String>) -> Self {
        Self {
            name,
            message,
            subjects,
        }
    }
}

/// Headline counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub tables: usize,
    pub columns: usize,
    pub keys: usize,
    pub declared_keys: usize,
    pub natural_keys: usize,
    pub declared_relationships: usize,
    pub inferred_relationships: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub domains: usize,
    pub redundant_pairs: usize,
    pub errors: usize,
}

impl ReportSummary {
    fn collect(
        tables: &[TableProfile],
        keys: &[KeyCandidate],
        relationships: &[RelationshipCandidate],
        domains: Option<&DomainAnalysis>,
        redundancy: &[RedundantTablePair],
        errors: &[AnalysisError],
    ) -> Self {
        let tier_count =
            |tier: ConfidenceTier| relationships.iter().filter(|r| r.tier() == Some(tier)).count();
        Self {
            tables: tables.len(),
            columns: tables.iter().map(|t| t.columns.len()).sum(),
            keys: keys.len(),
            declared_keys: keys.iter().filter(|k| k.origin != KeyOrigin::Natural).count(),
            natural_keys: keys.iter().filter(|k| k.origin != KeyOrigin::Declared).count(),
            declared_relationships: relationships.iter().filter(|r| r.is_declared()).count(),
            inferred_relationships: relationships.iter().filter(|r| !r.is_declared()).count(),
            high_confidence: tier_count(ConfidenceTier::High),
            medium_confidence: tier_count(ConfidenceTier::Medium),
            low_confidence: tier_count(ConfidenceTier::Low),
            domains: domains.map(|d| d.clusters.len()).unwrap_or_default(),
            redundant_pairs: redundancy.len(),
            errors: errors.len(),
        }
    }
}

/// Root aggregate of one discovery run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryReport {
    pub run_id: Uuid,
    pub environment: String,
    /// Unix seconds.
    pub started_at: u64,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub summary: ReportSummary,
    pub tables: Vec<TableProfile>,
    pub keys: Vec<KeyCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_reconciliation: Option<KeyReconciliation>,
    pub declared_foreign_keys: Vec<DeclaredForeignKey>,
    /// Sorted by source then target.
    pub relationships: Vec<RelationshipCandidate>,
    pub integrity: IntegrityDistribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<DomainAnalysis>,
    pub redundancy: Vec<RedundantTablePair>,
    pub insights: Vec<Insight>,
    pub errors: Vec<AnalysisError>,
}

/// Everything the orchestrator hands over for assembly.
pub struct ReportParts {
    pub run_id: Uuid,
    pub environment: String,
    pub started_at: u64,
    pub duration_ms: u64,
    pub fingerprint: Option<String>,
    pub tables: Vec<TableProfile>,
    pub keys: Vec<KeyCandidate>,
    pub key_reconciliation: Option<KeyReconciliation>,
    pub declared_foreign_keys: Vec<DeclaredForeignKey>,
    pub unresolved_foreign_keys: Vec<DeclaredForeignKey>,
    pub relationships: Vec<RelationshipCandidate>,
    pub domains: Option<DomainAnalysis>,
    pub redundancy: Vec<RedundantTablePair>,
    pub errors: Vec<AnalysisError>,
}

impl DiscoveryReport {
    pub fn assemble(parts: ReportParts) -> Self {
        let ReportParts {
            run_id,
            environment,
            started_at,
            duration_ms,
            fingerprint,
            mut tables,
            keys,
            key_reconciliation,
            declared_foreign_keys,
            unresolved_foreign_keys,
            mut relationships,
            domains,
            redundancy,
            mut errors,
        } = parts;

        tables.sort_by(|a, b| a.table.cmp(&b.table));
        relationships.sort_by(|a, b| {
            a.source
                .cmp(&b.source)
                .then_with(|| a.target.cmp(&b.target))
        });
        errors.sort();

        let integrity =
            IntegrityDistribution::from_results(relationships.iter().filter_map(|r| r.cardinality.as_ref()));
        let insights = collect_insights(
            &tables,
            key_reconciliation.as_ref(),
            &declared_foreign_keys,
            &unresolved_foreign_keys,
            &relationships,
            &redundancy,
            &integrity,
        );
        let summary = ReportSummary::collect(
            &tables,
            &keys,
            &relationships,
            domains.as_ref(),
            &redundancy,
            &errors,
        );

        Self {
            run_id,
            environment,
            started_at,
            duration_ms,
            fingerprint,
            summary,
            tables,
            keys,
            key_reconciliation,
            declared_foreign_keys,
            relationships,
            integrity,
            domains,
            redundancy,
            insights,
            errors,
        }
    }

    pub fn insight(&self, name: &str) -> Option<&Insight> {
        self.insights.iter().find(|i| i.name == name)
    }

    /// Plain-text digest for terminals.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;
        let _ = writeln!(out, "Discovery report for '{}' (run {})", self.environment, self.run_id);
        let _ = writeln!(out, "  tables:        {} ({} columns)", s.tables, s.columns);
        let _ = writeln!(
            out,
            "  keys:          {} ({} declared, {} natural)",
            s.keys, s.declared_keys, s.natural_keys
        );
        let _ = writeln!(
            out,
            "  relationships: {} declared, {} inferred (high {}, medium {}, low {})",
            s.declared_relationships,
            s.inferred_relationships,
            s.high_confidence,
            s.medium_confidence,
            s.low_confidence
        );
        let _ = writeln!(out, "  domains:       {}", s.domains);
        let _ = writeln!(out, "  errors:        {}", s.errors);

        if !self.relationships.is_empty() {
            let _ = writeln!(out, "\nRelationships:");
            for rel in &self.relationships {
                let kind = match rel.tier() {
                    Some(tier) => format!("{:?}", tier).to_lowercase(),
                    None => "declared".to_string(),
                };
                let pattern = rel
                    .cardinality
                    .as_ref()
                    .map(|c| c.pattern.as_str())
                    .unwrap_or("unclassified");
                let _ = writeln!(
                    out,
                    "  {} -> {} [{}, {}, confidence {}]",
                    rel.source, rel.target, kind, pattern, rel.confidence
                );
            }
        }

        if let Some(domains) = &self.domains {
            let _ = writeln!(out, "\nDomains:");
            for cluster in &domains.clusters {
                let _ = writeln!(
                    out,
                    "  {}: {} tables, {} internal relationships",
                    cluster.domain,
                    cluster.tables.len(),
                    cluster.internal_relationships
                );
            }
        }

        if !self.insights.is_empty() {
            let _ = writeln!(out, "\nInsights:");
            for insight in &self.insights {
                let _ = writeln!(out, "  [{}] {}", insight.name, insight.message);
            }
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out, "\nErrors:");
            for err in &self.errors {
                let _ = writeln!(out, "  {} ({}): {}", err.analysis, err.phase.as_str(), err.error);
            }
        }
        out
    }
}

fn collect_insights(
    tables: &[TableProfile],
    reconciliation: Option<&KeyReconciliation>,
    declared_fks: &[DeclaredForeignKey],
    unresolved: &[DeclaredForeignKey],
    relationships: &[RelationshipCandidate],
    redundancy: &[RedundantTablePair],
    integrity: &IntegrityDistribution,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some(rec) = reconciliation {
        if !rec.tables_without_keys.is_empty() {
            insights.push(Insight::new(
                "tables_without_keys",
                format!(
                    "{} tables have neither a declared nor a natural primary key",
                    rec.tables_without_keys.len()
                ),
                rec.tables_without_keys.iter().map(ToString::to_string).collect(),
            ));
        }
        if !rec.declared_only.is_empty() {
            insights.push(Insight::new(
                "unverified_primary_keys",
                format!(
                    "{} declared primary keys are not unique and non-null in the data",
                    rec.declared_only.len()
                ),
                rec.declared_only.iter().map(ToString::to_string).collect(),
            ));
        }
        if !rec.natural_only.is_empty() {
            insights.push(Insight::new(
                "undeclared_primary_keys",
                format!(
                    "{} columns behave as keys without a primary key constraint",
                    rec.natural_only.len()
                ),
                rec.natural_only.iter().map(ToString::to_string).collect(),
            ));
        }
    }

    let columns_with = |pred: fn(&DataQualityIssue) -> bool| -> Vec<String> {
        tables
            .iter()
            .flat_map(|t| t.columns.iter())
            .filter(|c| c.issues.iter().any(pred))
            .map(|c| c.column_ref().to_string())
            .collect()
    };
    let high_null = columns_with(|i| {
        matches!(i, DataQualityIssue::HighNullRate { .. } | DataQualityIssue::ExtremeNullRate { .. })
    });
    if !high_null.is_empty() {
        insights.push(Insight::new(
            "high_null_rate",
            format!("{} columns are mostly NULL", high_null.len()),
            high_null,
        ));
    }
    let single_value = columns_with(|i| matches!(i, DataQualityIssue::SingleValue));
    if !single_value.is_empty() {
        insights.push(Insight::new(
            "single_value_columns",
            format!("{} columns hold a single value across all rows", single_value.len()),
            single_value,
        ));
    }

    if !unresolved.is_empty() {
        insights.push(Insight::new(
            "unresolved_foreign_keys",
            format!(
                "{} declared foreign keys reference a column that is not a known key",
                unresolved.len()
            ),
            unresolved.iter().map(|fk| fk.constraint_name.clone()).collect(),
        ));
    }

    let composite: Vec<String> = declared_fks
        .iter()
        .filter(|fk| fk.is_composite())
        .map(|fk| fk.constraint_name.clone())
        .collect();
    if !composite.is_empty() {
        insights.push(Insight::new(
            "composite_foreign_keys",
            format!("{} multi-column foreign keys were recorded but not analysed", composite.len()),
            composite,
        ));
    }

    let self_referential: Vec<String> = declared_fks
        .iter()
        .filter(|fk| fk.is_self_referential())
        .map(|fk| fk.source.to_string())
        .collect();
    if !self_referential.is_empty() {
        insights.push(Insight::new(
            "hierarchical_tables",
            format!(
                "{} self-referential foreign keys indicate hierarchical data",
                self_referential.len()
            ),
            self_referential,
        ));
    }

    let orphaned: Vec<String> = relationships
        .iter()
        .filter(|r| r.cardinality.as_ref().is_some_and(|c| c.orphan_count > 0))
        .map(|r| format!("{} -> {}", r.source, r.target))
        .collect();
    if integrity.with_orphans > 0 {
        insights.push(Insight::new(
            "orphaned_references",
            format!("{} relationships have orphaned source values", integrity.with_orphans),
            orphaned,
        ));
    }
    if integrity.low > 0 {
        insights.push(Insight::new(
            "low_referential_integrity",
            format!("{} relationships have below 80% referential integrity", integrity.low),
            Vec::new(),
        ));
    }

    let undeclared_high = relationships
        .iter()
        .filter(|r| r.tier() == Some(ConfidenceTier::High))
        .count();
    if undeclared_high > 0 {
        insights.push(Insight::new(
            "missing_constraints",
            format!(
                "{} high-confidence relationships have no foreign key constraint",
                undeclared_high
            ),
            Vec::new(),
        ));
    }

    let consolidate: Vec<String> = redundancy
        .iter()
        .filter(|p| p.recommendation == RedundancyRecommendation::Consolidate)
        .map(|p| format!("{} ~ {}", p.first, p.second))
        .collect();
    if !redundancy.is_empty() {
        insights.push(Insight::new(
            "redundant_tables",
            format!(
                "{} table pairs share most of their structure ({} worth consolidating)",
                redundancy.len(),
                consolidate.len()
            ),
            redundancy
                .iter()
                .map(|p| format!("{} ~ {}", p.first, p.second))
                .collect(),
        ));
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> ReportParts {
        ReportParts {
            run_id: Uuid::nil(),
            environment: "dev".into(),
            started_at: 0,
            duration_ms: 3,
            fingerprint: None,
            tables: vec![],
            keys: vec![],
            key_reconciliation: None,
            declared_foreign_keys: vec![],
            unresolved_foreign_keys: vec![],
            relationships: vec![],
            domains: None,
            redundancy: vec![],
            errors: vec![
                AnalysisError {
                    phase: Phase::Logical,
                    analysis: "schema_redundancy".into(),
                    error: "boom".into(),
                },
                AnalysisError {
                    phase: Phase::CatalogStatistics,
                    analysis: "column_statistics:main.x".into(),
                    error: "query failed".into(),
                },
            ],
        }
    }

    #[test]
    fn test_errors_sorted_by_phase() {
        let report = DiscoveryReport::assemble(parts());
        assert_eq!(report.errors[0].analysis, "column_statistics:main.x");
        assert_eq!(report.summary.errors, 2);
    }

    #[test]
    fn test_render_summary_empty_run() {
        let report = DiscoveryReport::assemble(ReportParts {
            errors: vec![],
            ..parts()
        });
        insta::assert_snapshot!(report.render_summary(), @r"
        Discovery report for 'dev' (run 00000000-0000-0000-0000-000000000000)
          tables:        0 (0 columns)
          keys:          0 (0 declared, 0 natural)
          relationships: 0 declared, 0 inferred (high 0, medium 0, low 0)
          domains:       0
          errors:        0
        ");
    }

    #[test]
    fn test_serializes_phase_names() {
        let report = DiscoveryReport::assemble(parts());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["errors"][0]["phase"], "catalog_statistics");
        assert_eq!(json["environment"], "dev");
    }
}
