//! Discovery orchestration.
//!
//! A run is three ordered phases. Units inside a phase run concurrently on
//! the bounded runner; a failing unit becomes an [`AnalysisError`] in the
//! report and never stops its siblings or later phases. Only a failure to
//! start (bad configuration, unreachable environment, unreadable catalog)
//! escapes as a [`DiscoveryError`].

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use futures::future::FutureExt;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{DiscoverySettings, SettingsError, MAX_WORKERS};
use crate::metadata::{MetadataError, MetadataProvider};

use super::cardinality::classify_relationship;
use super::collector::{Collector, DeclaredForeignKey, DeclaredPrimaryKey};
use super::domains::{analyze_domains, DomainAnalysis, TableSize};
use super::fingerprint::catalog_fingerprint;
use super::keys::{natural_keys, reconcile, KeyReconciliation, KeySet};
use super::matcher::{match_foreign_keys, MatchScope, RelationshipCandidate};
use super::redundancy::{find_redundant_tables, RedundantTablePair};
use super::report::{AnalysisError, DiscoveryReport, Phase, ReportParts};
use super::types::{ColumnRef, TableProfile, TableRef};
use super::units::{run_units, Unit, UnitResults};

/// Failures that stop a run before or between phases.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("configuration error: {0}")]
    Configuration(#[from] SettingsError),

    #[error("phase '{phase}' could not start: {source}")]
    PhaseStart {
        phase: &'static str,
        #[source]
        source: MetadataError,
    },
}

pub const DECLARED_PRIMARY_KEYS: &str = "declared_primary_keys";
pub const DECLARED_FOREIGN_KEYS: &str = "declared_foreign_keys";
pub const PRIMARY_KEY_RECONCILIATION: &str = "primary_key_reconciliation";
pub const SCHEMA_REDUNDANCY: &str = "schema_redundancy";
pub const BUSINESS_DOMAINS: &str = "business_domains";

pub fn column_statistics_unit(table: &TableRef) -> String {
    format!("column_statistics:{}", table)
}

pub fn foreign_key_matching_unit(key: &ColumnRef) -> String {
    format!("foreign_key_matching:{}", key)
}

pub fn cardinality_unit(constraint: &str) -> String {
    format!("cardinality:{}", constraint)
}

enum CatalogOutput {
    PrimaryKeys(Vec<DeclaredPrimaryKey>),
    ForeignKeys(Vec<DeclaredForeignKey>),
    Profile(TableProfile),
}

enum LogicalOutput {
    Reconciliation(KeyReconciliation),
    Relationships(Vec<RelationshipCandidate>),
    Declared(RelationshipCandidate),
    Redundancy(Vec<RedundantTablePair>),
}

/// Runs discovery against any [`MetadataProvider`].
pub struct DiscoveryOrchestrator {
    provider: Arc<dyn MetadataProvider>,
    settings: DiscoverySettings,
}

impl DiscoveryOrchestrator {
    pub fn new(provider: Arc<dyn MetadataProvider>, settings: DiscoverySettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Survey one environment.
    pub async fn run(&self, environment: &str) -> Result<DiscoveryReport, DiscoveryError> {
        if !(1..=MAX_WORKERS).contains(&self.settings.worker_count) {
            return Err(SettingsError::InvalidConfig(format!(
                "worker_count must be between 1 and {}, got {}",
                MAX_WORKERS, self.settings.worker_count
            ))
            .into());
        }

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let collector = Collector::new(self.provider.as_ref(), environment);
        let mut errors = Vec::new();

        tracing::info!(%run_id, environment, "starting discovery");

        let tables = self.preflight(&collector).await?;
        tracing::info!(tables = tables.len(), "phase 1: catalog and statistics");

        // Phase 1
        let mut catalog = run_units(self.catalog_units(&collector, &tables), self.workers()).await;
        record_failures(&mut errors, Phase::CatalogStatistics, &mut catalog);

        let mut declared_pks = Vec::new();
        let mut declared_fks = Vec::new();
        let mut profiles = Vec::new();
        for output in catalog.take_outputs().into_values() {
            match output {
                CatalogOutput::PrimaryKeys(pks) => declared_pks = pks,
                CatalogOutput::ForeignKeys(fks) => declared_fks = fks,
                CatalogOutput::Profile(profile) => profiles.push(profile),
            }
        }

        // Phase 2
        let thresholds = &self.settings.thresholds;
        let profiled: Vec<TableRef> = profiles.iter().map(|p| p.table.clone()).collect();
        let natural = natural_keys(&profiles, thresholds);
        let keys = KeySet::build(&declared_pks, natural.clone(), &profiles);

        let mut resolved_fks = Vec::new();
        let mut unresolved_fks = Vec::new();
        for fk in declared_fks.iter().filter(|fk| !fk.is_composite()) {
            match fk.single_pair() {
                Some((_, target)) if keys.contains(&target) => resolved_fks.push(fk),
                _ => unresolved_fks.push(fk.clone()),
            }
        }
        let declared_pairs: HashSet<(ColumnRef, ColumnRef)> =
            resolved_fks.iter().filter_map(|fk| fk.single_pair()).collect();
        let scope = MatchScope {
            profiles: &profiles,
            keys: &keys,
            declared_pairs: &declared_pairs,
        };

        tracing::info!(
            keys = keys.len(),
            declared_foreign_keys = resolved_fks.len(),
            "phase 2: keys and relationships"
        );

        let mut units: Vec<Unit<'_, LogicalOutput>> = Vec::new();
        {
            let (tables, declared_pks, natural) = (&profiled, &declared_pks, &natural);
            units.push((
                PRIMARY_KEY_RECONCILIATION.to_string(),
                async move {
                    Ok(LogicalOutput::Reconciliation(reconcile(tables, declared_pks, natural)))
                }
                .boxed(),
            ));
        }
        for key in keys.iter() {
            let (scope, collector, settings) = (&scope, &collector, &self.settings);
            units.push((
                foreign_key_matching_unit(&key.column),
                async move {
                    match_foreign_keys(collector, key, scope, settings)
                        .await
                        .map(LogicalOutput::Relationships)
                }
                .boxed(),
            ));
        }
        for fk in resolved_fks.iter().copied() {
            let Some((source, target)) = fk.single_pair() else {
                continue;
            };
            let Some(target_key) = keys.get(&target) else {
                continue;
            };
            let source_meta = profiles
                .iter()
                .find(|p| p.table == source.table_ref())
                .and_then(|p| p.column(&source.column))
                .map(|c| &c.metadata);
            let collector = &collector;
            units.push((
                cardinality_unit(&fk.constraint_name),
                async move {
                    let cardinality =
                        classify_relationship(collector, &source, &target, thresholds).await;
                    Ok(LogicalOutput::Declared(RelationshipCandidate::declared(
                        fk,
                        source,
                        target_key,
                        source_meta,
                        cardinality,
                    )))
                }
                .boxed(),
            ));
        }
        {
            let profiles = &profiles;
            units.push((
                SCHEMA_REDUNDANCY.to_string(),
                async move {
                    Ok(LogicalOutput::Redundancy(find_redundant_tables(profiles, thresholds)))
                }
                .boxed(),
            ));
        }

        let mut logical = run_units(units, self.workers()).await;
        record_failures(&mut errors, Phase::Logical, &mut logical);

        let mut key_reconciliation = None;
        let mut relationships = Vec::new();
        let mut redundancy = Vec::new();
        for output in logical.take_outputs().into_values() {
            match output {
                LogicalOutput::Reconciliation(rec) => key_reconciliation = Some(rec),
                LogicalOutput::Relationships(found) => relationships.extend(found),
                LogicalOutput::Declared(rel) => relationships.push(rel),
                LogicalOutput::Redundancy(pairs) => redundancy = pairs,
            }
        }

        // Phase 3
        tracing::info!(relationships = relationships.len(), "phase 3: business domains");
        let sizes: Vec<TableSize> = profiles
            .iter()
            .map(|p| TableSize {
                table: p.table.clone(),
                row_count: p.row_count,
            })
            .collect();
        let columns: Vec<_> = profiles
            .iter()
            .flat_map(|p| p.columns.iter().map(|c| c.metadata.clone()))
            .collect();
        let business: Vec<Unit<'_, DomainAnalysis>> = {
            let (sizes, columns, relationships) = (&sizes, &columns, &relationships);
            vec![(
                BUSINESS_DOMAINS.to_string(),
                async move { Ok(analyze_domains(sizes, columns, relationships, thresholds)) }.boxed(),
            )]
        };
        let mut business = run_units(business, self.workers()).await;
        record_failures(&mut errors, Phase::Business, &mut business);
        let domains = business.take_outputs().remove(BUSINESS_DOMAINS);

        let fingerprint = match catalog_fingerprint(&profiles) {
            Ok(fingerprint) => Some(fingerprint),
            Err(err) => {
                tracing::warn!(error = %err, "could not fingerprint catalog");
                None
            }
        };

        let report = DiscoveryReport::assemble(ReportParts {
            run_id,
            environment: environment.to_string(),
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            fingerprint,
            tables: profiles,
            keys: keys.iter().cloned().collect(),
            key_reconciliation,
            declared_foreign_keys: declared_fks,
            unresolved_foreign_keys: unresolved_fks,
            relationships,
            domains,
            redundancy,
            errors,
        });

        tracing::info!(
            %run_id,
            tables = report.summary.tables,
            relationships = report.relationships.len(),
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "discovery finished"
        );
        Ok(report)
    }

    fn workers(&self) -> usize {
        self.settings.worker_count
    }

    /// Confirm the environment answers and list its tables.
    async fn preflight(&self, collector: &Collector<'_>) -> Result<Vec<TableRef>, DiscoveryError> {
        let phase = Phase::CatalogStatistics.as_str();
        collector.ping().await.map_err(|err| match err {
            MetadataError::UnknownEnvironment(name) => {
                DiscoveryError::Configuration(SettingsError::EnvironmentNotFound(name))
            }
            source => DiscoveryError::PhaseStart { phase, source },
        })?;
        collector
            .list_tables()
            .await
            .map_err(|source| DiscoveryError::PhaseStart { phase, source })
    }

    fn catalog_units<'a>(
        &'a self,
        collector: &'a Collector<'a>,
        tables: &'a [TableRef],
    ) -> Vec<Unit<'a, CatalogOutput>> {
        let mut units: Vec<Unit<'a, CatalogOutput>> = vec![
            (
                DECLARED_PRIMARY_KEYS.to_string(),
                async move {
                    collector
                        .declared_primary_keys()
                        .await
                        .map(CatalogOutput::PrimaryKeys)
                }
                .boxed(),
            ),
            (
                DECLARED_FOREIGN_KEYS.to_string(),
                async move {
                    collector
                        .declared_foreign_keys()
                        .await
                        .map(CatalogOutput::ForeignKeys)
                }
                .boxed(),
            ),
        ];

        let settings = &self.settings;
        for table in tables {
            units.push((
                column_statistics_unit(table),
                async move {
                    collector
                        .profile_table(table, settings.sample_values, &settings.thresholds)
                        .await
                        .map(CatalogOutput::Profile)
                }
                .boxed(),
            ));
        }
        units
    }
}

fn record_failures<T>(errors: &mut Vec<AnalysisError>, phase: Phase, results: &mut UnitResults<T>) {
    let failures: BTreeMap<String, String> = std::mem::take(&mut results.failures);
    errors.extend(failures.into_iter().map(|(analysis, error)| AnalysisError {
        phase,
        analysis,
        error,
    }));
}
