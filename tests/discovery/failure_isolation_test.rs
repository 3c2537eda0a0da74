//! A failing analysis unit must not take its siblings down.

mod fixtures;

use archaeologist::config::DiscoverySettings;
use archaeologist::discovery::{DiscoveryError, DiscoveryOrchestrator, Phase, RelationshipPattern};
use archaeologist::metadata::{MetadataError, MetadataProvider, MetadataResult, Row, Statement, Value};
use async_trait::async_trait;
use fixtures::ENV;
use std::sync::Arc;

const SIBLINGS_SQL: &str = "
    CREATE TABLE alpha (id INTEGER NOT NULL UNIQUE, a_label TEXT);
    CREATE TABLE beta (id INTEGER NOT NULL UNIQUE, b_amount REAL);
    CREATE TABLE gamma (code TEXT, g_flag INTEGER);
    CREATE TABLE delta (ref INTEGER, d_note TEXT);
    CREATE TABLE x (id INTEGER, payload TEXT);

    INSERT INTO alpha VALUES (1, 'one'), (2, 'two');
    INSERT INTO beta VALUES (1, 1.5), (2, 1.5);
    INSERT INTO x VALUES (1, 'p');
";

/// Fails every statement that names one table.
struct FailingProvider<P> {
    inner: P,
    table: &'static str,
}

#[async_trait]
impl<P: MetadataProvider> MetadataProvider for FailingProvider<P> {
    async fn query(
        &self,
        environment: &str,
        statement: Statement,
        params: &[Value],
    ) -> MetadataResult<Vec<Row>> {
        if params.iter().any(|p| p.as_str() == Some(self.table)) {
            return Err(MetadataError::query(statement.name(), "simulated failure"));
        }
        self.inner.query(environment, statement, params).await
    }
}

/// Fails one catalog-wide statement.
struct FailingStatement<P> {
    inner: P,
    statement: Statement,
}

#[async_trait]
impl<P: MetadataProvider> MetadataProvider for FailingStatement<P> {
    async fn query(
        &self,
        environment: &str,
        statement: Statement,
        params: &[Value],
    ) -> MetadataResult<Vec<Row>> {
        if statement == self.statement {
            return Err(MetadataError::query(statement.name(), "simulated failure"));
        }
        self.inner.query(environment, statement, params).await
    }
}

#[tokio::test]
async fn test_failing_table_is_isolated() {
    let provider = FailingProvider {
        inner: fixtures::provider("isolation_table", SIBLINGS_SQL),
        table: "x",
    };
    let orchestrator = DiscoveryOrchestrator::new(Arc::new(provider), DiscoverySettings::default());

    let report = orchestrator.run(ENV).await.expect("run completes");

    let tables: Vec<&str> = report.tables.iter().map(|t| t.table.table.as_str()).collect();
    assert_eq!(tables, vec!["alpha", "beta", "delta", "gamma"]);

    assert_eq!(report.errors.len(), 1, "errors: {:?}", report.errors);
    let error = &report.errors[0];
    assert_eq!(error.analysis, "column_statistics:main.x");
    assert_eq!(error.phase, Phase::CatalogStatistics);
    assert!(error.error.contains("simulated failure"));
    assert_eq!(report.summary.errors, 1);
}

#[tokio::test]
async fn test_failing_catalog_unit_keeps_later_phases() {
    let provider = FailingStatement {
        inner: fixtures::provider("isolation_catalog", SIBLINGS_SQL),
        statement: Statement::DeclaredForeignKeys,
    };
    let orchestrator = DiscoveryOrchestrator::new(Arc::new(provider), DiscoverySettings::default());

    let report = orchestrator.run(ENV).await.unwrap();
    assert_eq!(report.tables.len(), 5);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].analysis, "declared_foreign_keys");
    assert!(report.key_reconciliation.is_some());
    assert!(report.domains.is_some());
}

#[tokio::test]
async fn test_unreadable_catalog_stops_the_run() {
    let provider = FailingStatement {
        inner: fixtures::provider("isolation_list", SIBLINGS_SQL),
        statement: Statement::ListBaseTables,
    };
    let orchestrator = DiscoveryOrchestrator::new(Arc::new(provider), DiscoverySettings::default());

    let err = orchestrator.run(ENV).await.unwrap_err();
    assert!(matches!(err, DiscoveryError::PhaseStart { .. }));
}

#[tokio::test]
async fn test_single_worker_gives_same_result() {
    let settings = DiscoverySettings {
        worker_count: 1,
        ..DiscoverySettings::default()
    };
    let serial = DiscoveryOrchestrator::new(
        Arc::new(fixtures::provider("isolation_serial", SIBLINGS_SQL)),
        settings,
    )
    .run(ENV)
    .await
    .unwrap();
    let parallel = DiscoveryOrchestrator::new(
        Arc::new(fixtures::provider("isolation_parallel", SIBLINGS_SQL)),
        DiscoverySettings::default(),
    )
    .run(ENV)
    .await
    .unwrap();

    assert_eq!(serial.keys, parallel.keys);
    assert_eq!(serial.relationships, parallel.relationships);
    assert_eq!(serial.fingerprint, parallel.fingerprint);
}

#[tokio::test]
async fn test_failed_cardinality_is_not_a_unit_error() {
    let provider = FailingStatement {
        inner: fixtures::provider("isolation_cardinality", fixtures::SHOP_SQL),
        statement: Statement::RelationshipProfile,
    };
    let orchestrator = DiscoveryOrchestrator::new(Arc::new(provider), DiscoverySettings::default());

    let report = orchestrator.run(ENV).await.unwrap();
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert_eq!(report.relationships.len(), 1);

    let cardinality = report.relationships[0].cardinality.as_ref().unwrap();
    assert_eq!(cardinality.pattern, RelationshipPattern::AnalysisFailed);
    assert_eq!(cardinality.referential_integrity, 0.0);
    assert_eq!(cardinality.average_fanout, 0.0);
    assert!(cardinality.error.as_deref().unwrap().contains("simulated failure"));
    assert_eq!(report.integrity.failed, 1);
}

#[tokio::test]
async fn test_failed_declared_cardinality_keeps_relationships() {
    let provider = FailingStatement {
        inner: fixtures::provider("isolation_declared_cardinality", fixtures::DECLARED_SQL),
        statement: Statement::RelationshipProfile,
    };
    let orchestrator = DiscoveryOrchestrator::new(Arc::new(provider), DiscoverySettings::default());

    let report = orchestrator.run(ENV).await.unwrap();
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);

    let declared: Vec<_> = report.relationships.iter().filter(|r| r.is_declared()).collect();
    assert_eq!(declared.len(), 3);
    for rel in declared {
        let pattern = rel.cardinality.as_ref().map(|c| c.pattern);
        assert_eq!(pattern, Some(RelationshipPattern::AnalysisFailed), "{}", rel.source);
    }
}

#[tokio::test]
async fn test_failing_match_unit_is_isolated() {
    let provider = FailingStatement {
        inner: fixtures::provider("isolation_overlap", fixtures::SHOP_SQL),
        statement: Statement::ValueOverlap,
    };
    let orchestrator = DiscoveryOrchestrator::new(Arc::new(provider), DiscoverySettings::default());

    let report = orchestrator.run(ENV).await.unwrap();
    let failed: Vec<&str> = report.errors.iter().map(|e| e.analysis.as_str()).collect();
    assert_eq!(failed, vec!["foreign_key_matching:main.customers.id"]);
    assert_eq!(report.errors[0].phase, Phase::Logical);

    assert!(report.relationships.is_empty());
    assert_eq!(report.tables.len(), 3);
    assert!(report.key_reconciliation.is_some());
    assert!(report.domains.is_some());
}
