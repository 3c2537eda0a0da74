//! End-to-end discovery runs against seeded SQLite databases.

mod fixtures;

use archaeologist::discovery::{
    ConfidenceTier, KeyOrigin, RelationshipOrigin, RelationshipPattern,
};
use archaeologist::discovery::domains::BusinessDomain;
use fixtures::{orchestrator, DECLARED_SQL, ENV, SHOP_SQL};

#[tokio::test]
async fn test_orders_reference_customers() {
    let report = orchestrator("pipeline_shop", SHOP_SQL).run(ENV).await.unwrap();

    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert_eq!(report.tables.len(), 3);

    let orders_id = report
        .keys
        .iter()
        .find(|k| k.column.table == "orders" && k.column.column == "id")
        .expect("orders.id is a key");
    // 50 base + exact name + integer type
    assert_eq!(orders_id.score, 95);
    assert_eq!(orders_id.origin, KeyOrigin::Natural);

    assert_eq!(report.relationships.len(), 1);
    let rel = &report.relationships[0];
    assert_eq!(rel.source.to_string(), "main.orders.customer_id");
    assert_eq!(rel.target.to_string(), "main.customers.id");
    assert!(rel.naming_match);
    assert!(rel.type_match);
    assert!(rel.confidence >= 75);
    assert_eq!(rel.tier(), Some(ConfidenceTier::High));

    let cardinality = rel.cardinality.as_ref().unwrap();
    assert_eq!(cardinality.pattern, RelationshipPattern::ManyToOne);
    assert_eq!(cardinality.referential_integrity, 100.0);
    assert_eq!(cardinality.orphan_count, 0);
    assert_eq!(cardinality.average_fanout, 2.0);
    assert_eq!(cardinality.density, 60.0);

    match &rel.origin {
        RelationshipOrigin::Inferred { match_percentage, sample_count, .. } => {
            assert_eq!(*match_percentage, 100.0);
            assert_eq!(*sample_count, 3);
        }
        other => panic!("expected inferred origin, got {:?}", other),
    }
    assert!(report.insight("missing_constraints").is_some());
}

#[tokio::test]
async fn test_mostly_null_column_is_flagged_not_keyed() {
    let report = orchestrator("pipeline_nulls", SHOP_SQL).run(ENV).await.unwrap();

    assert!(!report.keys.iter().any(|k| k.column.column == "legacy_code"));
    let insight = report.insight("high_null_rate").expect("high null insight");
    assert!(insight.subjects.contains(&"main.customers.legacy_code".to_string()));

    let customers = report.tables.iter().find(|t| t.table.table == "customers").unwrap();
    let legacy = customers.column("legacy_code").unwrap();
    assert_eq!(legacy.statistics.null_percentage, 60.0);
}

#[tokio::test]
async fn test_empty_table_has_no_keys() {
    let report = orchestrator("pipeline_empty", SHOP_SQL).run(ENV).await.unwrap();

    assert!(!report.keys.iter().any(|k| k.column.table == "audit_log"));
    let reconciliation = report.key_reconciliation.as_ref().unwrap();
    assert_eq!(
        reconciliation
            .tables_without_keys
            .iter()
            .map(|t| t.table.as_str())
            .collect::<Vec<_>>(),
        vec!["audit_log"]
    );
    assert!(report.insight("tables_without_keys").is_some());
}

#[tokio::test]
async fn test_scores_are_bounded() {
    let report = orchestrator("pipeline_bounds", SHOP_SQL).run(ENV).await.unwrap();
    for key in &report.keys {
        assert!((50..=100).contains(&key.score), "{:?}", key);
    }
    for rel in &report.relationships {
        assert!(rel.confidence <= 100, "{:?}", rel);
    }
}

#[tokio::test]
async fn test_repeated_runs_agree() {
    let orchestrator = orchestrator("pipeline_idempotent", SHOP_SQL);
    let first = orchestrator.run(ENV).await.unwrap();
    let second = orchestrator.run(ENV).await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.fingerprint, second.fingerprint);
    assert!(first.fingerprint.is_some());
    assert_eq!(first.keys, second.keys);
    assert_eq!(first.relationships, second.relationships);
    assert_eq!(first.domains, second.domains);
}

#[tokio::test]
async fn test_declared_constraints() {
    let report = orchestrator("pipeline_declared", DECLARED_SQL).run(ENV).await.unwrap();
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);

    let users_id = report
        .keys
        .iter()
        .find(|k| k.column.to_string() == "main.users.id")
        .unwrap();
    assert_eq!(users_id.origin, KeyOrigin::Both);
    assert_eq!(users_id.score, 100);

    let declared: Vec<_> = report.relationships.iter().filter(|r| r.is_declared()).collect();
    assert_eq!(declared.len(), 3);
    assert!(declared.iter().all(|r| r.confidence == 100));

    let parent = declared
        .iter()
        .find(|r| r.source.column == "parent_id")
        .unwrap();
    match &parent.origin {
        RelationshipOrigin::Declared { self_referential, .. } => assert!(*self_referential),
        other => panic!("expected declared origin, got {:?}", other),
    }

    let category = declared
        .iter()
        .find(|r| r.source.column == "category_id")
        .unwrap();
    assert_eq!(category.target.to_string(), "main.categories.id");
    assert_eq!(
        category.cardinality.as_ref().unwrap().pattern,
        RelationshipPattern::ManyToOne
    );

    let owner = declared.iter().find(|r| r.source.column == "owner_id").unwrap();
    match &owner.origin {
        RelationshipOrigin::Declared { delete_rule, .. } => {
            assert_eq!(delete_rule.as_deref(), Some("CASCADE"))
        }
        other => panic!("expected declared origin, got {:?}", other),
    }

    // Declared pairs are never re-inferred.
    assert!(!report
        .relationships
        .iter()
        .any(|r| !r.is_declared() && r.source.column == "category_id"));
    assert!(report.insight("hierarchical_tables").is_some());
}

#[tokio::test]
async fn test_domains_follow_table_names() {
    let report = orchestrator("pipeline_domains", SHOP_SQL).run(ENV).await.unwrap();
    let domains = report.domains.as_ref().unwrap();

    let names: Vec<BusinessDomain> = domains.clusters.iter().map(|c| c.domain).collect();
    assert_eq!(
        names,
        vec![
            BusinessDomain::UserManagement,
            BusinessDomain::OrderManagement,
            BusinessDomain::AuditLogging,
        ]
    );
    assert_eq!(domains.cross_domain_relationships.len(), 1);
    assert_eq!(report.summary.domains, 3);
}

#[tokio::test]
async fn test_report_serializes() {
    let report = orchestrator("pipeline_json", SHOP_SQL).run(ENV).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["environment"], "test");
    assert_eq!(json["relationships"][0]["origin"], "inferred");
    assert_eq!(json["relationships"][0]["cardinality"]["pattern"], "many_to_one");
}

#[tokio::test]
async fn test_empty_referencing_table_has_no_quality_warnings() {
    const SQL: &str = "
        CREATE TABLE parents (id INTEGER PRIMARY KEY, label TEXT);
        CREATE TABLE children (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parents(id));
        INSERT INTO parents VALUES (1, 'a'), (2, 'b');
    ";
    let report = orchestrator("pipeline_empty_children", SQL).run(ENV).await.unwrap();
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);

    assert_eq!(report.relationships.len(), 1);
    let rel = &report.relationships[0];
    assert!(rel.is_declared());
    let cardinality = rel.cardinality.as_ref().unwrap();
    assert_eq!(cardinality.data_completeness, 0.0);
    assert_eq!(cardinality.insights.len(), 1, "{:?}", cardinality.insights);
    assert!(!cardinality.insights.iter().any(|i| i.contains("NULL rate")));
}
