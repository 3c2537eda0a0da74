//! Domain clustering over a full discovery run.

mod fixtures;

use archaeologist::discovery::domains::BusinessDomain;
use fixtures::{orchestrator, ENV};

const STORE_SQL: &str = "
    CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT);
    CREATE TABLE products (id INTEGER PRIMARY KEY, title TEXT);
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER REFERENCES customers(id),
        product_id INTEGER REFERENCES products(id)
    );
    CREATE TABLE prices (
        id INTEGER PRIMARY KEY,
        product_id INTEGER REFERENCES products(id),
        amount REAL
    );
    CREATE TABLE sessions (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER REFERENCES customers(id)
    );
    CREATE TABLE widgets (id INTEGER PRIMARY KEY, order_id INTEGER REFERENCES orders(id));

    INSERT INTO customers VALUES (1, 'Ada'), (2, 'Grace');
    INSERT INTO products VALUES (1, 'lamp'), (2, 'desk');
    INSERT INTO orders VALUES (1, 1, 1), (2, 1, 2), (3, 2, 1);
    INSERT INTO prices VALUES (1, 1, 9.5), (2, 2, 120.0);
    INSERT INTO sessions VALUES (1, 1), (2, 2), (3, 2);
    INSERT INTO widgets VALUES (1, 1);
";

#[tokio::test]
async fn test_store_domains() {
    let report = orchestrator("domains_store", STORE_SQL).run(ENV).await.unwrap();
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);

    let domains = report.domains.as_ref().unwrap();
    let clustered: Vec<(BusinessDomain, Vec<&str>)> = domains
        .clusters
        .iter()
        .map(|c| (c.domain, c.tables.iter().map(|t| t.table.as_str()).collect()))
        .collect();
    assert_eq!(
        clustered,
        vec![
            (BusinessDomain::UserManagement, vec!["customers"]),
            (BusinessDomain::OrderManagement, vec!["orders"]),
            (BusinessDomain::ProductCatalog, vec!["products"]),
            (BusinessDomain::Financial, vec!["prices"]),
            (BusinessDomain::Security, vec!["sessions"]),
            (BusinessDomain::Uncategorized, vec!["widgets"]),
        ]
    );

    // widgets -> orders touches an uncategorized table and is dropped.
    assert_eq!(domains.cross_domain_relationships.len(), 4);
    assert_eq!(domains.independent_domain_groups, 1);
}

#[tokio::test]
async fn test_store_process_flows() {
    let report = orchestrator("domains_flows", STORE_SQL).run(ENV).await.unwrap();
    let flows: Vec<(&str, u8)> = report
        .domains
        .as_ref()
        .unwrap()
        .process_flows
        .iter()
        .map(|f| (f.name, f.confidence))
        .collect();

    assert_eq!(
        flows,
        vec![
            ("User Registration and Management", 25),
            ("Order Processing", 75),
            ("Inventory Management", 25),
        ]
    );
}

#[tokio::test]
async fn test_store_domain_insights() {
    let report = orchestrator("domains_insights", STORE_SQL).run(ENV).await.unwrap();
    let domains = report.domains.as_ref().unwrap();

    let users = &domains.clusters[0];
    assert_eq!(users.internal_relationships, 0);
    assert!(users
        .insights
        .iter()
        .any(|i| i.contains("integration opportunities")));
    assert!(domains
        .insights
        .iter()
        .any(|i| i.starts_with("User-centric")));
    assert_eq!(users.core_entities[0].row_count, 2);
}
