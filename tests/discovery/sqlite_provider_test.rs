//! The SQLite provider answered through the collector, the way discovery
//! sees it.

mod fixtures;

use archaeologist::config::{ConnectionConfig, Driver};
use archaeologist::discovery::{Collector, TableRef};
use archaeologist::metadata::{
    MetadataError, MetadataProvider, MetadataProviderExt, SqliteProvider, Statement, Value,
};
use fixtures::{provider, DECLARED_SQL, ENV, SHOP_SQL};

#[tokio::test]
async fn test_lists_tables_sorted() {
    let provider = provider("sqlite_list", SHOP_SQL);
    let collector = Collector::new(&provider, ENV);
    let tables = collector.list_tables().await.unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(names, vec!["audit_log", "customers", "orders"]);
    assert!(tables.iter().all(|t| t.schema == "main"));
}

#[tokio::test]
async fn test_column_metadata_and_facets() {
    let provider = provider(
        "sqlite_facets",
        "CREATE TABLE invoices (id INTEGER PRIMARY KEY, code VARCHAR(12) NOT NULL, amount DECIMAL(10,2));",
    );
    let collector = Collector::new(&provider, ENV);
    let columns = collector.columns(&TableRef::new("main", "invoices")).await.unwrap();

    assert_eq!(columns.len(), 3);
    assert_eq!(columns[0].column, "id");
    assert!(!columns[0].nullable);
    assert_eq!(columns[1].ordinal_position, 2);
    assert_eq!(columns[1].character_maximum_length, Some(12));
    assert!(!columns[1].nullable);
    assert_eq!(columns[2].numeric_precision, Some(10));
    assert_eq!(columns[2].numeric_scale, Some(2));
    assert!(columns[2].nullable);
}

#[tokio::test]
async fn test_column_statistics() {
    let provider = provider("sqlite_stats", SHOP_SQL);
    let collector = Collector::new(&provider, ENV);
    let customers = TableRef::new("main", "customers");

    let stats = collector
        .column_statistics(&customers.column("legacy_code"))
        .await
        .unwrap();
    assert_eq!(stats.total_count, 5);
    assert_eq!(stats.non_null_count, 2);
    assert_eq!(stats.distinct_count, 2);
    assert_eq!(stats.null_percentage, 60.0);

    let samples = collector
        .sample_values(&customers.column("name"), 2)
        .await
        .unwrap();
    assert_eq!(samples, vec![Value::from("Ada"), Value::from("Grace")]);
}

#[tokio::test]
async fn test_declared_constraints() {
    let provider = provider("sqlite_declared", DECLARED_SQL);
    let collector = Collector::new(&provider, ENV);

    let pks = collector.declared_primary_keys().await.unwrap();
    assert_eq!(pks.len(), 3);
    assert!(pks.iter().all(|pk| pk.columns == vec!["id".to_string()]));

    let fks = collector.declared_foreign_keys().await.unwrap();
    assert_eq!(fks.len(), 3);

    let bare = fks
        .iter()
        .find(|fk| fk.columns[0].0 == "category_id")
        .unwrap();
    // `REFERENCES categories` resolves to the parent's key column.
    assert_eq!(bare.columns, vec![("category_id".to_string(), "id".to_string())]);
    assert_eq!(bare.target.table, "categories");

    let parent = fks.iter().find(|fk| fk.columns[0].0 == "parent_id").unwrap();
    assert!(parent.is_self_referential());
}

#[tokio::test]
async fn test_relationship_stats_count_orphans() {
    let provider = provider(
        "sqlite_orphans",
        "CREATE TABLE parents (id INTEGER);
         CREATE TABLE children (parent_id INTEGER);
         INSERT INTO parents VALUES (1), (2);
         INSERT INTO children VALUES (1), (1), (9), (NULL);",
    );
    let collector = Collector::new(&provider, ENV);
    let stats = collector
        .relationship_stats(
            &TableRef::new("main", "children").column("parent_id"),
            &TableRef::new("main", "parents").column("id"),
        )
        .await
        .unwrap();

    assert_eq!(stats.source_total_rows, 4);
    assert_eq!(stats.source_non_null_values, 3);
    assert_eq!(stats.source_distinct_values, 2);
    assert_eq!(stats.matching_records, 2);
    assert_eq!(stats.matching_distinct_target, 1);
    assert_eq!(stats.orphaned_records, 1);

    let overlap = collector
        .value_overlap(
            &TableRef::new("main", "children").column("parent_id"),
            &TableRef::new("main", "parents").column("id"),
            100,
        )
        .await
        .unwrap();
    assert_eq!(overlap.sample_count, 2);
    assert_eq!(overlap.match_count, 1);
}

#[tokio::test]
async fn test_awkward_identifiers_are_quoted() {
    let provider = provider(
        "sqlite_quoting",
        r#"CREATE TABLE "order items" ("we""ird" INTEGER, "select" TEXT);
           INSERT INTO "order items" VALUES (1, 'a'), (2, 'a');"#,
    );
    let collector = Collector::new(&provider, ENV);
    let table = TableRef::new("main", "order items");

    assert_eq!(collector.row_count(&table).await.unwrap(), 2);
    let stats = collector
        .column_statistics(&table.column("we\"ird"))
        .await
        .unwrap();
    assert_eq!(stats.distinct_count, 2);
    let stats = collector.column_statistics(&table.column("select")).await.unwrap();
    assert_eq!(stats.distinct_count, 1);
}

#[tokio::test]
async fn test_missing_table_is_a_query_error() {
    let provider = provider("sqlite_missing", SHOP_SQL);
    let err = provider
        .query(
            ENV,
            Statement::TableRowCount,
            &[Value::from("main"), Value::from("nope")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MetadataError::QueryFailed { statement: "table_row_count", .. }));
}

#[tokio::test]
async fn test_file_database_opens_read_only() {
    let path = std::env::temp_dir().join(format!("archaeologist-{}.db", std::process::id()));
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE things (id INTEGER); INSERT INTO things VALUES (1);")
            .unwrap();
    }

    let config = ConnectionConfig::new("file", Driver::Sqlite, path.to_string_lossy());
    let provider = SqliteProvider::for_environment(config).unwrap();
    provider.ping("file").await.unwrap();
    let row = provider
        .query_one(
            "file",
            Statement::TableRowCount,
            &[Value::from("main"), Value::from("things")],
        )
        .await
        .unwrap();
    assert_eq!(row.count("row_count").unwrap(), 1);

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn test_missing_file_fails_to_connect() {
    let config = ConnectionConfig::new("gone", Driver::Sqlite, "/nonexistent/dir/none.db");
    let provider = SqliteProvider::for_environment(config).unwrap();
    let err = provider.ping("gone").await.unwrap_err();
    assert!(err.is_connectivity());
}
