//! Shared in-memory databases for the discovery integration tests.

#![allow(dead_code)]

use archaeologist::config::DiscoverySettings;
use archaeologist::discovery::DiscoveryOrchestrator;
use archaeologist::metadata::SqliteProvider;
use std::sync::Arc;

pub const ENV: &str = "test";

/// Orders referencing customers without a declared constraint, plus a
/// mostly-NULL column and an empty table.
pub const SHOP_SQL: &str = "
    CREATE TABLE customers (
        id INTEGER NOT NULL UNIQUE,
        name TEXT,
        legacy_code TEXT
    );
    CREATE TABLE orders (
        id INTEGER NOT NULL UNIQUE,
        customer_id INTEGER,
        total REAL
    );
    CREATE TABLE audit_log (
        id INTEGER,
        message TEXT
    );

    INSERT INTO customers (id, name, legacy_code) VALUES
        (1, 'Ada', 'A-1'),
        (2, 'Grace', NULL),
        (3, 'Ada', 'A-3'),
        (4, 'Linus', NULL),
        (5, 'Ken', NULL);

    INSERT INTO orders (id, customer_id, total) VALUES
        (1, 1, 10.0),
        (2, 1, 12.5),
        (3, 2, 7.0),
        (4, 3, 3.0),
        (5, 2, 7.0),
        (6, 1, 15.0);
";

/// Declared keys and constraints, including a self-reference.
pub const DECLARED_SQL: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        email TEXT NOT NULL
    );
    CREATE TABLE categories (
        id INTEGER PRIMARY KEY,
        parent_id INTEGER REFERENCES categories(id),
        title TEXT
    );
    CREATE TABLE products (
        id INTEGER PRIMARY KEY,
        category_id INTEGER REFERENCES categories,
        owner_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
        title TEXT
    );

    INSERT INTO users (id, email) VALUES (1, 'a@x'), (2, 'b@x');
    INSERT INTO categories (id, parent_id, title) VALUES (1, NULL, 'root'), (2, 1, 'child'), (3, 1, 'other');
    INSERT INTO products (id, category_id, owner_id, title) VALUES
        (1, 2, 1, 'p1'),
        (2, 2, 1, 'p2'),
        (3, 3, 2, 'p3');
";

pub fn provider(database: &str, sql: &str) -> SqliteProvider {
    SqliteProvider::shared_memory(ENV, database, sql).expect("seed database")
}

pub fn orchestrator(database: &str, sql: &str) -> DiscoveryOrchestrator {
    DiscoveryOrchestrator::new(Arc::new(provider(database, sql)), DiscoverySettings::default())
}
