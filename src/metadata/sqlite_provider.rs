//! SqliteProvider implementation.
//!
//! This module provides the reference MetadataProvider implementation. It
//! renders each [`Statement`] as SQLite SQL over `sqlite_master` and the
//! `pragma_*` table-valued functions, and runs it on the blocking thread
//! pool with a fresh connection per call.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags};

use super::error::{MetadataError, MetadataResult};
use super::provider::{check_arity, MetadataProvider};
use super::statement::Statement;
use super::types::{Row, Value};
use crate::config::ConnectionConfig;

/// The only schema a SQLite connection exposes to discovery.
pub const MAIN_SCHEMA: &str = "main";

/// Matches declared types with facets, e.g. `VARCHAR(255)` or `DECIMAL(10, 2)`.
static TYPE_FACETS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z ]*?)\s*\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\)").expect("valid regex")
});

/// A registered environment.
struct SqliteTarget {
    location: String,
    /// Keeps a shared in-memory database alive between per-query connections.
    _anchor: Option<Mutex<Connection>>,
}

/// MetadataProvider backed by SQLite databases.
///
/// # Example
///
/// ```ignore
/// use archaeologist::config::Settings;
/// use archaeologist::metadata::SqliteProvider;
///
/// let settings = Settings::load()?;
/// let provider = SqliteProvider::for_environment(settings.connection("staging")?)?;
/// ```
#[derive(Default)]
pub struct SqliteProvider {
    targets: HashMap<String, SqliteTarget>,
}

impl SqliteProvider {
    /// Create a provider with no environments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider serving a single environment.
    pub fn for_environment(config: ConnectionConfig) -> MetadataResult<Self> {
        let mut provider = Self::new();
        provider.register(config)?;
        Ok(provider)
    }

    /// Register an environment.
    ///
    /// In-memory locations are opened immediately and kept open so the
    /// database outlives individual queries.
    pub fn register(&mut self, config: ConnectionConfig) -> MetadataResult<()> {
        let anchor = if config.is_in_memory() {
            Some(Mutex::new(open_connection(&config.environment, &config.location, true)?))
        } else {
            None
        };

        self.targets.insert(
            config.environment.clone(),
            SqliteTarget {
                location: config.location,
                _anchor: anchor,
            },
        );
        Ok(())
    }

    /// Create a provider over a named shared in-memory database, seeded with
    /// `init_sql`. Useful for fixtures and demos.
    pub fn shared_memory(environment: &str, database: &str, init_sql: &str) -> MetadataResult<Self> {
        let location = format!("file:{}?mode=memory&cache=shared", database);
        let anchor = open_connection(environment, &location, false)?;
        anchor
            .execute_batch(init_sql)
            .map_err(|e| MetadataError::query("init_sql", e.to_string()))?;

        let mut provider = Self::new();
        provider.targets.insert(
            environment.to_string(),
            SqliteTarget {
                location,
                _anchor: Some(Mutex::new(anchor)),
            },
        );
        Ok(provider)
    }

    /// Registered environment names.
    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }
}

#[async_trait]
impl MetadataProvider for SqliteProvider {
    async fn query(
        &self,
        environment: &str,
        statement: Statement,
        params: &[Value],
    ) -> MetadataResult<Vec<Row>> {
        check_arity(statement, params)?;

        let target = self
            .targets
            .get(environment)
            .ok_or_else(|| MetadataError::UnknownEnvironment(environment.to_string()))?;

        let environment = environment.to_string();
        let location = target.location.clone();
        let params = params.to_vec();

        tracing::trace!(statement = statement.name(), %environment, "running statement");

        tokio::task::spawn_blocking(move || {
            let conn = open_connection(&environment, &location, true)?;
            run_statement(&conn, statement, &params)
        })
        .await?
    }
}

/// Open a session on a database location. Discovery sessions are query-only.
fn open_connection(environment: &str, location: &str, query_only: bool) -> MetadataResult<Connection> {
    let connection_failed = |e: rusqlite::Error| MetadataError::ConnectionFailed {
        environment: environment.to_string(),
        message: e.to_string(),
    };

    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    let conn = if location.starts_with("file:") || location == ":memory:" {
        Connection::open_with_flags(location, flags)
    } else {
        // Plain paths must already exist; never create an empty database.
        Connection::open_with_flags(
            location,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }
    .map_err(connection_failed)?;

    if query_only {
        conn.execute_batch("PRAGMA query_only = ON;")
            .map_err(connection_failed)?;
    }

    Ok(conn)
}

/// Render and execute one statement.
fn run_statement(conn: &Connection, statement: Statement, params: &[Value]) -> MetadataResult<Vec<Row>> {
    match statement {
        Statement::Ping => execute(conn, statement, "SELECT 1 AS ok", &[]),

        Statement::ListBaseTables => {
            let sql = format!(
                "SELECT '{schema}' AS table_schema, name AS table_name \
                 FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
                schema = MAIN_SCHEMA
            );
            execute(conn, statement, &sql, &[])
        }

        Statement::TableRowCount => {
            let table = qualified(statement, params, 0)?;
            let sql = format!("SELECT COUNT(*) AS row_count FROM {}", table);
            execute(conn, statement, &sql, &[])
        }

        Statement::TableColumns => {
            let schema = text_param(statement, params, 0)?;
            let table = text_param(statement, params, 1)?;
            let sql = "SELECT name AS column_name, \
                        type AS data_type, \
                        CASE WHEN \"notnull\" = 0 AND pk = 0 THEN 'YES' ELSE 'NO' END AS is_nullable, \
                        cid + 1 AS ordinal_position \
                 FROM pragma_table_info(?1, ?2) \
                 ORDER BY cid";
            let binds = [Value::from(table), Value::from(schema)];
            let rows = execute(conn, statement, sql, &binds)?;
            Ok(rows.into_iter().map(with_type_facets).collect())
        }

        Statement::ColumnStatistics => {
            let table = qualified(statement, params, 0)?;
            let column = ident_param(statement, params, 2)?;
            let sql = format!(
                "SELECT COUNT(*) AS total_count, \
                        COUNT({col}) AS non_null_count, \
                        COUNT(DISTINCT {col}) AS distinct_count \
                 FROM {table}",
                col = column,
                table = table
            );
            execute(conn, statement, &sql, &[])
        }

        Statement::SampleValues => {
            let table = qualified(statement, params, 0)?;
            let column = ident_param(statement, params, 2)?;
            let limit = limit_param(statement, params, 3)?;
            let sql = format!(
                "SELECT DISTINCT {col} AS value FROM {table} \
                 WHERE {col} IS NOT NULL ORDER BY 1 LIMIT ?1",
                col = column,
                table = table
            );
            execute(conn, statement, &sql, &[limit])
        }

        Statement::DeclaredPrimaryKeys => {
            let sql = format!(
                "SELECT '{schema}' AS table_schema, m.name AS table_name, \
                        'pk_' || m.name AS constraint_name, \
                        p.name AS column_name, p.pk AS ordinal_position \
                 FROM sqlite_master m, pragma_table_info(m.name) p \
                 WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%' AND p.pk > 0 \
                 ORDER BY m.name, p.pk",
                schema = MAIN_SCHEMA
            );
            execute(conn, statement, &sql, &[])
        }

        Statement::DeclaredForeignKeys => {
            // A bare `REFERENCES parent` leaves "to" NULL; resolve it to the
            // parent's primary key column at the same position.
            let sql = format!(
                "SELECT 'fk_' || m.name || '_' || f.id AS constraint_name, \
                        '{schema}' AS source_schema, m.name AS source_table, f.\"from\" AS source_column, \
                        '{schema}' AS target_schema, f.\"table\" AS target_table, \
                        COALESCE(f.\"to\", (SELECT p.name FROM pragma_table_info(f.\"table\") p \
                                           WHERE p.pk = f.seq + 1)) AS target_column, \
                        f.on_update AS update_rule, f.on_delete AS delete_rule \
                 FROM sqlite_master m, pragma_foreign_key_list(m.name) f \
                 WHERE m.type = 'table' AND m.name NOT LIKE 'sqlite_%' \
                 ORDER BY m.name, f.id, f.seq",
                schema = MAIN_SCHEMA
            );
            execute(conn, statement, &sql, &[])
        }

        Statement::ValueOverlap => {
            let source = qualified(statement, params, 0)?;
            let source_col = ident_param(statement, params, 2)?;
            let target = qualified(statement, params, 3)?;
            let target_col = ident_param(statement, params, 5)?;
            let limit = limit_param(statement, params, 6)?;
            let sql = format!(
                "WITH source_sample AS ( \
                     SELECT DISTINCT {sc} AS val FROM {src} WHERE {sc} IS NOT NULL ORDER BY 1 LIMIT ?1 \
                 ), \
                 target_values AS ( \
                     SELECT DISTINCT {tc} AS val FROM {tgt} WHERE {tc} IS NOT NULL \
                 ) \
                 SELECT COUNT(s.val) AS sample_count, COUNT(t.val) AS match_count \
                 FROM source_sample s LEFT JOIN target_values t ON s.val = t.val",
                sc = source_col,
                src = source,
                tc = target_col,
                tgt = target
            );
            execute(conn, statement, &sql, &[limit])
        }

        Statement::RelationshipProfile => {
            let source = qualified(statement, params, 0)?;
            let sc = ident_param(statement, params, 2)?;
            let target = qualified(statement, params, 3)?;
            let tc = ident_param(statement, params, 5)?;
            let sql = format!(
                "WITH source_stats AS ( \
                     SELECT COUNT(*) AS total_rows, COUNT(DISTINCT {sc}) AS distinct_values, \
                            COUNT({sc}) AS non_null_values FROM {src} \
                 ), \
                 target_stats AS ( \
                     SELECT COUNT(*) AS total_rows, COUNT(DISTINCT {tc}) AS distinct_values, \
                            COUNT({tc}) AS non_null_values FROM {tgt} \
                 ), \
                 matches AS ( \
                     SELECT COUNT(*) AS matching_records, \
                            COUNT(DISTINCT s.{sc}) AS matching_distinct_source, \
                            COUNT(DISTINCT t.{tc}) AS matching_distinct_target \
                     FROM {src} s JOIN {tgt} t ON s.{sc} = t.{tc} \
                     WHERE s.{sc} IS NOT NULL \
                 ), \
                 orphans AS ( \
                     SELECT COUNT(*) AS orphaned_records FROM {src} s \
                     WHERE s.{sc} IS NOT NULL \
                       AND NOT EXISTS (SELECT 1 FROM {tgt} t WHERE t.{tc} = s.{sc}) \
                 ) \
                 SELECT ss.total_rows AS source_total_rows, \
                        ss.distinct_values AS source_distinct_values, \
                        ss.non_null_values AS source_non_null_values, \
                        ts.total_rows AS target_total_rows, \
                        ts.distinct_values AS target_distinct_values, \
                        ts.non_null_values AS target_non_null_values, \
                        m.matching_records, m.matching_distinct_source, m.matching_distinct_target, \
                        o.orphaned_records \
                 FROM source_stats ss, target_stats ts, matches m, orphans o",
                sc = sc,
                src = source,
                tc = tc,
                tgt = target
            );
            execute(conn, statement, &sql, &[])
        }
    }
}

/// Prepare, bind and collect rows in field order.
fn execute(
    conn: &Connection,
    statement: Statement,
    sql: &str,
    binds: &[Value],
) -> MetadataResult<Vec<Row>> {
    let failed = |e: rusqlite::Error| MetadataError::query(statement.name(), e.to_string());

    let mut stmt = conn.prepare(sql).map_err(failed)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt
        .query(rusqlite::params_from_iter(binds.iter().map(to_sql_value)))
        .map_err(failed)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(failed)? {
        let mut record = Row::new();
        for (idx, name) in names.iter().enumerate() {
            let value = row.get_ref(idx).map_err(failed)?;
            record.push(name.clone(), from_value_ref(value));
        }
        out.push(record);
    }

    Ok(out)
}

/// Append length/precision facets parsed from the declared type.
fn with_type_facets(mut row: Row) -> Row {
    let data_type = row
        .get("data_type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let (length, precision, scale) = type_facets(&data_type);

    row.push("character_maximum_length", length.map_or(Value::Null, Value::Integer));
    row.push("numeric_precision", precision.map_or(Value::Null, Value::Integer));
    row.push("numeric_scale", scale.map_or(Value::Null, Value::Integer));
    row
}

/// Split `VARCHAR(255)` / `DECIMAL(10,2)` into (length, precision, scale).
pub fn type_facets(data_type: &str) -> (Option<i64>, Option<i64>, Option<i64>) {
    let Some(caps) = TYPE_FACETS.captures(data_type) else {
        return (None, None, None);
    };

    let base = caps[1].to_lowercase();
    let first = caps.get(2).and_then(|m| m.as_str().parse().ok());
    let second = caps.get(3).and_then(|m| m.as_str().parse().ok());

    let is_numeric = ["dec", "num", "real", "float", "double"]
        .iter()
        .any(|p| base.contains(p));

    if is_numeric {
        (None, first, second.or(Some(0)))
    } else {
        (first, None, None)
    }
}

fn text_param(statement: Statement, params: &[Value], idx: usize) -> MetadataResult<String> {
    params
        .get(idx)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| MetadataError::query(statement.name(), format!("parameter {} must be text", idx + 1)))
}

fn ident_param(statement: Statement, params: &[Value], idx: usize) -> MetadataResult<String> {
    text_param(statement, params, idx).map(|s| quote_ident(&s))
}

/// `"schema"."table"` from two consecutive parameters.
fn qualified(statement: Statement, params: &[Value], idx: usize) -> MetadataResult<String> {
    Ok(format!(
        "{}.{}",
        ident_param(statement, params, idx)?,
        ident_param(statement, params, idx + 1)?
    ))
}

fn limit_param(statement: Statement, params: &[Value], idx: usize) -> MetadataResult<Value> {
    params
        .get(idx)
        .and_then(Value::as_i64)
        .filter(|n| *n >= 0)
        .map(Value::Integer)
        .ok_or_else(|| {
            MetadataError::query(statement.name(), format!("parameter {} must be a limit", idx + 1))
        })
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(r) => SqlValue::Real(*r),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}
