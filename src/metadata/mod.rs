//! Metadata provider module.
//!
//! Everything the discovery engine knows about a database arrives through
//! this module as [`Row`]s answered by a [`MetadataProvider`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Discovery engine                           │
//! │        (collector, matcher, cardinality analysis, ...)          │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │ Statement + params
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MetadataProvider                           │
//! │  - query(environment, statement, params) -> Vec<Row>            │
//! │  - query_one() / ping()  (MetadataProviderExt)                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      SqliteProvider                             │
//! │        (pragma_* catalog queries on the blocking pool)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use archaeologist::metadata::{MetadataProviderExt, SqliteProvider, Statement};
//!
//! let provider = SqliteProvider::shared_memory("dev", "demo", "CREATE TABLE t (id INTEGER);")?;
//! provider.ping("dev").await?;
//! let tables = provider.query("dev", Statement::ListBaseTables, &[]).await?;
//! ```

mod error;
mod provider;
mod sqlite_provider;
mod statement;
mod types;

pub use error::{MetadataError, MetadataResult};
pub use provider::{check_arity, MetadataProvider, MetadataProviderExt};
pub use sqlite_provider::{type_facets, SqliteProvider, MAIN_SCHEMA};
pub use statement::Statement;
pub use types::{Row, Value};
