//! MetadataProvider trait definition.
//!
//! The MetadataProvider trait abstracts over the engine that actually runs
//! catalog queries. The discovery engine only ever calls [`query`]; it never
//! writes and never sees engine-specific SQL.
//!
//! [`query`]: MetadataProvider::query

use async_trait::async_trait;

use super::error::{MetadataError, MetadataResult};
use super::statement::Statement;
use super::types::{Row, Value};

/// Trait for running read-only catalog statements.
///
/// Implementations must tolerate concurrent calls: discovery runs several
/// analysis units at once against the same provider. Each call owns whatever
/// connection it needs for its own duration.
///
/// # Example
///
/// ```ignore
/// use archaeologist::metadata::{MetadataProvider, Statement};
///
/// async fn table_count(provider: &dyn MetadataProvider) -> MetadataResult<usize> {
///     let rows = provider.query("staging", Statement::ListBaseTables, &[]).await?;
///     Ok(rows.len())
/// }
/// ```
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Execute a statement against an environment and return its rows.
    async fn query(
        &self,
        environment: &str,
        statement: Statement,
        params: &[Value],
    ) -> MetadataResult<Vec<Row>>;
}

/// Extension trait with convenience wrappers around [`MetadataProvider::query`].
#[async_trait]
pub trait MetadataProviderExt: MetadataProvider {
    /// Execute a statement that must yield exactly one row.
    async fn query_one(
        &self,
        environment: &str,
        statement: Statement,
        params: &[Value],
    ) -> MetadataResult<Row> {
        self.query(environment, statement, params)
            .await?
            .into_iter()
            .next()
            .ok_or(MetadataError::EmptyResult(statement.name()))
    }

    /// Check that the environment is reachable.
    async fn ping(&self, environment: &str) -> MetadataResult<()> {
        self.query_one(environment, Statement::Ping, &[]).await.map(|_| ())
    }
}

// Blanket implementation for all MetadataProvider implementations
impl<T: MetadataProvider + ?Sized> MetadataProviderExt for T {}

/// Validate parameter count before a provider renders a statement.
pub fn check_arity(statement: Statement, params: &[Value]) -> MetadataResult<()> {
    if params.len() == statement.arity() {
        Ok(())
    } else {
        Err(MetadataError::InvalidParameters {
            statement: statement.name(),
            expected: statement.arity(),
            actual: params.len(),
        })
    }
}
