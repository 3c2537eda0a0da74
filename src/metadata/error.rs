//! Metadata provider error types.

use thiserror::Error;

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Errors raised while querying catalog metadata or decoding its rows.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The provider has no connection for the requested environment.
    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    /// Could not open a connection to the database.
    #[error("connection to '{environment}' failed: {message}")]
    ConnectionFailed {
        /// Environment being connected to.
        environment: String,
        /// Driver error message.
        message: String,
    },

    /// The statement failed to execute.
    #[error("{statement} failed: {message}")]
    QueryFailed {
        /// Name of the failing statement.
        statement: &'static str,
        /// Driver error message.
        message: String,
    },

    /// Statement was invoked with the wrong number of parameters.
    #[error("{statement} expects {expected} parameters, got {actual}")]
    InvalidParameters {
        /// Name of the statement.
        statement: &'static str,
        /// Expected parameter count.
        expected: usize,
        /// Supplied parameter count.
        actual: usize,
    },

    /// A row did not carry a field the decoder needs.
    #[error("missing field '{0}' in result row")]
    MissingField(String),

    /// A field held a value of the wrong type.
    #[error("field '{field}' is not {expected}")]
    UnexpectedType {
        /// Field name.
        field: String,
        /// Expected type description.
        expected: &'static str,
    },

    /// A statement that must return exactly one row returned none.
    #[error("{0} returned no rows")]
    EmptyResult(&'static str),

    /// The blocking query task was cancelled or panicked.
    #[error("query task failed: {0}")]
    TaskFailed(String),
}

impl MetadataError {
    /// Create a query failure for a statement.
    pub fn query(statement: &'static str, message: impl Into<String>) -> Self {
        Self::QueryFailed {
            statement,
            message: message.into(),
        }
    }

    /// Check if this error happened before any statement reached the database.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::UnknownEnvironment(_) | Self::ConnectionFailed { .. }
        )
    }
}

impl From<tokio::task::JoinError> for MetadataError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}
