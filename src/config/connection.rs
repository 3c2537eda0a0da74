//! Resolved database connection targets.
//!
//! A [`ConnectionConfig`] is what an environment entry in the settings file
//! turns into once its driver is recognised and its location expanded.

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Unsupported driver: {0}. Supported: sqlite")]
    UnsupportedDriver(String),
}

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
    /// SQLite (file or shared in-memory database)
    Sqlite,
}

impl Driver {
    /// Parse driver from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConnectionError> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            other => Err(ConnectionError::UnsupportedDriver(other.to_string())),
        }
    }

    /// Canonical driver name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Sqlite => "sqlite",
        }
    }
}

/// Database connection configuration for one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Environment name this config was resolved from.
    pub environment: String,
    /// Database driver.
    pub driver: Driver,
    /// Database location: a file path or a `file:` URI.
    pub location: String,
}

impl ConnectionConfig {
    /// Create a connection config.
    pub fn new(environment: impl Into<String>, driver: Driver, location: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            driver,
            location: location.into(),
        }
    }

    /// Whether the location is a SQLite URI rather than a plain path.
    pub fn is_uri(&self) -> bool {
        self.location.starts_with("file:")
    }

    /// Whether the location names an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.location == ":memory:" || self.location.contains("mode=memory")
    }

    /// Get the driver name.
    pub fn driver_name(&self) -> &'static str {
        self.driver.as_str()
    }
}
