//! TOML-based configuration for the archaeologist.
//!
//! Supports a config file (archaeologist.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [environments.legacy_erp]
//! driver = "sqlite"
//! path = "${ERP_SNAPSHOT_PATH}"
//!
//! [environments.staging]
//! driver = "sqlite"
//! path = "./data/staging.db"
//!
//! [discovery]
//! worker_count = 4
//! sample_size = 100
//! sample_values = 5
//!
//! [discovery.thresholds]
//! min_key_score = 50
//! min_candidate_score = 50
//! high_match_percentage = 80.0
//! high_name_score = 0.7
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::connection::{ConnectionConfig, Driver};

/// Upper bound on the discovery worker pool.
pub const MAX_WORKERS: usize = 32;

/// Error type for settings.
///
/// Every variant is fatal: a run with invalid configuration aborts before
/// any discovery phase starts.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Environment not found: {0}")]
    EnvironmentNotFound(String),

    #[error("Missing credentials for environment '{0}'")]
    MissingCredentials(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Named database environments.
    pub environments: BTreeMap<String, EnvironmentSettings>,

    /// Discovery tuning.
    pub discovery: DiscoverySettings,
}

/// A named environment the archaeologist can survey.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnvironmentSettings {
    /// Database driver (currently only `sqlite`).
    pub driver: String,

    /// Database location (supports ${ENV_VAR} expansion).
    #[serde(default)]
    pub path: Option<String>,
}

impl EnvironmentSettings {
    /// Get the driver type.
    pub fn driver_type(&self) -> Result<Driver, SettingsError> {
        Driver::from_str(&self.driver)
            .map_err(|_| SettingsError::UnsupportedDriver(self.driver.clone()))
    }
}

/// Discovery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Number of analysis units allowed in flight at once.
    pub worker_count: usize,

    /// Maximum distinct source values sampled when validating a relationship.
    pub sample_size: usize,

    /// Distinct sample values kept per column profile (0 disables sampling).
    pub sample_values: usize,

    /// Confidence floors and insight thresholds.
    pub thresholds: Thresholds,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            worker_count: 4,
            sample_size: 100,
            sample_values: 5,
            thresholds: Thresholds::default(),
        }
    }
}

/// Tunable thresholds.
///
/// These are heuristic defaults, not validated domain constants.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Thresholds {
    /// Natural keys scoring below this are discarded.
    pub min_key_score: u8,
    /// Row count above which a natural key earns the size bonus.
    pub large_table_rows: u64,
    /// Relationship candidates scoring below this never reach validation.
    pub min_candidate_score: u8,
    /// Match percentage required for a high-confidence relationship.
    pub high_match_percentage: f64,
    /// Name similarity required for a high-confidence relationship.
    pub high_name_score: f64,
    /// Match percentage required for a medium-confidence relationship.
    pub medium_match_percentage: f64,
    /// Name similarity required for a medium-confidence relationship.
    pub medium_name_score: f64,
    /// Match percentage required for a low-confidence relationship.
    pub low_match_percentage: f64,
    /// Name similarity required for a low-confidence relationship.
    pub low_name_score: f64,
    /// Null percentage above which a column is flagged.
    pub high_null_percentage: f64,
    /// Null percentage above which a column is considered unused.
    pub extreme_null_percentage: f64,
    /// Referential integrity below which a relationship is flagged.
    pub integrity_warning: f64,
    /// Data completeness below which a relationship is flagged.
    pub completeness_warning: f64,
    /// Relationship density below which a relationship is flagged.
    pub density_warning: f64,
    /// Average fan-out above which a relationship is flagged.
    pub fanout_warning: f64,
    /// Schema similarity at which two tables are reported as redundant.
    pub redundancy_similarity: f64,
    /// Row count above which a table is treated as a fact table.
    pub fact_table_rows: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_key_score: 50,
            large_table_rows: 1000,
            min_candidate_score: 50,
            high_match_percentage: 80.0,
            high_name_score: 0.7,
            medium_match_percentage: 60.0,
            medium_name_score: 0.5,
            low_match_percentage: 30.0,
            low_name_score: 0.3,
            high_null_percentage: 50.0,
            extreme_null_percentage: 90.0,
            integrity_warning: 90.0,
            completeness_warning: 80.0,
            density_warning: 50.0,
            fanout_warning: 100.0,
            redundancy_similarity: 0.75,
            fact_table_rows: 10_000,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `ARCHAEOLOGIST_CONFIG`
    /// 2. `./archaeologist.toml`
    /// 3. `~/.config/archaeologist/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("ARCHAEOLOGIST_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("archaeologist.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("archaeologist").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let workers = self.discovery.worker_count;
        if workers == 0 || workers > MAX_WORKERS {
            return Err(SettingsError::InvalidConfig(format!(
                "worker_count must be between 1 and {}, got {}",
                MAX_WORKERS, workers
            )));
        }
        if self.discovery.sample_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "sample_size must be at least 1".to_string(),
            ));
        }

        let t = &self.discovery.thresholds;
        if t.min_key_score > 100 || t.min_candidate_score > 100 {
            return Err(SettingsError::InvalidConfig(
                "score floors must lie within 0..=100".to_string(),
            ));
        }
        for (name, value) in [
            ("high_name_score", t.high_name_score),
            ("medium_name_score", t.medium_name_score),
            ("low_name_score", t.low_name_score),
            ("redundancy_similarity", t.redundancy_similarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::InvalidConfig(format!(
                    "{} must lie within 0.0..=1.0, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Get an environment by name.
    pub fn get_environment(&self, name: &str) -> Result<&EnvironmentSettings, SettingsError> {
        self.environments
            .get(name)
            .ok_or_else(|| SettingsError::EnvironmentNotFound(name.to_string()))
    }

    /// Resolve an environment into a ready-to-use connection config.
    ///
    /// Fails when the environment is unknown, its driver is unsupported, or
    /// its location is missing.
    pub fn connection(&self, name: &str) -> Result<ConnectionConfig, SettingsError> {
        let environment = self.get_environment(name)?;
        let driver = environment.driver_type()?;

        let path = match environment.path.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => expand_env_vars(p)?,
            _ => return Err(SettingsError::MissingCredentials(name.to_string())),
        };
        if path.trim().is_empty() {
            return Err(SettingsError::MissingCredentials(name.to_string()));
        }

        Ok(ConnectionConfig::new(name, driver, path))
    }

    /// Names of all configured environments, sorted.
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                var_name.push(ch);
                chars.next();
            }
            if var_name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
