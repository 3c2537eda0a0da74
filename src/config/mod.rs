//! Configuration module for the archaeologist.
//!
//! Handles the environment registry, discovery tuning and thresholds. A
//! [`Settings`] value is passed explicitly into the orchestrator; nothing here
//! is process-wide state.

mod connection;
mod settings;

pub use connection::{ConnectionConfig, ConnectionError, Driver};
pub use settings::{
    expand_env_vars, DiscoverySettings, EnvironmentSettings, Settings, SettingsError, Thresholds,
    MAX_WORKERS,
};
