//! # Schema Archaeologist
//!
//! Reconstructs the structure a relational schema never declared: true keys,
//! undeclared foreign keys, relationship cardinality and business domains.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                Settings (archaeologist.toml)             │
//! │        (environments, worker count, thresholds)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [config]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  MetadataProvider                        │
//! │        (closed Statement set, typed Rows)                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [metadata]
//! ┌─────────────────────────────────────────────────────────┐
//! │               DiscoveryOrchestrator                      │
//! │  collector → keys / matcher → cardinality → domains      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [discovery]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  DiscoveryReport                         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is read-only: every statement a provider runs is a catalog or
//! sampling query.

pub mod config;
pub mod discovery;
pub mod metadata;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::{DiscoverySettings, Settings, Thresholds};
    pub use crate::discovery::{DiscoveryError, DiscoveryOrchestrator, DiscoveryReport};
    pub use crate::metadata::{MetadataProvider, MetadataProviderExt, SqliteProvider};
}
