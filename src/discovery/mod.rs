//! Relationship and key inference.
//!
//! # Pipeline
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Phase 1: catalog & statistics                                    │
//! │   declared_primary_keys, declared_foreign_keys,                  │
//! │   column_statistics:{schema}.{table}          (collector)        │
//! └──────────────────────────────────────────────────────────────────┘
//!                           │ TableProfile, declared constraints
//!                           ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Phase 2: logical                                                 │
//! │   primary_key_reconciliation                  (keys)             │
//! │   foreign_key_matching:{schema}.{table}.{col} (matcher)          │
//! │   cardinality:{constraint}                    (cardinality)      │
//! │   schema_redundancy                           (redundancy)       │
//! └──────────────────────────────────────────────────────────────────┘
//!                           │ KeySet, RelationshipCandidate
//!                           ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ Phase 3: business                                                │
//! │   business_domains                            (domains)          │
//! └──────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//!                    DiscoveryReport
//! ```
//!
//! Scoring rules live in [`rules`] as tables of predicates and deltas rather
//! than inline conditionals.

pub mod cardinality;
pub mod collector;
pub mod domains;
pub mod fingerprint;
pub mod inflection;
pub mod keys;
pub mod matcher;
pub mod orchestrator;
pub mod redundancy;
pub mod report;
pub mod rules;
pub mod types;
pub mod units;

pub use cardinality::{CardinalityResult, IntegrityDistribution, RelationshipPattern};
pub use collector::{Collector, DeclaredForeignKey, DeclaredPrimaryKey};
pub use domains::{BusinessDomain, DomainAnalysis, DomainCluster};
pub use keys::{KeyCandidate, KeyOrigin, KeyReconciliation, KeySet};
pub use matcher::{ConfidenceTier, RelationshipCandidate, RelationshipOrigin};
pub use orchestrator::{DiscoveryError, DiscoveryOrchestrator};
pub use redundancy::RedundantTablePair;
pub use report::{AnalysisError, DiscoveryReport, Insight, Phase};
pub use types::{ColumnMetadata, ColumnProfile, ColumnRef, ColumnStatistics, TableProfile, TableRef};
