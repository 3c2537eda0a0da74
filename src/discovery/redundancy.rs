//! Schema redundancy: table pairs with near-identical column sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::Thresholds;

use super::rules::types_compatible;
use super::types::{round2, TableProfile, TableRef};

const NAME_WEIGHT: f64 = 0.7;
const TYPE_WEIGHT: f64 = 0.3;

/// What to do about a redundant pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedundancyRecommendation {
    /// 95% or more.
    Consolidate,
    /// 85% or more.
    Review,
    Monitor,
}

impl RedundancyRecommendation {
    pub fn for_similarity(similarity: f64) -> Self {
        if similarity >= 0.95 {
            Self::Consolidate
        } else if similarity >= 0.85 {
            Self::Review
        } else {
            Self::Monitor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedundantTablePair {
    pub first: TableRef,
    pub second: TableRef,
    /// 0–1.
    pub similarity: f64,
    pub shared_columns: Vec<String>,
    pub recommendation: RedundancyRecommendation,
}

/// Similarity of two column sets: name Jaccard weighted with type agreement
/// on the shared columns.
pub fn schema_similarity(first: &BTreeMap<String, String>, second: &BTreeMap<String, String>) -> f64 {
    if first.is_empty() || second.is_empty() {
        return 0.0;
    }
    let a: BTreeSet<&String> = first.keys().collect();
    let b: BTreeSet<&String> = second.keys().collect();
    let common: Vec<&String> = a.intersection(&b).copied().collect();
    let union = a.union(&b).count();

    let name_similarity = common.len() as f64 / union as f64;
    let type_similarity = if common.is_empty() {
        0.0
    } else {
        let agreeing = common
            .iter()
            .filter(|c| types_compatible(&first[c.as_str()], &second[c.as_str()]))
            .count();
        agreeing as f64 / common.len() as f64
    };
    name_similarity * NAME_WEIGHT + type_similarity * TYPE_WEIGHT
}

fn column_types(profile: &TableProfile) -> BTreeMap<String, String> {
    profile
        .columns
        .iter()
        .map(|c| (c.metadata.column.to_lowercase(), c.metadata.data_type.clone()))
        .collect()
}

/// Every pair at or above `redundancy_similarity`, most similar first.
pub fn find_redundant_tables(
    profiles: &[TableProfile],
    thresholds: &Thresholds,
) -> Vec<RedundantTablePair> {
    let schemas: Vec<(&TableRef, BTreeMap<String, String>)> = profiles
        .iter()
        .map(|p| (&p.table, column_types(p)))
        .collect();

    let mut pairs = Vec::new();
    for (i, (first, a)) in schemas.iter().enumerate() {
        for (second, b) in &schemas[i + 1..] {
            let similarity = schema_similarity(a, b);
            if similarity < thresholds.redundancy_similarity {
                continue;
            }
            pairs.push(RedundantTablePair {
                first: (*first).clone(),
                second: (*second).clone(),
                similarity: round2(similarity),
                shared_columns: a.keys().filter(|k| b.contains_key(*k)).cloned().collect(),
                recommendation: RedundancyRecommendation::for_similarity(similarity),
            });
        }
    }

    pairs.sort_by(|x, y| {
        y.similarity
            .total_cmp(&x.similarity)
            .then_with(|| x.first.cmp(&y.first))
            .then_with(|| x.second.cmp(&y.second))
    });
    pairs
}
