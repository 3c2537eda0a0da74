//! Catalog fingerprinting.
//!
//! Two runs over an unchanged database produce the same fingerprint, so a
//! report can be matched to the catalog state it describes.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::types::{ColumnMetadata, TableProfile, TableRef};

/// SHA256 of a serializable value's JSON form, as 64 lowercase hex chars.
///
/// # Errors
/// Returns an error if the value cannot be serialized to JSON.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Serialize)]
struct CatalogShape<'a> {
    tables: Vec<(&'a TableRef, u64, Vec<&'a ColumnMetadata>)>,
}

/// Fingerprint of table structure and row counts. Column order follows
/// ordinal position; table order is sorted.
pub fn catalog_fingerprint(profiles: &[TableProfile]) -> Result<String, serde_json::Error> {
    let mut tables: Vec<_> = profiles
        .iter()
        .map(|p| {
            let mut columns: Vec<&ColumnMetadata> = p.columns.iter().map(|c| &c.metadata).collect();
            columns.sort_by_key(|c| c.ordinal_position);
            (&p.table, p.row_count, columns)
        })
        .collect();
    tables.sort_by(|a, b| a.0.cmp(b.0));
    compute_hash(&CatalogShape { tables })
}
