//! The site catalog: an aggregate index of every published record.
//!
//! The catalog lives at `_index.json` in the archive root and maps guid
//! to the record's `Item` metadata, so templates can render listings
//! without re-reading every record file. Aggregation is deliberately tolerant:
//! records missing a guid or a parseable `published` date are skipped
//! silently, and a corrupt index on disk starts over empty rather than
//! failing the build. Records dated in the future are held back unless
//! the caller opts in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// File name of the catalog within the archive root.
pub const INDEX_FILENAME: &str = "_index.json";

/// Aggregate index of records, keyed by guid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "Items", default)]
    pub items: BTreeMap<String, Value>,
    #[serde(rename = "totalResults", default)]
    pub total_results: usize,
}

impl Catalog {
    pub fn empty() -> Self {
        Catalog {
            items: BTreeMap::new(),
            total_results: 0,
        }
    }

    /// Load the catalog from disk. A missing or malformed file yields an
    /// empty catalog; aggregation rebuilds it from the records.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => return Catalog::empty(),
        };
        serde_json::from_str(&raw).unwrap_or_else(|_| Catalog::empty())
    }
}

/// Merge records into the catalog. Each publishable record upserts its
/// `Item` section by guid (last write wins); anything unpublishable is
/// skipped. Returns how many records were merged.
pub fn add_to_index(catalog: &mut Catalog, records: &[Value], include_future: bool) -> usize {
    let now = Utc::now();
    let mut merged = 0;
    for record in records {
        let item = &record["Item"];
        let guid = match item["guid"].as_str() {
            Some(guid) if !guid.is_empty() => guid,
            _ => continue,
        };
        let published = match item["published"].as_str() {
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(dt) => dt,
                Err(_) => continue,
            },
            None => continue,
        };
        if !include_future && published > now {
            info!(guid, published = %published, "holding back future publish");
            continue;
        }
        catalog.items.insert(guid.to_string(), item.clone());
        merged += 1;
    }
    catalog.total_results = catalog.items.len();
    merged
}
