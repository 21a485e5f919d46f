//! Metadata filters for vector search.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::chunk::{ChunkMetadata, MetadataValue};

/// Exact-match conditions on chunk metadata. All must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub conditions: BTreeMap<String, MetadataValue>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict results to chunks scraped for one site.
    pub fn for_domain(site_url: impl Into<String>) -> Self {
        let site_url: String = site_url.into();
        Self::new().with("domain", site_url)
    }

    /// Add a condition.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.conditions.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Whether the metadata satisfies every condition.
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        if self.is_empty() {
            return true;
        }
        let flat = metadata.to_json();
        self.conditions.iter().all(|(key, expected)| {
            flat.get(key)
                .and_then(|v| serde_json::from_value::<MetadataValue>(v.clone()).ok())
                .is_some_and(|actual| &actual == expected)
        })
    }

    /// JSON object usable with Postgres `@>` containment.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .conditions
            .iter()
            .filter_map(|(k, v)| serde_json::to_value(v).ok().map(|v| (k.clone(), v)))
            .collect();
        Value::Object(map)
    }
}
