//! Chunks of policy text and their metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A scalar metadata value, the only kind vector stores accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    /// Render as plain text (strings unquoted).
    pub fn as_text(&self) -> String {
        match self {
            MetadataValue::Bool(b) => b.to_string(),
            MetadataValue::Int(i) => i.to_string(),
            MetadataValue::Float(f) => f.to_string(),
            MetadataValue::String(s) => s.clone(),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

/// Flatten an LLM metadata response into scalar values.
///
/// Nulls are dropped, scalars kept, arrays joined with `", "`, and anything
/// else stringified.
pub fn sanitize_metadata(raw: &Map<String, Value>) -> BTreeMap<String, MetadataValue> {
    raw.iter()
        .filter_map(|(key, value)| {
            let clean = match value {
                Value::Null => return None,
                Value::Bool(b) => MetadataValue::Bool(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => MetadataValue::Int(i),
                    None => MetadataValue::Float(n.as_f64().unwrap_or_default()),
                },
                Value::String(s) => MetadataValue::String(s.clone()),
                Value::Array(items) => MetadataValue::String(
                    items.iter().map(plain_text).collect::<Vec<_>>().join(", "),
                ),
                Value::Object(_) => MetadataValue::String(value.to_string()),
            };
            Some((key.clone(), clean))
        })
        .collect()
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Metadata attached to every chunk.
///
/// `source` and `domain` are set by the splitter; the rest comes from enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// URL of the page the chunk came from
    pub source: String,

    /// Site the page belongs to
    pub domain: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// privacy_policy | terms_of_service | cookie_policy | acceptable_use | other
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_tags: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,

    /// low | medium | high
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_impact_level: Option<String>,

    /// Any other key the enrichment returned
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetadataValue>,
}

impl ChunkMetadata {
    pub fn new(source: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// Merge enrichment output. `source` and `domain` are never overwritten.
    pub fn merge(&mut self, enrichment: BTreeMap<String, MetadataValue>) {
        for (key, value) in enrichment {
            let slot = match key.as_str() {
                "source" | "domain" => continue,
                "scrape_date" => &mut self.scrape_date,
                "language" => &mut self.language,
                "policy_type" => &mut self.policy_type,
                "risk_tags" => &mut self.risk_tags,
                "section_title" => &mut self.section_title,
                "summary" => &mut self.summary,
                "categories" => &mut self.categories,
                "user_impact_level" => &mut self.user_impact_level,
                _ => {
                    self.extra.insert(key.clone(), value);
                    continue;
                }
            };
            *slot = Some(value.as_text());
        }
    }

    /// Flat JSON object, as persisted.
    pub fn to_json(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// A piece of a policy document, ready to embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyChunk {
    /// Content hash, see [`chunk_id`]
    pub id: String,
    pub site_url: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Stable chunk identifier: `sha256(site_url | source | ordinal | content)` as hex.
pub fn chunk_id(site_url: &str, source: &str, ordinal: usize, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(site_url.as_bytes());
    hasher.update(b"|");
    hasher.update(source.as_bytes());
    hasher.update(b"|");
    hasher.update(ordinal.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// A chunk together with its embedding.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: PolicyChunk,
    pub embedding: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: PolicyChunk,

    /// Cosine similarity to the query (1.0 = identical direction)
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_metadata() {
        let raw = json!({
            "language": "en",
            "risk_tags": ["data_sharing", "location_tracking"],
            "section_title": null,
            "confidence": 0.75,
            "chunk_count": 3,
            "reviewed": false,
            "nested": {"a": 1}
        });
        let clean = sanitize_metadata(raw.as_object().unwrap());

        assert_eq!(clean.get("language"), Some(&MetadataValue::from("en")));
        assert_eq!(
            clean.get("risk_tags"),
            Some(&MetadataValue::from("data_sharing, location_tracking"))
        );
        assert!(!clean.contains_key("section_title"));
        assert_eq!(clean.get("confidence"), Some(&MetadataValue::Float(0.75)));
        assert_eq!(clean.get("chunk_count"), Some(&MetadataValue::Int(3)));
        assert_eq!(clean.get("reviewed"), Some(&MetadataValue::Bool(false)));
        assert_eq!(clean.get("nested"), Some(&MetadataValue::from(r#"{"a":1}"#)));
    }

    #[test]
    fn test_merge_keeps_source_and_domain() {
        let mut meta = ChunkMetadata::new("https://a.com/privacy", "https://a.com/");
        let enrichment = sanitize_metadata(
            json!({
                "source": "hallucinated",
                "domain": "https://evil.com/",
                "policy_type": "privacy_policy",
                "user_impact_level": "high",
                "jurisdiction": "EU"
            })
            .as_object()
            .unwrap(),
        );
        meta.merge(enrichment);

        assert_eq!(meta.source, "https://a.com/privacy");
        assert_eq!(meta.domain, "https://a.com/");
        assert_eq!(meta.policy_type.as_deref(), Some("privacy_policy"));
        assert_eq!(meta.user_impact_level.as_deref(), Some("high"));
        assert_eq!(meta.extra.get("jurisdiction"), Some(&MetadataValue::from("EU")));
    }

    #[test]
    fn test_metadata_json_is_flat() {
        let mut meta = ChunkMetadata::new("https://a.com/terms", "https://a.com/");
        meta.language = Some("en".into());
        meta.extra.insert("page_rank".into(), MetadataValue::Int(2));

        let map = meta.to_json();
        assert_eq!(map["source"], "https://a.com/terms");
        assert_eq!(map["language"], "en");
        assert_eq!(map["page_rank"], 2);
        assert!(!map.contains_key("summary"));

        let back: ChunkMetadata = serde_json::from_value(Value::Object(map)).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn test_chunk_id_is_stable() {
        let a = chunk_id("https://a.com/", "https://a.com/privacy", 0, "text");
        let b = chunk_id("https://a.com/", "https://a.com/privacy", 0, "text");
        let c = chunk_id("https://a.com/", "https://a.com/privacy", 1, "text");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
