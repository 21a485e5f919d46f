//! Testing utilities including mock implementations.
//!
//! These let applications exercise the indexing pipeline without network,
//! LLM or embedding calls.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::error::{IndexError, Result, ScrapeError, ScrapeResult};
use crate::scrape::renderer::{PageRenderer, RenderedPage};
use crate::traits::{embedder::Embedder, enricher::MetadataEnricher};

/// Deterministic pseudo-embedding derived from the SHA-256 of the text.
pub fn hash_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(text.as_bytes());
    (0..dimensions)
        .map(|i| (hash[i % 32] as f32 / 127.5) - 1.0)
        .collect()
}

/// Mock embedder.
///
/// Returns predefined vectors for known texts and hash embeddings otherwise.
/// Every call is recorded.
#[derive(Clone)]
pub struct MockEmbedder {
    embeddings: Arc<RwLock<HashMap<String, Vec<f32>>>>,
    dimensions: usize,
    fail: bool,
    calls: Arc<RwLock<Vec<String>>>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            embeddings: Arc::default(),
            dimensions: 64,
            fail: false,
            calls: Arc::default(),
        }
    }

    /// Use a fixed vector for this exact text.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embeddings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(text.into(), embedding);
        self
    }

    /// Make every call fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Texts embedded so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());

        if self.fail {
            return Err(IndexError::Embedding("mock embedder failure".into()));
        }

        let known = self
            .embeddings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text)
            .cloned();
        Ok(known.unwrap_or_else(|| hash_embedding(text, self.dimensions)))
    }
}

/// Mock metadata enricher.
///
/// Returns the configured object (with `domain` and `scrape_date` filled in,
/// like a well-behaved model) or fails for chunks containing a marker.
#[derive(Clone, Default)]
pub struct MockEnricher {
    response: Map<String, Value>,
    fail_marker: Option<String>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields returned for every chunk.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.response.insert(key.into(), value);
        self
    }

    /// Fail for any chunk whose text contains `marker`.
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Chunk texts enriched so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MetadataEnricher for MockEnricher {
    async fn enrich(
        &self,
        chunk_text: &str,
        site_url: &str,
        scrape_date: &str,
    ) -> Result<Map<String, Value>> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(chunk_text.to_string());

        if let Some(marker) = &self.fail_marker {
            if chunk_text.contains(marker.as_str()) {
                return Err(IndexError::Ai("mock enrichment failure".into()));
            }
        }

        let mut response = self.response.clone();
        response.insert("domain".into(), Value::String(site_url.to_string()));
        response.insert("scrape_date".into(), Value::String(scrape_date.to_string()));
        Ok(response)
    }
}

/// Mock renderer serving canned pages. Unknown URLs fail like an unreachable host.
#[derive(Clone, Default)]
pub struct MockRenderer {
    pages: Arc<RwLock<HashMap<String, RenderedPage>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, title: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        self.pages.write().unwrap_or_else(PoisonError::into_inner).insert(
            url.clone(),
            RenderedPage {
                final_url: url,
                title: title.into(),
                html: html.into(),
            },
        );
        self
    }

    /// URLs rendered so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn render(&self, url: &str, _timeout: Duration) -> ScrapeResult<RenderedPage> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
            .ok_or_else(|| ScrapeError::Render(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedding_is_deterministic() {
        assert_eq!(hash_embedding("cookies", 16), hash_embedding("cookies", 16));
        assert_ne!(hash_embedding("cookies", 16), hash_embedding("tracking", 16));
        assert!(hash_embedding("x", 100).iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[tokio::test]
    async fn test_mock_embedder_overrides() {
        let embedder = MockEmbedder::new().with_embedding("query", vec![1.0, 0.0]);
        assert_eq!(embedder.embed_query("query").await.unwrap(), vec![1.0, 0.0]);
        assert_eq!(embedder.embed_query("other").await.unwrap().len(), 64);
        assert_eq!(embedder.calls(), vec!["query", "other"]);
    }

    #[tokio::test]
    async fn test_mock_enricher_fills_domain() {
        let enricher = MockEnricher::new().with_field("language", Value::String("en".into()));
        let out = enricher.enrich("text", "https://a.com/", "2025-01-01T00:00:00Z").await.unwrap();
        assert_eq!(out["domain"], "https://a.com/");
        assert_eq!(out["language"], "en");
    }
}
