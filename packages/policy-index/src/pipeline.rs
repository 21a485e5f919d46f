//! Indexing pipeline and retrieval.
//!
//! `index_site` runs: discover → fetch → split → enrich → embed → store.
//! Enrichment is best effort; everything else propagates errors.

use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::scrape::{Discovery, PolicyScraper};
use crate::splitter::{create_chunks, RecursiveSplitter};
use crate::traits::{ChunkStore, Embedder, MetadataEnricher};
use crate::types::{sanitize_metadata, EmbeddedChunk, MetadataFilter, MetadataValue, PolicyChunk, ScoredChunk};

/// Default number of chunks returned by retrieval.
pub const DEFAULT_K: usize = 5;
/// Default MMR trade-off between relevance (1.0) and diversity (0.0).
pub const DEFAULT_LAMBDA: f32 = 0.6;
/// Default MMR candidate pool.
pub const DEFAULT_FETCH_K: usize = 20;

/// Pipeline tuning.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub splitter: RecursiveSplitter,
    /// Concurrent enrichment calls
    pub enrich_concurrency: usize,
    /// Enrich only the first N chunks of a site (all when `None`)
    pub enrich_limit: Option<usize>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            splitter: RecursiveSplitter::default(),
            enrich_concurrency: 50,
            enrich_limit: None,
        }
    }
}

impl IndexerConfig {
    pub fn with_enrich_concurrency(mut self, n: usize) -> Self {
        self.enrich_concurrency = n.max(1);
        self
    }

    pub fn with_enrich_limit(mut self, limit: Option<usize>) -> Self {
        self.enrich_limit = limit;
        self
    }
}

/// Result of indexing one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub site_url: String,
    /// Whether any policy text was indexed
    pub found_data: bool,
    /// Why nothing was indexed
    pub issue: Option<String>,
    /// Documents fetched
    pub pages: usize,
    /// Chunks stored
    pub chunks: usize,
}

impl IndexReport {
    fn empty(site_url: &str, pages: usize, issue: String) -> Self {
        Self {
            site_url: site_url.to_string(),
            found_data: false,
            issue: Some(issue),
            pages,
            chunks: 0,
        }
    }
}

/// Scrapes, chunks, enriches, embeds and stores policy documents; answers searches.
pub struct PolicyIndexer {
    scraper: Arc<PolicyScraper>,
    embedder: Arc<dyn Embedder>,
    enricher: Option<Arc<dyn MetadataEnricher>>,
    store: Arc<dyn ChunkStore>,
    config: IndexerConfig,
}

impl PolicyIndexer {
    pub fn new(
        scraper: Arc<PolicyScraper>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ChunkStore>,
    ) -> Self {
        Self {
            scraper,
            embedder,
            enricher: None,
            store,
            config: IndexerConfig::default(),
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn MetadataEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_config(mut self, config: IndexerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Scrape and index a site, replacing whatever was stored for it.
    ///
    /// Sites without usable documents are reported with `found_data = false`
    /// and an `issue`; only infrastructure failures (embedding, storage) are errors.
    #[instrument(skip(self))]
    pub async fn index_site(&self, site_url: &str) -> Result<IndexReport> {
        let scrape = self.scraper.process_site(site_url).await?;

        match &scrape.discovery {
            Discovery::Failed { issue } | Discovery::Blocked { issue } => {
                return Ok(IndexReport::empty(site_url, 0, issue.clone()));
            }
            Discovery::Found(links) if links.is_empty() => {
                return Ok(IndexReport::empty(
                    site_url,
                    0,
                    format!("No policy documents found for {}", site_url),
                ));
            }
            Discovery::Found(_) => {}
        }

        let pages = scrape.pages.len();
        if !scrape.pages.iter().any(|p| p.has_content()) {
            return Ok(IndexReport::empty(
                site_url,
                pages,
                format!("No policy text could be extracted for {}", site_url),
            ));
        }

        let mut chunks = create_chunks(&self.config.splitter, site_url, &scrape.pages);
        debug!(url = %site_url, chunk_count = chunks.len(), "Split policy documents");

        self.enrich_chunks(site_url, &mut chunks).await;

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;
        let embedded: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect();

        self.store.replace_site(site_url, &embedded).await?;

        info!(url = %site_url, pages = pages, chunks = embedded.len(), "Site indexed");
        Ok(IndexReport {
            site_url: site_url.to_string(),
            found_data: true,
            issue: None,
            pages,
            chunks: embedded.len(),
        })
    }

    /// Stamp every chunk with the scrape date and merge LLM metadata into the
    /// first `enrich_limit` chunks. Failed enrichments leave a chunk as is.
    async fn enrich_chunks(&self, site_url: &str, chunks: &mut [PolicyChunk]) {
        let scrape_date = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        for chunk in chunks.iter_mut() {
            chunk.metadata.scrape_date = Some(scrape_date.clone());
        }

        let Some(enricher) = &self.enricher else {
            return;
        };

        let limit = self.config.enrich_limit.unwrap_or(chunks.len()).min(chunks.len());
        let semaphore = Arc::new(Semaphore::new(self.config.enrich_concurrency.max(1)));

        let calls = chunks[..limit].iter().map(|chunk| {
            let semaphore = semaphore.clone();
            let scrape_date = scrape_date.as_str();
            async move {
                let _permit = semaphore.acquire().await.ok()?;
                match enricher.enrich(&chunk.content, site_url, scrape_date).await {
                    Ok(raw) => Some(sanitize_metadata(&raw)),
                    Err(e) => {
                        warn!(chunk_id = %chunk.id, error = %e, "Metadata enrichment failed");
                        None
                    }
                }
            }
        });

        let results: Vec<Option<BTreeMap<String, MetadataValue>>> =
            futures::future::join_all(calls).await;

        let mut enriched = 0usize;
        for (chunk, metadata) in chunks.iter_mut().zip(results) {
            if let Some(metadata) = metadata {
                chunk.metadata.merge(metadata);
                enriched += 1;
            }
        }
        debug!(url = %site_url, enriched = enriched, attempted = limit, "Enrichment finished");
    }

    /// The `k` chunks most similar to the query.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let embedding = self.embedder.embed_query(query).await?;
        self.store.similarity_search(&embedding, k, filter).await
    }

    /// `k` relevant, mutually diverse chunks (maximal marginal relevance).
    pub async fn retrieve_diverse(
        &self,
        query: &str,
        k: usize,
        fetch_k: usize,
        lambda: f32,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let embedding = self.embedder.embed_query(query).await?;
        self.store
            .max_marginal_relevance_search(&embedding, k, fetch_k, lambda, filter)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::{MockEmbedder, MockEnricher, MockRenderer};
    use serde_json::json;

    const SITE: &str = "http://127.0.0.1:9/";
    const PRIVACY: &str = "We share your browsing history with advertising partners.";
    const TERMS: &str = "Subscriptions renew automatically unless cancelled in advance.";

    fn renderer() -> MockRenderer {
        MockRenderer::new()
            .with_page(
                SITE,
                "Home",
                r#"<a href="/privacy">Privacy</a><a href="/terms">Terms</a>"#,
            )
            .with_page(
                "http://127.0.0.1:9/privacy",
                "Privacy",
                &format!("<main><p>{PRIVACY}</p></main>"),
            )
            .with_page(
                "http://127.0.0.1:9/terms",
                "Terms",
                &format!("<main><p>{TERMS}</p></main>"),
            )
    }

    fn indexer(renderer: MockRenderer, store: Arc<MemoryStore>) -> PolicyIndexer {
        let scraper = PolicyScraper::new(Arc::new(renderer)).unwrap();
        PolicyIndexer::new(Arc::new(scraper), Arc::new(MockEmbedder::new()), store)
    }

    #[tokio::test]
    async fn test_index_site_stores_chunks() {
        let store = Arc::new(MemoryStore::new());
        let enricher = MockEnricher::new()
            .with_field("policy_type", json!("privacy_policy"))
            .with_field("risk_tags", json!(["data_sharing", "advertising"]))
            .with_field("section_title", json!(null));
        let indexer = indexer(renderer(), store.clone()).with_enricher(Arc::new(enricher));

        let report = indexer.index_site(SITE).await.unwrap();

        assert_eq!(
            report,
            IndexReport {
                site_url: SITE.into(),
                found_data: true,
                issue: None,
                pages: 2,
                chunks: 2,
            }
        );

        let chunks = store.chunks_for_site(SITE);
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert_eq!(chunk.metadata.domain, SITE);
            assert_eq!(chunk.metadata.policy_type.as_deref(), Some("privacy_policy"));
            assert_eq!(chunk.metadata.risk_tags.as_deref(), Some("data_sharing, advertising"));
            assert!(chunk.metadata.section_title.is_none());
            assert!(chunk.metadata.scrape_date.is_some());
        }
    }

    #[tokio::test]
    async fn test_enrichment_limit_and_failures() {
        let store = Arc::new(MemoryStore::new());
        let enricher = MockEnricher::new()
            .with_field("language", json!("en"))
            .failing_on("browsing history");
        let indexer = indexer(renderer(), store.clone())
            .with_enricher(Arc::new(enricher.clone()))
            .with_config(IndexerConfig::default().with_enrich_limit(Some(1)));

        let report = indexer.index_site(SITE).await.unwrap();
        assert!(report.found_data);

        // Only the first chunk (the failing one) was attempted.
        assert_eq!(enricher.calls(), vec![PRIVACY.to_string()]);
        assert!(store
            .chunks_for_site(SITE)
            .iter()
            .all(|c| c.metadata.language.is_none()));
    }

    #[tokio::test]
    async fn test_bot_wall_is_reported() {
        let renderer = MockRenderer::new().with_page(SITE, "Attention Required! | Cloudflare", "<p>x</p>");
        let store = Arc::new(MemoryStore::new());

        let report = indexer(renderer, store.clone()).index_site(SITE).await.unwrap();

        assert!(!report.found_data);
        assert_eq!(
            report.issue.as_deref(),
            Some("Skipping http://127.0.0.1:9/ - Bot verification detected")
        );
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_empty_documents_are_reported() {
        let renderer = MockRenderer::new().with_page(SITE, "Home", r#"<a href="/privacy">Privacy</a>"#);
        let store = Arc::new(MemoryStore::new());

        let report = indexer(renderer, store.clone()).index_site(SITE).await.unwrap();

        assert!(!report.found_data);
        assert_eq!(report.pages, 1);
        assert!(report.issue.unwrap().starts_with("No policy text"));
    }

    #[tokio::test]
    async fn test_reindex_replaces_chunks() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer(renderer(), store.clone());

        indexer.index_site(SITE).await.unwrap();
        indexer.index_site(SITE).await.unwrap();

        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_filters_by_domain() {
        let store = Arc::new(MemoryStore::new());
        let indexer = indexer(renderer(), store.clone());
        indexer.index_site(SITE).await.unwrap();

        let hits = indexer
            .retrieve_diverse(
                "auto renewal",
                DEFAULT_K,
                DEFAULT_FETCH_K,
                DEFAULT_LAMBDA,
                Some(&MetadataFilter::for_domain(SITE)),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);

        let other = MetadataFilter::for_domain("https://elsewhere.test/");
        assert!(indexer.retrieve("auto renewal", 5, Some(&other)).await.unwrap().is_empty());
    }
}
