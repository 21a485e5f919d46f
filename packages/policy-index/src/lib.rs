//! Policy Document Indexing Library
//!
//! Finds a website's legal documents (privacy policy, terms of service, cookie
//! policy, ...), splits them into overlapping chunks, tags each chunk with
//! LLM-generated metadata, embeds it and stores it for similarity search.
//!
//! # Usage
//!
//! ```rust,ignore
//! use policy_index::{HttpRenderer, MemoryStore, MetadataFilter, PolicyIndexer, PolicyScraper};
//! use policy_index::testing::MockEmbedder;
//!
//! let scraper = PolicyScraper::new(Arc::new(HttpRenderer::new()?))?;
//! let indexer = PolicyIndexer::new(
//!     Arc::new(scraper),
//!     Arc::new(MockEmbedder::new()),
//!     Arc::new(MemoryStore::new()),
//! );
//!
//! let report = indexer.index_site("https://github.com/").await?;
//!
//! let filter = MetadataFilter::for_domain("https://github.com/");
//! let hits = indexer.retrieve_diverse("data sharing", 5, 20, 0.6, Some(&filter)).await?;
//! ```
//!
//! # Modules
//!
//! - [`scrape`] - Link discovery, bot-wall detection and page fetching
//! - [`splitter`] - Recursive character text splitter
//! - [`traits`] - Embedder, MetadataEnricher and ChunkStore abstractions
//! - [`stores`] - Storage implementations (MemoryStore, PostgresStore)
//! - [`pipeline`] - Indexing and retrieval
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod scrape;
pub mod splitter;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod openai;

pub use error::{IndexError, Result, ScrapeError, ScrapeResult};
pub use pipeline::{
    IndexReport, IndexerConfig, PolicyIndexer, DEFAULT_FETCH_K, DEFAULT_K, DEFAULT_LAMBDA,
};
pub use scrape::{
    detect_bot_verification, extract_main_text, Discovery, HttpRenderer, PageRenderer,
    PolicyScraper, RenderedPage, ScraperConfig, SiteScrape,
};
pub use splitter::{create_chunks, RecursiveSplitter};
pub use stores::MemoryStore;
pub use traits::{cosine_similarity, maximal_marginal_relevance, ChunkStore, Embedder, MetadataEnricher};
pub use types::{
    ChunkMetadata, EmbeddedChunk, MetadataFilter, MetadataValue, PolicyChunk, PolicyLink,
    PolicyPage, ScoredChunk,
};

#[cfg(feature = "firecrawl")]
pub use scrape::FirecrawlRenderer;

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

#[cfg(feature = "openai")]
pub use openai::{OpenAIEmbedder, OpenAIEnricher};
