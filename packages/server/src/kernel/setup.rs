//! Production wiring of [`ServerDeps`] from [`Config`].

use anyhow::{Context, Result};
use openai_client::OpenAIClient;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use policy_index::{
    ChunkStore, FirecrawlRenderer, HttpRenderer, IndexerConfig, MemoryStore, OpenAIEmbedder,
    OpenAIEnricher, PageRenderer, PolicyIndexer, PolicyScraper, PostgresStore, ScraperConfig,
};

use super::{ModelConfig, ServerDeps};
use crate::config::Config;
use crate::domains::conversations::{
    ConversationStore, MemoryConversationStore, PostgresConversationStore,
};
use crate::domains::sites::{
    MemorySiteRegistry, PostgresSiteRegistry, SiteRegistry, SiteStatusCache,
};

/// Connect and migrate.
pub async fn connect_database(database_url: &str) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected");

    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations complete");

    Ok(pool)
}

/// Scraper time budgets and fan-out from configuration.
pub fn scraper_config(config: &Config) -> ScraperConfig {
    ScraperConfig::default()
        .with_landing_timeout(Duration::from_secs(config.scrape_landing_timeout_secs))
        .with_render_timeout(Duration::from_secs(config.scrape_render_timeout_secs))
        .with_fetch_concurrency(config.scrape_fetch_concurrency)
}

/// Everything the chat graph and HTTP handlers need, from configuration.
///
/// Without `DATABASE_URL` every store lives in memory.
pub async fn build_server_deps(config: &Config) -> Result<ServerDeps> {
    let mut openai = OpenAIClient::new(&config.openai_api_key);
    if let Some(base_url) = &config.openai_base_url {
        openai = openai.with_base_url(base_url);
    }

    let renderer: Arc<dyn PageRenderer> = match &config.firecrawl_api_key {
        Some(key) => {
            info!("Rendering pages with Firecrawl");
            Arc::new(FirecrawlRenderer::new(key).context("Failed to create Firecrawl renderer")?)
        }
        None => Arc::new(HttpRenderer::new().context("Failed to create HTTP renderer")?),
    };
    let scraper = PolicyScraper::new(renderer)
        .context("Failed to create scraper")?
        .with_config(scraper_config(config));

    let db_pool = match &config.database_url {
        Some(url) => Some(connect_database(url).await?),
        None => {
            info!("DATABASE_URL not set, using in-memory stores");
            None
        }
    };

    let (chunks, sites, conversations): (
        Arc<dyn ChunkStore>,
        Arc<dyn SiteRegistry>,
        Arc<dyn ConversationStore>,
    ) = match &db_pool {
        Some(pool) => (
            Arc::new(PostgresStore::from_pool(pool.clone())),
            Arc::new(PostgresSiteRegistry::new(pool.clone())),
            Arc::new(PostgresConversationStore::new(pool.clone())),
        ),
        None => (
            Arc::new(MemoryStore::new()),
            Arc::new(MemorySiteRegistry::new()),
            Arc::new(MemoryConversationStore::new()),
        ),
    };

    let embedder = OpenAIEmbedder::new(openai.clone()).with_model(&config.embedding_model);
    let enricher = OpenAIEnricher::new(openai.clone()).with_model(&config.utility_model);
    let indexer = PolicyIndexer::new(Arc::new(scraper), Arc::new(embedder), chunks)
        .with_enricher(Arc::new(enricher))
        .with_config(
            IndexerConfig::default()
                .with_enrich_concurrency(config.enrich_concurrency)
                .with_enrich_limit(config.enrich_chunk_limit),
        );

    let models = ModelConfig {
        chat: config.chat_model.clone(),
        utility: config.utility_model.clone(),
    };

    Ok(ServerDeps::new(
        db_pool,
        Arc::new(openai),
        models,
        Arc::new(indexer),
        SiteStatusCache::new(sites, config.site_cache_capacity),
        conversations,
        config.index_workers,
    ))
}
