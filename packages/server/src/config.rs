use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

use crate::domains::sites::cache::DEFAULT_CAPACITY;
use crate::kernel::background::DEFAULT_WORKERS;
use crate::kernel::{DEFAULT_CHAT_MODEL, DEFAULT_UTILITY_MODEL};

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_ENRICH_CONCURRENCY: usize = 50;
pub const DEFAULT_SCRAPE_LANDING_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SCRAPE_RENDER_TIMEOUT_SECS: u64 = 25;
pub const DEFAULT_SCRAPE_FETCH_CONCURRENCY: usize = 4;

/// Log filter for both binaries when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,server_core=debug,policy_index=debug,sqlx=warn";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent → in-memory stores
    pub database_url: Option<String>,
    pub port: u16,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub chat_model: String,
    pub utility_model: String,
    pub embedding_model: String,
    /// Present → pages are rendered through Firecrawl
    pub firecrawl_api_key: Option<String>,
    /// Present → /api/extension-auth verifies Clerk session tokens
    pub clerk_jwks_url: Option<String>,
    /// Empty → any origin
    pub allowed_origins: Vec<String>,
    pub index_workers: usize,
    pub site_cache_capacity: u64,
    pub enrich_chunk_limit: Option<usize>,
    pub enrich_concurrency: usize,
    pub scrape_landing_timeout_secs: u64,
    pub scrape_render_timeout_secs: u64,
    /// Policy documents fetched at once per site
    pub scrape_fetch_concurrency: usize,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(name) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", name)),
        None => Ok(default),
    }
}

/// Comma-separated origins, blanks dropped.
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            port: parsed("PORT", 8080)?,
            openai_api_key: env::var("OPENAI_API_KEY").context("OPENAI_API_KEY must be set")?,
            openai_base_url: optional("OPENAI_BASE_URL"),
            chat_model: optional("CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            utility_model: optional("UTILITY_MODEL")
                .unwrap_or_else(|| DEFAULT_UTILITY_MODEL.to_string()),
            embedding_model: optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            firecrawl_api_key: optional("FIRECRAWL_API_KEY"),
            clerk_jwks_url: optional("CLERK_JWKS_URL"),
            allowed_origins: optional("ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
            index_workers: parsed("INDEX_WORKERS", DEFAULT_WORKERS)?,
            site_cache_capacity: parsed("SITE_CACHE_CAPACITY", DEFAULT_CAPACITY)?,
            enrich_chunk_limit: optional("ENRICH_CHUNK_LIMIT")
                .map(|v| v.trim().parse())
                .transpose()
                .context("ENRICH_CHUNK_LIMIT must be a valid number")?,
            enrich_concurrency: parsed("ENRICH_CONCURRENCY", DEFAULT_ENRICH_CONCURRENCY)?,
            scrape_landing_timeout_secs: parsed(
                "SCRAPE_LANDING_TIMEOUT_SECS",
                DEFAULT_SCRAPE_LANDING_TIMEOUT_SECS,
            )?,
            scrape_render_timeout_secs: parsed(
                "SCRAPE_RENDER_TIMEOUT_SECS",
                DEFAULT_SCRAPE_RENDER_TIMEOUT_SECS,
            )?,
            scrape_fetch_concurrency: parsed(
                "SCRAPE_FETCH_CONCURRENCY",
                DEFAULT_SCRAPE_FETCH_CONCURRENCY,
            )?,
        })
    }
}
