//! Typed errors for the policy index.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match on
//! what failed.

use thiserror::Error;

/// Errors that can occur while indexing or searching policy documents.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Scraping failed
    #[error("scrape failed: {0}")]
    Scrape(#[from] ScrapeError),

    /// LLM call failed (enrichment)
    #[error("AI service error: {0}")]
    Ai(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Vector store operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Site URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Errors that can occur while fetching or rendering pages.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Request exceeded its time budget
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Site answered with a bot-verification wall
    #[error("bot verification detected at {url}")]
    Blocked { url: String },

    /// Rendering service failed
    #[error("render failed: {0}")]
    Render(String),
}

impl ScrapeError {
    pub(crate) fn http(e: reqwest::Error, url: &str) -> Self {
        if e.is_timeout() {
            ScrapeError::Timeout {
                url: url.to_string(),
            }
        } else {
            ScrapeError::Http(Box::new(e))
        }
    }
}

/// Result type alias for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Result type alias for scrape operations.
pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;
