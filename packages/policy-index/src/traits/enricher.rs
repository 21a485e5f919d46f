//! Chunk metadata enrichment.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// Generates structured metadata for a chunk of policy text.
///
/// The returned object is raw model output; callers run it through
/// [`sanitize_metadata`](crate::types::sanitize_metadata) before storing it.
#[async_trait]
pub trait MetadataEnricher: Send + Sync {
    /// `scrape_date` is an ISO-8601 UTC timestamp.
    async fn enrich(
        &self,
        chunk_text: &str,
        site_url: &str,
        scrape_date: &str,
    ) -> Result<Map<String, Value>>;
}
