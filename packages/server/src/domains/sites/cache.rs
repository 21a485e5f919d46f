//! Bounded cache in front of the site registry.
//!
//! Only recorded statuses are cached. A miss is never remembered, so a site
//! indexed in the background shows up on the next lookup.

use anyhow::Result;
use moka::future::Cache;
use std::sync::Arc;
use tracing::debug;

use super::models::SiteStatus;
use super::registry::SiteRegistry;

pub const DEFAULT_CAPACITY: u64 = 100;

#[derive(Clone)]
pub struct SiteStatusCache {
    registry: Arc<dyn SiteRegistry>,
    cache: Cache<String, SiteStatus>,
}

impl SiteStatusCache {
    pub fn new(registry: Arc<dyn SiteRegistry>, capacity: u64) -> Self {
        Self {
            registry,
            cache: Cache::new(capacity),
        }
    }

    pub fn registry(&self) -> &Arc<dyn SiteRegistry> {
        &self.registry
    }

    /// Status for a url, from the cache when possible.
    pub async fn lookup(&self, url: &str) -> Result<Option<SiteStatus>> {
        if let Some(status) = self.cache.get(url).await {
            return Ok(Some(status));
        }

        let status = self.registry.find_by_url(url).await?;
        if let Some(status) = &status {
            debug!(url = %url, found_data = status.found_data, "Caching site status");
            self.cache.insert(url.to_string(), status.clone()).await;
        }
        Ok(status)
    }

    /// Drop the cached entry so the next lookup reads the registry.
    pub async fn invalidate(&self, url: &str) {
        self.cache.invalidate(url).await;
    }
}
