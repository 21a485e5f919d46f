//! Where indexing outcomes are recorded.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::models::SiteStatus;

/// Lookup and recording of per-site index status.
#[async_trait]
pub trait SiteRegistry: Send + Sync {
    /// Latest status for a url, `None` if the site was never indexed.
    async fn find_by_url(&self, url: &str) -> Result<Option<SiteStatus>>;

    /// Record the outcome of an indexing attempt.
    async fn record(&self, url: &str, found_data: bool, issue: Option<&str>) -> Result<SiteStatus>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

#[derive(Clone)]
pub struct PostgresSiteRegistry {
    pool: PgPool,
}

impl PostgresSiteRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteRegistry for PostgresSiteRegistry {
    async fn find_by_url(&self, url: &str) -> Result<Option<SiteStatus>> {
        SiteStatus::find_latest(url, &self.pool).await
    }

    async fn record(&self, url: &str, found_data: bool, issue: Option<&str>) -> Result<SiteStatus> {
        SiteStatus::insert(url, found_data, issue, &self.pool).await
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Registry kept in process memory (tests, local runs without a database).
#[derive(Clone, Default)]
pub struct MemorySiteRegistry {
    statuses: Arc<RwLock<HashMap<String, SiteStatus>>>,
}

impl MemorySiteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a status directly.
    pub fn with_status(self, url: &str, found_data: bool, issue: Option<&str>) -> Self {
        self.insert(url, found_data, issue);
        self
    }

    fn insert(&self, url: &str, found_data: bool, issue: Option<&str>) -> SiteStatus {
        let status = SiteStatus {
            url: url.to_string(),
            found_data,
            issue: issue.map(str::to_string),
            checked_at: Utc::now(),
        };
        self.statuses
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), status.clone());
        status
    }
}

#[async_trait]
impl SiteRegistry for MemorySiteRegistry {
    async fn find_by_url(&self, url: &str) -> Result<Option<SiteStatus>> {
        Ok(self
            .statuses
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned())
    }

    async fn record(&self, url: &str, found_data: bool, issue: Option<&str>) -> Result<SiteStatus> {
        Ok(self.insert(url, found_data, issue))
    }
}
