//! Non-blocking site indexing.
//!
//! `dispatch` returns immediately; the job runs on a tokio task, bounded by a
//! worker semaphore. A url is never indexed twice concurrently.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::domains::sites::{SiteStatus, SiteStatusCache};
use policy_index::PolicyIndexer;

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A new job was spawned
    Started,
    /// A job for this url is already in flight
    AlreadyRunning,
}

#[derive(Clone)]
pub struct BackgroundIndexer {
    indexer: Arc<PolicyIndexer>,
    sites: SiteStatusCache,
    workers: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Removes the url from the in-flight set when the job ends, however it ends.
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
    url: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.url);
    }
}

impl BackgroundIndexer {
    pub fn new(indexer: Arc<PolicyIndexer>, sites: SiteStatusCache, workers: usize) -> Self {
        Self {
            indexer,
            sites,
            workers: Arc::new(Semaphore::new(workers.max(1))),
            in_flight: Arc::default(),
        }
    }

    /// Start indexing `url` in the background.
    pub fn dispatch(&self, url: &str) -> DispatchOutcome {
        let Some(guard) = self.claim(url) else {
            info!(url = %url, "Indexing already in progress");
            return DispatchOutcome::AlreadyRunning;
        };

        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.run(guard).await {
                error!(error = %e, "Background indexing failed to record its outcome");
            }
        });

        info!(url = %url, "Background indexing started");
        DispatchOutcome::Started
    }

    /// Index `url` on the current task. `None` if a job for it is already running.
    pub async fn index_now(&self, url: &str) -> Result<Option<SiteStatus>> {
        match self.claim(url) {
            Some(guard) => self.run(guard).await.map(Some),
            None => Ok(None),
        }
    }

    pub fn is_running(&self, url: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(url)
    }

    fn claim(&self, url: &str) -> Option<InFlightGuard> {
        let inserted = self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string());

        inserted.then(|| InFlightGuard {
            in_flight: self.in_flight.clone(),
            url: url.to_string(),
        })
    }

    async fn run(&self, guard: InFlightGuard) -> Result<SiteStatus> {
        let url = guard.url.as_str();
        let _permit = self.workers.acquire().await?;

        let status = match self.indexer.index_site(url).await {
            Ok(report) => {
                info!(
                    url = %url,
                    found_data = report.found_data,
                    chunks = report.chunks,
                    "Indexing finished"
                );
                self.sites
                    .registry()
                    .record(url, report.found_data, report.issue.as_deref())
                    .await?
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Indexing failed");
                self.sites
                    .registry()
                    .record(url, false, Some(&e.to_string()))
                    .await?
            }
        };

        self.sites.invalidate(url).await;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::sites::{MemorySiteRegistry, SiteRegistry};
    use policy_index::testing::{MockEmbedder, MockRenderer};
    use policy_index::{MemoryStore, PolicyScraper};
    use std::time::Duration;

    const SITE: &str = "http://127.0.0.1:9/";

    fn background(renderer: MockRenderer, registry: MemorySiteRegistry) -> BackgroundIndexer {
        let scraper = PolicyScraper::new(Arc::new(renderer)).unwrap();
        let indexer = PolicyIndexer::new(
            Arc::new(scraper),
            Arc::new(MockEmbedder::new()),
            Arc::new(MemoryStore::new()),
        );
        let cache = SiteStatusCache::new(Arc::new(registry), 10);
        BackgroundIndexer::new(Arc::new(indexer), cache, 2)
    }

    #[tokio::test]
    async fn test_index_now_records_outcome() {
        let renderer = MockRenderer::new()
            .with_page(SITE, "Home", r#"<a href="/privacy">Privacy</a>"#)
            .with_page(
                "http://127.0.0.1:9/privacy",
                "Privacy",
                "<main><p>We retain account data for as long as your account is active.</p></main>",
            );
        let registry = MemorySiteRegistry::new();
        let background = background(renderer, registry.clone());

        let status = background.index_now(SITE).await.unwrap().unwrap();

        assert!(status.found_data);
        assert!(registry.find_by_url(SITE).await.unwrap().unwrap().found_data);
        assert!(!background.is_running(SITE));
    }

    #[tokio::test]
    async fn test_unreachable_site_is_recorded_without_data() {
        let registry = MemorySiteRegistry::new();
        let background = background(MockRenderer::new(), registry.clone());

        let status = background.index_now(SITE).await.unwrap().unwrap();

        assert!(!status.found_data);
        assert!(status.issue.unwrap().starts_with("Failed to load"));
    }

    #[tokio::test]
    async fn test_dispatch_deduplicates() {
        let registry = MemorySiteRegistry::new();
        let background = background(MockRenderer::new(), registry.clone());

        let _guard = background.claim(SITE).unwrap();
        assert_eq!(background.dispatch(SITE), DispatchOutcome::AlreadyRunning);
        assert!(background.index_now(SITE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dispatch_runs_in_background() {
        let registry = MemorySiteRegistry::new();
        let background = background(MockRenderer::new(), registry.clone());

        assert_eq!(background.dispatch(SITE), DispatchOutcome::Started);

        tokio::time::timeout(Duration::from_secs(5), async {
            while background.is_running(SITE) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert!(registry.find_by_url(SITE).await.unwrap().is_some());
    }
}
