//! Site-level scraping: discovery of policy links and page fetching.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::bot::{detect_bot_verification, BotProbe};
use super::links::{brute_force_candidates, policy_links};
use super::renderer::{browser_client, PageRenderer};
use super::text::extract_main_text;
use crate::error::{ScrapeError, ScrapeResult};
use crate::types::{PolicyLink, PolicyPage};

/// Time budgets and fan-out for scraping.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// Landing page render
    pub landing_timeout: Duration,
    /// Each brute-force path probe
    pub probe_timeout: Duration,
    /// HEAD content-type check
    pub head_timeout: Duration,
    /// Plain GET of an HTML document
    pub get_timeout: Duration,
    /// Rendered fetch of a non-HTML or failing document
    pub render_timeout: Duration,
    /// Documents fetched concurrently per site
    pub fetch_concurrency: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            landing_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(5),
            head_timeout: Duration::from_secs(5),
            get_timeout: Duration::from_secs(10),
            render_timeout: Duration::from_secs(25),
            fetch_concurrency: 4,
        }
    }
}

impl ScraperConfig {
    pub fn with_landing_timeout(mut self, timeout: Duration) -> Self {
        self.landing_timeout = timeout;
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n.max(1);
        self
    }
}

/// Outcome of looking for policy documents on a landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// The landing page could not be loaded
    Failed { issue: String },
    /// The landing page is a bot-verification wall
    Blocked { issue: String },
    /// Candidate document links (possibly empty)
    Found(Vec<PolicyLink>),
}

impl Discovery {
    /// Why no documents can be scraped, if that is the case.
    pub fn issue(&self) -> Option<&str> {
        match self {
            Discovery::Failed { issue } | Discovery::Blocked { issue } => Some(issue.as_str()),
            Discovery::Found(_) => None,
        }
    }

    pub fn links(&self) -> &[PolicyLink] {
        match self {
            Discovery::Found(links) => links,
            _ => &[],
        }
    }
}

/// Everything scraped for one site.
#[derive(Debug, Clone)]
pub struct SiteScrape {
    pub site_url: String,
    pub discovery: Discovery,
    /// One entry per discovered link, in link order. Failed fetches have empty content.
    pub pages: Vec<PolicyPage>,
}

/// Finds and fetches a site's legal documents.
pub struct PolicyScraper {
    client: reqwest::Client,
    renderer: Arc<dyn PageRenderer>,
    config: ScraperConfig,
}

impl PolicyScraper {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> ScrapeResult<Self> {
        Ok(Self {
            client: browser_client()?,
            renderer,
            config: ScraperConfig::default(),
        })
    }

    pub fn with_config(mut self, config: ScraperConfig) -> Self {
        self.config = config;
        self
    }

    /// Render the landing page and collect links to policy documents.
    ///
    /// Load failures and bot walls are reported as [`Discovery`] variants, not errors.
    /// Only an unparseable `site_url` is an error.
    pub async fn discover(&self, site_url: &str) -> ScrapeResult<Discovery> {
        let base = Url::parse(site_url).map_err(|_| ScrapeError::InvalidUrl {
            url: site_url.to_string(),
        })?;

        let page = match self.renderer.render(site_url, self.config.landing_timeout).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %site_url, error = %e, "Failed to load landing page");
                return Ok(Discovery::Failed {
                    issue: format!("Failed to load {}: {}", site_url, e),
                });
            }
        };

        let probe = BotProbe {
            title: &page.title,
            html: &page.html,
            url: &page.final_url,
        };
        if detect_bot_verification(probe) {
            info!(url = %site_url, "Skipping site, bot verification detected");
            return Ok(Discovery::Blocked {
                issue: format!("Skipping {} - Bot verification detected", site_url),
            });
        }

        let links = policy_links(&base, &page.html);
        if !links.is_empty() {
            debug!(url = %site_url, link_count = links.len(), "Policy links found on landing page");
            return Ok(Discovery::Found(links));
        }

        let probed = self.probe_well_known_paths(&base).await;
        info!(url = %site_url, link_count = probed.len(), "No policy links on page, probed well-known paths");
        Ok(Discovery::Found(probed))
    }

    /// GET each well-known path; keep those answering 200.
    async fn probe_well_known_paths(&self, base: &Url) -> Vec<PolicyLink> {
        let probes = brute_force_candidates(base).into_iter().map(|link| async move {
            let response = self
                .client
                .get(&link.href)
                .timeout(self.config.probe_timeout)
                .send()
                .await;
            match response {
                Ok(r) if r.status() == reqwest::StatusCode::OK => Some(link),
                Ok(r) => {
                    debug!(url = %link.href, status = %r.status(), "Probe miss");
                    None
                }
                Err(e) => {
                    debug!(url = %link.href, error = %e, "Probe unreachable");
                    None
                }
            }
        });

        futures::future::join_all(probes)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Fetch one document's main text. Never fails: an empty string means nothing usable.
    ///
    /// Plain HTML (per a HEAD check) is fetched with a GET; anything else, or any
    /// failure on that path, goes through the renderer.
    pub async fn fetch_page(&self, url: &str) -> String {
        match self.fetch_static_html(url).await {
            Ok(Some(html)) => return extract_main_text(&html),
            Ok(None) => debug!(url = %url, "Non-HTML content, rendering"),
            Err(e) => debug!(url = %url, error = %e, "Static fetch failed, rendering"),
        }

        match self.renderer.render(url, self.config.render_timeout).await {
            Ok(page) => extract_main_text(&page.html),
            Err(e) => {
                warn!(url = %url, error = %e, "Render failed");
                String::new()
            }
        }
    }

    /// `Ok(None)` when the HEAD check says the document is not HTML.
    async fn fetch_static_html(&self, url: &str) -> ScrapeResult<Option<String>> {
        let head = self
            .client
            .head(url)
            .timeout(self.config.head_timeout)
            .send()
            .await
            .map_err(|e| ScrapeError::http(e, url))?;

        let is_html = head
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_lowercase().contains("text/html"));
        if !is_html {
            return Ok(None);
        }

        let html = self
            .client
            .get(url)
            .timeout(self.config.get_timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ScrapeError::http(e, url))?
            .text()
            .await
            .map_err(|e| ScrapeError::http(e, url))?;

        Ok(Some(html))
    }

    /// Discover and fetch every policy document of a site.
    pub async fn process_site(&self, site_url: &str) -> ScrapeResult<SiteScrape> {
        let discovery = self.discover(site_url).await?;

        let pages: Vec<PolicyPage> = stream::iter(discovery.links().to_vec())
            .map(|link| async move {
                debug!(url = %link.href, text = %link.text, "Fetching policy document");
                let content = self.fetch_page(&link.href).await;
                PolicyPage::new(link.href, content)
            })
            .buffered(self.config.fetch_concurrency.max(1))
            .collect()
            .await;

        info!(
            url = %site_url,
            pages = pages.len(),
            non_empty = pages.iter().filter(|p| p.has_content()).count(),
            "Site scrape finished"
        );

        Ok(SiteScrape {
            site_url: site_url.to_string(),
            discovery,
            pages,
        })
    }
}
