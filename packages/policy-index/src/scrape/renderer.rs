//! Page rendering backends.
//!
//! `HttpRenderer` issues a plain GET with browser-like headers. It is enough for
//! server-rendered sites. `FirecrawlRenderer` (feature `firecrawl`) hands the URL to
//! the Firecrawl API, which executes JavaScript before returning the HTML.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, UPGRADE_INSECURE_REQUESTS};
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

use crate::error::{ScrapeError, ScrapeResult};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A page as a browser would see it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    /// URL after redirects
    pub final_url: String,
    pub title: String,
    pub html: String,
}

/// Renders a URL into HTML.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Load `url`, giving up after `timeout`.
    async fn render(&self, url: &str, timeout: Duration) -> ScrapeResult<RenderedPage>;
}

/// Build a reqwest client that looks like a desktop browser.
pub fn browser_client() -> ScrapeResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| ScrapeError::Http(Box::new(e)))
}

/// `<title>` text, trimmed.
pub fn html_title(html: &str) -> String {
    let document = Html::parse_document(html);
    Selector::parse("title")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

/// Plain HTTP renderer. No JavaScript.
#[derive(Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    pub fn new() -> ScrapeResult<Self> {
        Ok(Self {
            client: browser_client()?,
        })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> ScrapeResult<RenderedPage> {
        debug!(url = %url, "HTTP render starting");
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ScrapeError::http(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Render(format!("HTTP {} for {}", status, url)));
        }

        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::http(e, url))?;

        Ok(RenderedPage {
            title: html_title(&html),
            final_url,
            html,
        })
    }
}

#[cfg(feature = "firecrawl")]
pub use firecrawl::FirecrawlRenderer;

#[cfg(feature = "firecrawl")]
mod firecrawl {
    use super::*;
    use serde::{Deserialize, Serialize};

    const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1";

    /// Renders pages through the Firecrawl `/scrape` endpoint (JavaScript executed).
    pub struct FirecrawlRenderer {
        client: reqwest::Client,
        api_key: String,
        base_url: String,
    }

    #[derive(Serialize)]
    struct ScrapeRequest<'a> {
        url: &'a str,
        formats: [&'a str; 1],
        #[serde(rename = "onlyMainContent")]
        only_main_content: bool,
        timeout: u64,
    }

    #[derive(Deserialize)]
    struct ScrapeResponse {
        success: bool,
        data: Option<ScrapeData>,
        error: Option<String>,
    }

    #[derive(Deserialize)]
    struct ScrapeData {
        html: Option<String>,
        metadata: Option<PageMetadata>,
    }

    #[derive(Deserialize)]
    struct PageMetadata {
        title: Option<String>,
        url: Option<String>,
        #[serde(rename = "sourceURL")]
        source_url: Option<String>,
    }

    impl FirecrawlRenderer {
        pub fn new(api_key: impl Into<String>) -> ScrapeResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .map_err(|e| ScrapeError::Http(Box::new(e)))?;

            Ok(Self {
                client,
                api_key: api_key.into(),
                base_url: FIRECRAWL_API_URL.to_string(),
            })
        }

        /// Create from environment variable `FIRECRAWL_API_KEY`.
        pub fn from_env() -> ScrapeResult<Self> {
            let api_key = std::env::var("FIRECRAWL_API_KEY")
                .map_err(|_| ScrapeError::Render("FIRECRAWL_API_KEY not set".into()))?;
            Self::new(api_key)
        }

        pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
            self.base_url = url.into();
            self
        }
    }

    #[async_trait]
    impl PageRenderer for FirecrawlRenderer {
        async fn render(&self, url: &str, timeout: Duration) -> ScrapeResult<RenderedPage> {
            debug!(url = %url, "Firecrawl render starting");
            let request = ScrapeRequest {
                url,
                formats: ["html"],
                only_main_content: false,
                timeout: timeout.as_millis() as u64,
            };

            let response = self
                .client
                .post(format!("{}/scrape", self.base_url))
                .bearer_auth(&self.api_key)
                .timeout(timeout + Duration::from_secs(5))
                .json(&request)
                .send()
                .await
                .map_err(|e| ScrapeError::http(e, url))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(ScrapeError::Render(format!(
                    "Firecrawl API error: {} - {}",
                    status, text
                )));
            }

            let body: ScrapeResponse = response
                .json()
                .await
                .map_err(|e| ScrapeError::Http(Box::new(e)))?;

            if !body.success {
                return Err(ScrapeError::Render(
                    body.error.unwrap_or_else(|| "Firecrawl scrape failed".into()),
                ));
            }

            let data = body
                .data
                .ok_or_else(|| ScrapeError::Render("Firecrawl returned no data".into()))?;
            let html = data.html.unwrap_or_default();
            let metadata = data.metadata;

            let title = metadata
                .as_ref()
                .and_then(|m| m.title.clone())
                .unwrap_or_else(|| html_title(&html));
            let final_url = metadata
                .and_then(|m| m.url.or(m.source_url))
                .unwrap_or_else(|| url.to_string());

            Ok(RenderedPage {
                final_url,
                title,
                html,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_title() {
        assert_eq!(html_title("<html><head><title>  Privacy Notice </title></head></html>"), "Privacy Notice");
        assert_eq!(html_title("<html><body>no title</body></html>"), "");
    }

    #[test]
    fn test_browser_client_builds() {
        assert!(browser_client().is_ok());
    }
}
