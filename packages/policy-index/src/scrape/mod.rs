//! Discovering and fetching a site's legal documents.
//!
//! The flow for one site:
//!
//! 1. Render the landing page ([`PageRenderer`]) and bail out on bot walls
//!    ([`detect_bot_verification`]).
//! 2. Collect links that look like policy documents ([`policy_links`]), falling back
//!    to probing well-known paths.
//! 3. Fetch each document and keep its main text ([`extract_main_text`]).

pub mod bot;
pub mod links;
pub mod renderer;
pub mod scraper;
pub mod text;

pub use bot::{detect_bot_verification, BotProbe};
pub use links::{brute_force_candidates, policy_links, BRUTE_FORCE_PATHS, POLICY_KEYWORDS};
pub use renderer::{HttpRenderer, PageRenderer, RenderedPage};
pub use scraper::{Discovery, PolicyScraper, ScraperConfig, SiteScrape};
pub use text::extract_main_text;

#[cfg(feature = "firecrawl")]
pub use renderer::FirecrawlRenderer;
