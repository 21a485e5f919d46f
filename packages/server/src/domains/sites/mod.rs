//! Sites domain - which websites have been indexed, and with what outcome.

pub mod cache;
pub mod models;
pub mod registry;
pub mod url;

pub use cache::SiteStatusCache;
pub use models::SiteStatus;
pub use registry::{MemorySiteRegistry, PostgresSiteRegistry, SiteRegistry};
pub use url::{extract_site_url, normalize_site_url};
