//! Links to legal documents found on a site.

use serde::{Deserialize, Serialize};

/// A candidate policy document link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLink {
    /// Anchor text (or the probed path for brute-forced links)
    pub text: String,

    /// Absolute URL
    pub href: String,
}

impl PolicyLink {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }
}
