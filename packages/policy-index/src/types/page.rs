//! Fetched policy pages.

use serde::{Deserialize, Serialize};

/// Main text extracted from one policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPage {
    /// Page URL (becomes the chunk `source`)
    pub url: String,

    /// Extracted text, empty when the fetch failed
    pub content: String,
}

impl PolicyPage {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
        }
    }

    /// Whether any text was extracted.
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}
