//! Finding links to legal documents.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::types::PolicyLink;

/// Substrings (matched against lowercased href and anchor text) that mark a policy link.
pub const POLICY_KEYWORDS: &[&str] = &[
    "privacy",
    "terms",
    "cookie",
    "policy",
    "legal",
    "gdpr",
    "data",
    "notice",
    "agreement",
];

/// Well-known locations probed when a landing page links to no policy at all.
pub const BRUTE_FORCE_PATHS: &[&str] = &[
    "privacy",
    "privacy-policy",
    "legal/privacy",
    "terms",
    "terms-of-service",
    "cookie-policy",
    "policies",
    "legal",
    "legal/terms",
    "privacy.html",
    "terms.html",
];

/// All anchors on the page that look like policy documents.
///
/// Hrefs are resolved against `base_url`; the first occurrence of a URL wins.
pub fn policy_links(base_url: &Url, html: &str) -> Vec<PolicyLink> {
    let document = Html::parse_document(html);
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let text = anchor.text().collect::<String>().trim().to_string();

        let href_lower = href.to_lowercase();
        let text_lower = text.to_lowercase();
        let relevant = POLICY_KEYWORDS
            .iter()
            .any(|kw| href_lower.contains(kw) || text_lower.contains(kw));
        if !relevant {
            continue;
        }

        let Ok(resolved) = base_url.join(href) else {
            continue;
        };
        let resolved = resolved.to_string();
        if seen.insert(resolved.clone()) {
            links.push(PolicyLink::new(text, resolved));
        }
    }

    links
}

/// Brute-force candidates: each well-known path joined to the base URL.
pub fn brute_force_candidates(base_url: &Url) -> Vec<PolicyLink> {
    BRUTE_FORCE_PATHS
        .iter()
        .filter_map(|path| {
            base_url
                .join(path)
                .ok()
                .map(|url| PolicyLink::new(*path, url.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://shop.example.com/").unwrap()
    }

    #[test]
    fn test_finds_links_by_href_or_text() {
        let html = r#"
            <html><body>
              <a href="/about">About us</a>
              <a href="/legal/privacy">Privacy Policy</a>
              <a href="https://cdn.example.com/tos.pdf">Terms of Use</a>
              <a href="/help">Help</a>
            </body></html>
        "#;
        let links = policy_links(&base(), html);

        assert_eq!(
            links,
            vec![
                PolicyLink::new("Privacy Policy", "https://shop.example.com/legal/privacy"),
                PolicyLink::new("Terms of Use", "https://cdn.example.com/tos.pdf"),
            ]
        );
    }

    #[test]
    fn test_deduplicates_resolved_urls() {
        let html = r#"
            <a href="/privacy">Privacy</a>
            <a href="https://shop.example.com/privacy">Your privacy choices</a>
        "#;
        let links = policy_links(&base(), html);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "Privacy");
    }

    #[test]
    fn test_no_anchors() {
        assert!(policy_links(&base(), "<p>nothing here</p>").is_empty());
    }

    #[test]
    fn test_brute_force_candidates() {
        let candidates = brute_force_candidates(&base());
        assert_eq!(candidates.len(), BRUTE_FORCE_PATHS.len());
        assert_eq!(candidates[0], PolicyLink::new("privacy", "https://shop.example.com/privacy"));
        assert_eq!(
            candidates[2],
            PolicyLink::new("legal/privacy", "https://shop.example.com/legal/privacy")
        );
    }
}
