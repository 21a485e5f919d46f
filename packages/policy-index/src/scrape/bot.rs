//! Bot-verification (CAPTCHA, challenge page) detection.

use scraper::{Html, Selector};

const TITLE_KEYWORDS: &[&str] = &[
    "verify",
    "captcha",
    "robot",
    "human",
    "security check",
    "access denied",
    "blocked",
    "cloudflare",
    "just a moment",
    "checking your browser",
    "ddos protection",
    "rate limit",
];

const CHALLENGE_SELECTORS: &[&str] = &[
    // Cloudflare
    ".cf-browser-verification",
    "#cf-wrapper",
    ".cf-checking-browser",
    // CAPTCHA widgets
    "[data-callback*='captcha']",
    ".g-recaptcha",
    ".h-captcha",
    ".captcha",
    // Access denied / rate limiting
    ".access-denied",
    ".blocked",
    ".rate-limit",
    ".too-many-requests",
    ".security-check",
    ".verification-required",
];

const BODY_PHRASES: &[&str] = &[
    "verify you are human",
    "complete the captcha",
    "security check",
    "checking your browser",
    "just a moment",
    "ddos protection",
    "cloudflare",
    "access denied",
    "rate limited",
    "too many requests",
    "suspicious activity",
];

const URL_FRAGMENTS: &[&str] = &[
    "captcha",
    "verify",
    "security",
    "blocked",
    "denied",
    "cloudflare",
    "ddos",
    "rate-limit",
];

/// What a rendered landing page looks like to the detector.
#[derive(Debug, Clone, Copy)]
pub struct BotProbe<'a> {
    pub title: &'a str,
    pub html: &'a str,
    /// URL after redirects
    pub url: &'a str,
}

/// Whether the page is a bot-verification wall rather than the site itself.
///
/// Checks, in order: the title, challenge widgets in the markup, challenge
/// phrases in the HTML, and the final URL. All matching is case-insensitive.
pub fn detect_bot_verification(probe: BotProbe<'_>) -> bool {
    let title = probe.title.to_lowercase();
    if let Some(keyword) = TITLE_KEYWORDS.iter().find(|k| title.contains(*k)) {
        tracing::info!(title = %probe.title, keyword = keyword, "Bot verification detected in title");
        return true;
    }

    let document = Html::parse_document(probe.html);
    for raw in CHALLENGE_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if document.select(&selector).next().is_some() {
            tracing::info!(selector = raw, "Bot verification detected by selector");
            return true;
        }
    }

    let html = probe.html.to_lowercase();
    if let Some(phrase) = BODY_PHRASES.iter().find(|p| html.contains(*p)) {
        tracing::info!(phrase = phrase, "Bot verification detected in page text");
        return true;
    }

    let url = probe.url.to_lowercase();
    if let Some(fragment) = URL_FRAGMENTS.iter().find(|f| url.contains(*f)) {
        tracing::info!(url = %probe.url, fragment = fragment, "Bot verification detected in URL");
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe<'a>(title: &'a str, html: &'a str, url: &'a str) -> BotProbe<'a> {
        BotProbe { title, html, url }
    }

    const CLEAN_HTML: &str = "<html><body><footer><a href='/privacy'>Privacy</a></footer></body></html>";

    #[test]
    fn test_clean_page() {
        assert!(!detect_bot_verification(probe("Example Store", CLEAN_HTML, "https://example.com/")));
    }

    #[test]
    fn test_title_keyword() {
        assert!(detect_bot_verification(probe("Just a moment...", CLEAN_HTML, "https://example.com/")));
        assert!(detect_bot_verification(probe("Access DENIED", CLEAN_HTML, "https://example.com/")));
    }

    #[test]
    fn test_challenge_selector() {
        let html = "<html><body><div class='g-recaptcha' data-sitekey='x'></div></body></html>";
        assert!(detect_bot_verification(probe("Example", html, "https://example.com/")));

        let html = "<html><body><div data-callback='on_captcha_done'></div></body></html>";
        assert!(detect_bot_verification(probe("Example", html, "https://example.com/")));
    }

    #[test]
    fn test_body_phrase() {
        let html = "<html><body><p>Please Verify You Are Human to continue</p></body></html>";
        assert!(detect_bot_verification(probe("Example", html, "https://example.com/")));
    }

    #[test]
    fn test_redirect_url() {
        assert!(detect_bot_verification(probe(
            "Example",
            CLEAN_HTML,
            "https://example.com/cdn-cgi/challenge?captcha=1"
        )));
    }
}
