use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // http(s)://host.tld with at least one dot-separated label before the TLD
    static ref SITE_URL_REGEX: Regex =
        Regex::new(r"https?://(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}").expect("valid site url pattern");
}

/// Canonical form used as the key for site status and chunk filters.
///
/// Scheme and host are lowercased, query and fragment dropped, and the path
/// always ends with `/`. Inputs without a scheme are treated as https.
pub fn normalize_site_url(input: &str) -> Result<String> {
    let input = input.trim();

    let with_protocol = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let mut parsed = url::Url::parse(&with_protocol)
        .with_context(|| format!("Invalid site URL: {}", input))?;
    if parsed.host_str().is_none() {
        anyhow::bail!("No host in site URL: {}", input);
    }

    parsed.set_query(None);
    parsed.set_fragment(None);
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed.to_string())
}

/// First `http(s)://host.tld` in a message, with a trailing `/`.
pub fn extract_site_url(text: &str) -> Option<String> {
    SITE_URL_REGEX
        .find(text)
        .map(|m| format!("{}/", m.as_str()))
}
