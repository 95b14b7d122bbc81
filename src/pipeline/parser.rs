//! Link extraction from fetched HTML
//!
//! Discovered links are handed to the next stage as found: absolute hrefs are
//! kept verbatim and only relative hrefs are resolved against the page URL.
//! Duplicates are kept so each anchor yields one task.

use scraper::{Html, Selector};
use url::Url;

/// Extracts every followable `<a href>` on the page
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document, in document order
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (`#section`)
/// - Empty hrefs and hrefs that cannot be resolved to an http(s) URL
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The page URL, used to resolve relative links
///
/// # Example
///
/// ```
/// use polite_crawl::pipeline::extract_links;
/// use url::Url;
///
/// let html = r#"<a href="/about">About</a><a href="https://other.org/x">X</a>"#;
/// let base = Url::parse("https://www.example.com/").unwrap();
/// let links = extract_links(html, &base);
/// assert_eq!(links, vec!["https://www.example.com/about", "https://other.org/x"]);
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Turns an href into the link carried on the scrape queue
///
/// Returns None if the link should be excluded.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    // Absolute links travel unchanged
    if let Ok(absolute) = Url::parse(href) {
        return is_http(&absolute).then(|| href.to_string());
    }

    base_url
        .join(href)
        .ok()
        .filter(is_http)
        .map(|resolved| resolved.to_string())
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
