//! Detail link collection from a results page
//!
//! # Link Extraction Rules
//!
//! **Include:**
//! - `href` of every element matching the listing-link selector, resolved
//!   against the page URL
//!
//! **Exclude:**
//! - `javascript:`, `mailto:`, `tel:` links
//! - Data URIs and fragment-only links
//! - Anything that is not HTTP(S) after resolution
//! - Repeats of a link already collected from the same page

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Collects the detail links of a results page in document order
///
/// # Example
///
/// ```
/// use offre_scraper::crawler::collect_listing_links;
/// use url::Url;
///
/// let html = r#"<div class="job_seen_beacon"><h2><a href="/viewjob?jk=1">Dev</a></h2></div>"#;
/// let page = Url::parse("https://fr.indeed.com/jobs?q=rust").unwrap();
/// let links = collect_listing_links(html, ".job_seen_beacon h2 a", &page);
/// assert_eq!(links, vec!["https://fr.indeed.com/viewjob?jk=1"]);
/// ```
pub fn collect_listing_links(html: &str, selector: &str, page_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        tracing::warn!("Invalid listing selector: {}", selector);
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, page_url))
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    matches!(absolute_url.scheme(), "http" | "https").then(|| absolute_url.to_string())
}
