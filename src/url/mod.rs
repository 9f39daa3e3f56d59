//! URL handling module
//!
//! This module builds the search URL for the configured query and decides
//! whether a navigated location still belongs to the target site.

mod domain;

use crate::config::SiteConfig;
use crate::ScrapeError;
use url::Url;

pub use domain::{extract_domain, is_same_site};

/// Builds the search results URL for the configured query and location
///
/// # Examples
///
/// ```
/// use offre_scraper::config::SiteConfig;
/// use offre_scraper::url::search_url;
///
/// let site = SiteConfig {
///     base_url: "https://fr.indeed.com".to_string(),
///     search_path: "/jobs".to_string(),
///     query: "développeur rust".to_string(),
///     location: "Paris".to_string(),
/// };
///
/// let url = search_url(&site).unwrap();
/// assert_eq!(url.path(), "/jobs");
/// assert_eq!(url.query(), Some("q=d%C3%A9veloppeur+rust&l=Paris"));
/// ```
pub fn search_url(site: &SiteConfig) -> Result<Url, ScrapeError> {
    let mut url = Url::parse(&site.base_url)?.join(&site.search_path)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("q", &site.query)
        .append_pair("l", &site.location);
    Ok(url)
}

/// Returns the lowercase host of the configured site
pub fn site_domain(site: &SiteConfig) -> Result<String, ScrapeError> {
    let url = Url::parse(&site.base_url)?;
    extract_domain(&url).ok_or(ScrapeError::UrlParse(::url::ParseError::EmptyHost))
}
