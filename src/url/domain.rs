use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use offre_scraper::url::extract_domain;
///
/// let url = Url::parse("https://FR.Indeed.com/viewjob?jk=1").unwrap();
/// assert_eq!(extract_domain(&url), Some("fr.indeed.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether `url` still belongs to the site rooted at `site_domain`
///
/// The host must equal the site domain or be one of its subdomains. A leading
/// `www.` on the site domain is ignored so that `www.example.com` accepts
/// `fr.example.com`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use offre_scraper::url::is_same_site;
///
/// let job = Url::parse("https://fr.indeed.com/viewjob?jk=1").unwrap();
/// assert!(is_same_site(&job, "fr.indeed.com"));
///
/// let away = Url::parse("https://careers.acme.com/apply").unwrap();
/// assert!(!is_same_site(&away, "fr.indeed.com"));
/// ```
pub fn is_same_site(url: &Url, site_domain: &str) -> bool {
    let Some(host) = extract_domain(url) else {
        return false;
    };

    let site = site_domain.to_lowercase();
    let site = site.strip_prefix("www.").unwrap_or(&site);

    host == site || host.ends_with(&format!(".{}", site))
}
