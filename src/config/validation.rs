use crate::config::types::{
    Config, CrawlerConfig, DelayConfig, OutputConfig, SelectorConfig, SiteConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Upper bound on concurrently open detail tabs
pub const MAX_PARALLEL_TABS: usize = 16;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_delays(&config.delays)?;
    validate_output_config(&config.output)?;
    validate_selectors(&config.selectors)?;
    Ok(())
}

/// Validates the target site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    if !config.search_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "search-path must start with '/', got '{}'",
            config.search_path
        )));
    }

    if config.query.trim().is_empty() {
        return Err(ConfigError::Validation("query cannot be empty".to_string()));
    }

    Ok(())
}

/// Validates crawl extent and concurrency
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.parallel_tabs < 1 || config.parallel_tabs > MAX_PARALLEL_TABS {
        return Err(ConfigError::Validation(format!(
            "parallel-tabs must be between 1 and {}, got {}",
            MAX_PARALLEL_TABS, config.parallel_tabs
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Validates that every pacing interval is a well-formed range
fn validate_delays(config: &DelayConfig) -> Result<(), ConfigError> {
    for (name, interval) in config.named() {
        if interval.min > interval.max {
            return Err(ConfigError::Validation(format!(
                "delay '{}' has min {}ms greater than max {}ms",
                name, interval.min, interval.max
            )));
        }
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("csv-path", &config.csv_path),
        ("checkpoint-path", &config.checkpoint_path),
        ("log-path", &config.log_path),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.csv_path == config.checkpoint_path {
        return Err(ConfigError::Validation(
            "csv-path and checkpoint-path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates that every selector parses and that fallback lists are non-empty
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for selector in [
        &config.listing_link,
        &config.next_page,
        &config.cookie_accept,
        &config.description,
    ] {
        validate_selector(selector)?;
    }

    for (name, list) in [
        ("title", &config.title),
        ("company", &config.company),
        ("location", &config.location),
        ("salary", &config.salary),
        ("published-date", &config.published_date),
        ("challenge", &config.challenge),
    ] {
        if list.is_empty() {
            return Err(ConfigError::Validation(format!(
                "selector list '{}' cannot be empty",
                name
            )));
        }
        for selector in list {
            validate_selector(selector)?;
        }
    }

    Ok(())
}

/// Validates a single CSS selector
fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(
            "Selector cannot be empty".to_string(),
        ));
    }

    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}
