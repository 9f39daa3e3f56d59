//! Configuration module for the scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Configuration is resolved once at startup and passed into every component.
//!
//! # Example
//!
//! ```no_run
//! use offre_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scraper.toml")).unwrap();
//! println!("Scraping up to {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, CrawlerConfig, DelayConfig, Interval, OutputConfig, SelectorConfig,
    SiteConfig,
};
pub use validation::{validate, MAX_PARALLEL_TABS};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
