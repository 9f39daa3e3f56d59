use serde::Deserialize;

/// Main configuration structure for the scraper
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub delays: DelayConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Target site and search parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root URL of the job board (e.g., "https://fr.indeed.com")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the search results page, appended to the base URL
    #[serde(rename = "search-path")]
    pub search_path: String,

    /// Free-text search query
    pub query: String,

    /// Location filter
    #[serde(default)]
    pub location: String,
}

/// Browser launch and wait settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Path to the Chrome/Chromium executable (auto-detected when absent)
    pub executable: Option<String>,

    /// Timeout for a detail page navigation (milliseconds)
    #[serde(rename = "navigation-timeout-ms")]
    pub navigation_timeout_ms: u64,

    /// Timeout for the detail content region to render (milliseconds)
    #[serde(rename = "content-timeout-ms")]
    pub content_timeout_ms: u64,

    /// Timeout for listing markers on a results page (milliseconds)
    #[serde(rename = "listing-timeout-ms")]
    pub listing_timeout_ms: u64,

    /// Timeout for the navigation triggered by the "next page" control (milliseconds)
    #[serde(rename = "pagination-timeout-ms")]
    pub pagination_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            executable: None,
            navigation_timeout_ms: 25_000,
            content_timeout_ms: 8_000,
            listing_timeout_ms: 15_000,
            pagination_timeout_ms: 30_000,
        }
    }
}

/// Crawl extent and concurrency
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of detail pages fetched concurrently in one batch
    #[serde(rename = "parallel-tabs")]
    pub parallel_tabs: usize,

    /// Last results page to process
    #[serde(rename = "max-pages")]
    pub max_pages: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            parallel_tabs: 2,
            max_pages: 10,
        }
    }
}

/// A closed range of milliseconds a delay is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Interval {
    pub min: u64,
    pub max: u64,
}

impl Interval {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// An interval that never waits
    pub const fn zero() -> Self {
        Self { min: 0, max: 0 }
    }
}

/// Named pacing intervals
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    /// After a detail page loads, before extraction
    #[serde(rename = "between-jobs")]
    pub between_jobs: Interval,

    /// After the "next page" navigation completes
    #[serde(rename = "between-pages")]
    pub between_pages: Interval,

    /// Cool-down once a challenge has been detected
    #[serde(rename = "after-captcha")]
    pub after_captcha: Interval,

    /// After each scroll step
    pub scroll: Interval,

    /// After a whole batch of detail pages has been joined
    #[serde(rename = "between-batches")]
    pub between_batches: Interval,

    /// Before inspecting a freshly loaded results page
    #[serde(rename = "page-settle")]
    pub page_settle: Interval,

    /// Before reading the fields of a detail page
    #[serde(rename = "detail-settle")]
    pub detail_settle: Interval,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            between_jobs: Interval::new(2_000, 3_000),
            between_pages: Interval::new(5_000, 7_000),
            after_captcha: Interval::new(10_000, 10_000),
            scroll: Interval::new(1_000, 1_300),
            between_batches: Interval::new(2_000, 3_000),
            page_settle: Interval::new(1_500, 2_000),
            detail_settle: Interval::new(800, 1_200),
        }
    }
}

impl DelayConfig {
    /// All intervals zeroed
    pub fn none() -> Self {
        Self {
            between_jobs: Interval::zero(),
            between_pages: Interval::zero(),
            after_captcha: Interval::zero(),
            scroll: Interval::zero(),
            between_batches: Interval::zero(),
            page_settle: Interval::zero(),
            detail_settle: Interval::zero(),
        }
    }

    /// Every interval with its configuration key, for validation and display
    pub fn named(&self) -> [(&'static str, Interval); 7] {
        [
            ("between-jobs", self.between_jobs),
            ("between-pages", self.between_pages),
            ("after-captcha", self.after_captcha),
            ("scroll", self.scroll),
            ("between-batches", self.between_batches),
            ("page-settle", self.page_settle),
            ("detail-settle", self.detail_settle),
        ]
    }
}

/// Output file locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the CSV file of extracted offers
    #[serde(rename = "csv-path")]
    pub csv_path: String,

    /// Path to the JSON checkpoint file
    #[serde(rename = "checkpoint-path")]
    pub checkpoint_path: String,

    /// Path to the line-oriented log file
    #[serde(rename = "log-path")]
    pub log_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: "data/offers.csv".to_string(),
            checkpoint_path: "data/.scraper_progress.json".to_string(),
            log_path: "data/scraper.log".to_string(),
        }
    }
}

/// CSS selectors for the target site's markup
///
/// List-valued entries are tried in order; the first one yielding a
/// non-empty value wins.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Links to detail pages on a results page
    #[serde(rename = "listing-link")]
    pub listing_link: String,

    /// The "next page" pagination control
    #[serde(rename = "next-page")]
    pub next_page: String,

    /// Cookie banner accept button
    #[serde(rename = "cookie-accept")]
    pub cookie_accept: String,

    /// Primary content region of a detail page
    pub description: String,

    pub title: Vec<String>,
    pub company: Vec<String>,
    pub location: Vec<String>,
    pub salary: Vec<String>,

    #[serde(rename = "published-date")]
    pub published_date: Vec<String>,

    /// Markup that indicates a bot challenge when rendered
    pub challenge: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            listing_link: ".job_seen_beacon h2 a".to_string(),
            next_page: r#"a[data-testid="pagination-page-next"]"#.to_string(),
            cookie_accept: r#"button[aria-label="Accepter les cookies"]"#.to_string(),
            description: "#jobDescriptionText".to_string(),
            title: list(&[
                ".jobsearch-JobInfoHeader-title",
                "h1",
                r#"[data-testid="jobsearch-JobInfoHeader-title"]"#,
            ]),
            company: list(&[
                ".jobsearch-CompanyInfoContainer a",
                r#"[data-testid="inlineHeader-companyName"]"#,
                "[data-company-name]",
                ".jobsearch-CompanyInfoWithoutHeaderImage a",
                r#"div[data-testid="inlineHeader-companyName"] span"#,
            ]),
            location: list(&[
                r#"[data-testid="inlineHeader-companyLocation"]"#,
                ".jobsearch-JobInfoHeader-subtitle div",
            ]),
            salary: list(&[
                ".jobsearch-JobMetadataHeader-item",
                r#"[data-testid="attribute_snippet_testid"]"#,
            ]),
            published_date: list(&[".jobsearch-JobMetadataFooter > div"]),
            challenge: list(&[
                r#"iframe[src*="recaptcha"]"#,
                r#"iframe[src*="captcha"]"#,
                r#"iframe[title*="reCAPTCHA"]"#,
                "#captcha-form",
                ".g-recaptcha",
                r#"[data-callback*="captcha"]"#,
            ]),
        }
    }
}
