//! Scripted job board used by the integration tests
//!
//! The fake browser renders small HTML documents for a results listing and
//! its detail pages. Selector waits, visibility checks and clicks are answered
//! by running the real selector against that HTML, so the crawler sees the
//! same markup contract as on the live site.

#![allow(dead_code)]

use async_trait::async_trait;
use offre_scraper::browser::{Browser, BrowserError, BrowserResult, Navigation, Tab};
use offre_scraper::config::{
    BrowserConfig, Config, CrawlerConfig, DelayConfig, OutputConfig, SelectorConfig, SiteConfig,
};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

pub const BASE_URL: &str = "https://jobs.test";

pub fn job_url(id: u32) -> String {
    format!("{}/viewjob?jk={}", BASE_URL, id)
}

/// Test configuration: no pacing delays, short timeouts, files under `dir`
pub fn test_config(dir: &Path, parallel_tabs: usize, max_pages: u32) -> Config {
    Config {
        site: SiteConfig {
            base_url: BASE_URL.to_string(),
            search_path: "/jobs".to_string(),
            query: "rust".to_string(),
            location: "Paris".to_string(),
        },
        browser: BrowserConfig {
            headless: true,
            executable: None,
            navigation_timeout_ms: 100,
            content_timeout_ms: 10,
            listing_timeout_ms: 10,
            pagination_timeout_ms: 100,
        },
        crawler: CrawlerConfig {
            parallel_tabs,
            max_pages,
        },
        delays: DelayConfig::none(),
        output: OutputConfig {
            csv_path: dir.join("offers.csv").display().to_string(),
            checkpoint_path: dir.join("progress.json").display().to_string(),
            log_path: dir.join("scraper.log").display().to_string(),
        },
        selectors: SelectorConfig::default(),
    }
}

/// How a detail URL behaves
#[derive(Debug, Clone)]
pub enum Detail {
    /// A regular posting
    Job {
        title: String,
        company: String,
        description: String,
    },
    /// The server answers HTTP 404
    Status404,
    /// The page loads but says the posting is gone
    Gone,
    /// The page loads without a description and is not a not-found page
    Broken,
    /// Navigation fails with a timeout at once
    Timeout,
    /// Navigation hangs for the whole timeout before failing
    Hang,
    /// The server redirects to another site
    Redirect(String),
}

impl Detail {
    pub fn job(title: &str, company: &str, description: &str) -> Self {
        Self::Job {
            title: title.to_string(),
            company: company.to_string(),
            description: description.to_string(),
        }
    }
}

/// Observations shared by every tab of a site
#[derive(Debug, Default)]
pub struct Counters {
    /// Detail URLs navigated to, in order
    pub fetched: Vec<String>,

    /// Successful next-page clicks
    pub pagination_clicks: u32,

    /// Tabs currently showing a detail page
    pub open_detail_tabs: usize,

    /// Largest value `open_detail_tabs` ever reached
    pub max_open_detail_tabs: usize,

    /// Tabs opened and not yet closed
    pub open_tabs: usize,
}

/// A paginated job board
pub struct FakeSite {
    pages: Vec<Vec<String>>,
    details: HashMap<String, Detail>,
    challenge_on_page: Option<usize>,
    search_down: bool,
    cancel_on_fetch: Option<(String, CancellationToken)>,
    counters: Mutex<Counters>,
}

impl FakeSite {
    /// A site whose results page `i + 1` lists `pages[i]`
    pub fn new(pages: Vec<Vec<String>>) -> Self {
        let details = pages
            .iter()
            .flatten()
            .map(|url| {
                let detail = Detail::job(
                    &format!("Job {}", url),
                    "Acme",
                    "Poste en CDI, télétravail possible.",
                );
                (url.clone(), detail)
            })
            .collect();

        Self {
            pages,
            details,
            challenge_on_page: None,
            search_down: false,
            cancel_on_fetch: None,
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn with_detail(mut self, url: &str, detail: Detail) -> Self {
        self.details.insert(url.to_string(), detail);
        self
    }

    /// Renders a bot challenge on results page `page`
    pub fn with_challenge_on_page(mut self, page: usize) -> Self {
        self.challenge_on_page = Some(page);
        self
    }

    /// Makes the search page unreachable
    pub fn with_search_down(mut self) -> Self {
        self.search_down = true;
        self
    }

    /// Cancels `token` as soon as `url` is navigated to
    pub fn with_cancel_on_fetch(mut self, url: &str, token: CancellationToken) -> Self {
        self.cancel_on_fetch = Some((url.to_string(), token));
        self
    }

    pub fn into_browser(self) -> Arc<FakeBrowser> {
        Arc::new(FakeBrowser {
            site: Arc::new(self),
        })
    }

    pub fn fetched(&self) -> Vec<String> {
        self.counters.lock().unwrap().fetched.clone()
    }

    pub fn pagination_clicks(&self) -> u32 {
        self.counters.lock().unwrap().pagination_clicks
    }

    pub fn max_open_detail_tabs(&self) -> usize {
        self.counters.lock().unwrap().max_open_detail_tabs
    }

    pub fn open_tabs(&self) -> usize {
        self.counters.lock().unwrap().open_tabs
    }

    fn results_url(page: usize) -> String {
        format!(
            "{}/jobs?q=rust&l=Paris&start={}",
            BASE_URL,
            (page - 1) * 10
        )
    }

    fn results_html(&self, page: usize) -> String {
        if self.challenge_on_page == Some(page) {
            return r#"<html><head><title>Security check</title></head><body>
                <iframe src="https://www.google.com/recaptcha/api2/anchor"></iframe>
                <p>Please verify you are human</p>
                </body></html>"#
                .to_string();
        }

        let cards: String = self
            .pages
            .get(page - 1)
            .map(|links| {
                links
                    .iter()
                    .map(|url| {
                        format!(
                            r#"<div class="job_seen_beacon"><h2><a href="{}">Job</a></h2></div>"#,
                            url
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let next = if page < self.pages.len() {
            r##"<a data-testid="pagination-page-next" href="#">Suivant</a>"##
        } else {
            ""
        };

        format!(
            "<html><head><title>rust - Paris</title></head><body>{}{}</body></html>",
            cards, next
        )
    }

    fn detail_html(&self, url: &str) -> String {
        match self.details.get(url) {
            Some(Detail::Job {
                title,
                company,
                description,
            }) => format!(
                r#"<html><head><title>{title}</title></head><body>
                <h1 class="jobsearch-JobInfoHeader-title">{title}</h1>
                <div data-testid="inlineHeader-companyName">{company}</div>
                <div data-testid="inlineHeader-companyLocation">Paris</div>
                <div id="jobDescriptionText"><p>{description}</p></div>
                </body></html>"#
            ),
            Some(Detail::Gone) => r#"<html><head><title>Page introuvable</title></head>
                <body><p>Cette offre n'est plus disponible</p></body></html>"#
                .to_string(),
            _ => r#"<html><head><title>Offre</title></head><body><p>Chargement</p></body></html>"#
                .to_string(),
        }
    }
}

/// Browser over a [`FakeSite`]
pub struct FakeBrowser {
    pub site: Arc<FakeSite>,
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_tab(&self) -> BrowserResult<Box<dyn Tab>> {
        self.site.counters.lock().unwrap().open_tabs += 1;
        Ok(Box::new(FakeTab {
            site: Arc::clone(&self.site),
            state: Mutex::new(TabState::default()),
        }))
    }

    async fn close(&self) -> BrowserResult<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
enum Location {
    #[default]
    Blank,
    Results(usize),
    Detail(String),
    Elsewhere(String),
}

#[derive(Debug, Default)]
struct TabState {
    location: Location,
    showed_detail: bool,
}

pub struct FakeTab {
    site: Arc<FakeSite>,
    state: Mutex<TabState>,
}

impl FakeTab {
    fn location(&self) -> Location {
        self.state.lock().unwrap().location.clone()
    }

    fn html(&self) -> String {
        match self.location() {
            Location::Blank => "<html><body></body></html>".to_string(),
            Location::Results(page) => self.site.results_html(page),
            Location::Detail(url) => self.site.detail_html(&url),
            Location::Elsewhere(_) => {
                "<html><head><title>Careers</title></head><body><p>Apply</p></body></html>"
                    .to_string()
            }
        }
    }

    fn matches(&self, selector: &str) -> bool {
        let Ok(selector) = Selector::parse(selector) else {
            return false;
        };
        Html::parse_document(&self.html())
            .select(&selector)
            .next()
            .is_some()
    }

    fn show_detail(&self, url: &str) {
        let mut state = self.state.lock().unwrap();
        state.location = Location::Detail(url.to_string());
        if !state.showed_detail {
            state.showed_detail = true;
            let mut counters = self.site.counters.lock().unwrap();
            counters.open_detail_tabs += 1;
            counters.max_open_detail_tabs =
                counters.max_open_detail_tabs.max(counters.open_detail_tabs);
        }
    }
}

#[async_trait]
impl Tab for FakeTab {
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<Navigation> {
        // Let the other fetches of a batch start before this one resolves
        tokio::time::sleep(Duration::from_millis(5)).await;

        let parsed = Url::parse(url).map_err(|e| BrowserError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if parsed.path() == "/jobs" {
            if self.site.search_down {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    message: "net::ERR_CONNECTION_REFUSED".to_string(),
                });
            }
            self.state.lock().unwrap().location = Location::Results(1);
            return Ok(Navigation {
                status: Some(200),
                final_url: url.to_string(),
            });
        }

        self.site.counters.lock().unwrap().fetched.push(url.to_string());
        if let Some((trigger, token)) = &self.site.cancel_on_fetch {
            if trigger == url {
                token.cancel();
            }
        }

        match self.site.details.get(url) {
            None | Some(Detail::Status404) => {
                self.show_detail(url);
                Ok(Navigation {
                    status: Some(404),
                    final_url: url.to_string(),
                })
            }
            Some(Detail::Timeout) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
            }),
            Some(Detail::Hang) => {
                tokio::time::sleep(timeout).await;
                Err(BrowserError::NavigationTimeout {
                    url: url.to_string(),
                })
            }
            Some(Detail::Redirect(target)) => {
                self.state.lock().unwrap().location = Location::Elsewhere(target.clone());
                Ok(Navigation {
                    status: Some(200),
                    final_url: target.clone(),
                })
            }
            Some(_) => {
                self.show_detail(url);
                Ok(Navigation {
                    status: Some(200),
                    final_url: url.to_string(),
                })
            }
        }
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(match self.location() {
            Location::Blank => "about:blank".to_string(),
            Location::Results(page) => FakeSite::results_url(page),
            Location::Detail(url) | Location::Elsewhere(url) => url,
        })
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> bool {
        self.matches(selector)
    }

    async fn is_visible(&self, selector: &str) -> BrowserResult<bool> {
        Ok(self.matches(selector))
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        if self.matches(selector) {
            Ok(())
        } else {
            Err(BrowserError::ElementNotFound {
                selector: selector.to_string(),
            })
        }
    }

    async fn click_and_wait(&self, selector: &str, _timeout: Duration) -> BrowserResult<()> {
        self.click(selector).await?;

        let mut state = self.state.lock().unwrap();
        match state.location {
            Location::Results(page) => {
                state.location = Location::Results(page + 1);
                self.site.counters.lock().unwrap().pagination_clicks += 1;
                Ok(())
            }
            _ => Err(BrowserError::Navigation {
                url: "about:blank".to_string(),
                message: "no navigation".to_string(),
            }),
        }
    }

    async fn scroll_by(&self, _pixels: u32) -> BrowserResult<()> {
        Ok(())
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.html())
    }

    async fn title(&self) -> BrowserResult<String> {
        let document = Html::parse_document(&self.html());
        let title = Selector::parse("title")
            .ok()
            .and_then(|s| document.select(&s).next().map(|t| t.text().collect()))
            .unwrap_or_default();
        Ok(title)
    }

    async fn inner_text(&self) -> BrowserResult<String> {
        let document = Html::parse_document(&self.html());
        let text = Selector::parse("body")
            .ok()
            .and_then(|s| {
                document
                    .select(&s)
                    .next()
                    .map(|b| b.text().collect::<Vec<_>>().join(" "))
            })
            .unwrap_or_default();
        Ok(text)
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        // Keep the tab counted as open while its batch siblings run
        tokio::time::sleep(Duration::from_millis(5)).await;

        let state = self.state.lock().unwrap();
        let mut counters = self.site.counters.lock().unwrap();
        counters.open_tabs -= 1;
        if state.showed_detail {
            counters.open_detail_tabs -= 1;
        }
        Ok(())
    }
}
