//! Results page traversal
//!
//! The walker owns the main tab. It opens the search results, replays the
//! pagination of a resumed run, then processes one results page at a time
//! until a halt condition is met.

use crate::browser::{Browser, Tab};
use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::crawler::batcher::{BatchReport, Batcher};
use crate::crawler::challenge::ChallengeDetector;
use crate::crawler::extractor::Extractor;
use crate::crawler::links::collect_listing_links;
use crate::crawler::timing::{human_scroll, Pacer};
use crate::url::{search_url, site_domain};
use crate::{Result, ScrapeError};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// How long the cookie banner may take to show up
const COOKIE_BANNER_TIMEOUT: Duration = Duration::from_secs(5);

/// Why the traversal stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The configured last page was processed
    MaxPages,

    /// The results ran out or the next-page control failed
    NoNextPage,

    /// A results page showed no listings
    NoListings,

    /// A bot challenge was detected
    Challenge,

    /// The run was cancelled
    Interrupted,
}

impl Halt {
    /// Returns true if the crawl reached its natural end
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::MaxPages | Self::NoNextPage | Self::NoListings)
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::MaxPages => "last configured page reached",
            Self::NoNextPage => "no next page",
            Self::NoListings => "no listings on page",
            Self::Challenge => "bot challenge detected",
            Self::Interrupted => "interrupted",
        };
        f.write_str(reason)
    }
}

/// Progress of one traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Pagination actions performed to get back to a resumed position
    pub pages_replayed: u32,

    /// Results pages fully processed during this run
    pub pages_processed: u32,

    /// Combined detail fetch counters
    pub fetch: BatchReport,
}

impl WalkStats {
    fn absorb(&mut self, report: BatchReport) {
        self.fetch.batch_sizes.extend(report.batch_sizes);
        self.fetch.accepted += report.accepted;
        self.fetch.not_found += report.not_found;
        self.fetch.skipped += report.skipped;
        self.fetch.failed += report.failed;
    }
}

/// Outcome of [`Walker::walk`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub halt: Halt,
    pub stats: WalkStats,
}

/// Paginated traversal of the search results
#[derive(Debug, Clone)]
pub struct Walker {
    search_url: Url,
    listing_selector: String,
    next_page_selector: String,
    cookie_selector: String,
    navigation_timeout: Duration,
    listing_timeout: Duration,
    pagination_timeout: Duration,
    max_pages: u32,
    pacer: Pacer,
    detector: ChallengeDetector,
    batcher: Batcher,
}

impl Walker {
    pub fn new(config: &Config, pacer: Pacer) -> Result<Self> {
        let browser = &config.browser;
        let selectors = &config.selectors;

        let extractor = Extractor::new(
            selectors,
            Duration::from_millis(browser.content_timeout_ms),
        );
        let batcher = Batcher::new(
            extractor,
            pacer.clone(),
            site_domain(&config.site)?,
            config.crawler.parallel_tabs,
            Duration::from_millis(browser.navigation_timeout_ms),
        );

        Ok(Self {
            search_url: search_url(&config.site)?,
            listing_selector: selectors.listing_link.clone(),
            next_page_selector: selectors.next_page.clone(),
            cookie_selector: selectors.cookie_accept.clone(),
            navigation_timeout: Duration::from_millis(browser.navigation_timeout_ms),
            listing_timeout: Duration::from_millis(browser.listing_timeout_ms),
            pagination_timeout: Duration::from_millis(browser.pagination_timeout_ms),
            max_pages: config.crawler.max_pages,
            detector: ChallengeDetector::new(&selectors.challenge),
            pacer,
            batcher,
        })
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    /// Traverses the results pages, feeding every detail record into `store`
    ///
    /// Every halt condition, cancellation included, is an `Ok` outcome. An
    /// error means the crawl could not go on at all.
    pub async fn walk(&self, browser: &dyn Browser, store: &mut CheckpointStore) -> Result<Walk> {
        let tab = browser.new_tab().await?;
        let mut stats = WalkStats::default();

        let result = self.traverse(browser, tab.as_ref(), store, &mut stats).await;

        if let Err(e) = tab.close().await {
            debug!("Failed to close main tab: {}", e);
        }

        let halt = match result {
            Ok(halt) => halt,
            Err(ScrapeError::Interrupted) => Halt::Interrupted,
            Err(e) => return Err(e),
        };

        info!(
            "Crawl halted ({}): {} pages processed, {} offers saved",
            halt, stats.pages_processed, stats.fetch.accepted
        );

        Ok(Walk { halt, stats })
    }

    async fn traverse(
        &self,
        browser: &dyn Browser,
        tab: &dyn Tab,
        store: &mut CheckpointStore,
        stats: &mut WalkStats,
    ) -> Result<Halt> {
        info!("Opening search results: {}", self.search_url);
        self.pacer
            .interruptible(tab.goto(self.search_url.as_str(), self.navigation_timeout))
            .await??;
        self.pacer.pause(self.pacer.delays().page_settle).await?;

        self.accept_cookies(tab).await?;

        if self.detector.detect(tab).await {
            return self.on_challenge(store).await;
        }

        let mut page = 1;

        let resume_from = store.checkpoint().last_page;
        if resume_from > 0 {
            info!("Resuming after page {}", resume_from);
            for _ in 0..resume_from {
                if !self.next_page(tab).await? {
                    warn!("Could not replay pagination past page {}", page);
                    break;
                }
                page += 1;
                stats.pages_replayed += 1;
            }
        }

        loop {
            if page > self.max_pages {
                return Ok(Halt::MaxPages);
            }

            info!("Page {}/{}", page, self.max_pages);

            human_scroll(tab, &self.pacer).await?;
            self.pacer.pause(self.pacer.delays().page_settle).await?;

            if self.detector.detect(tab).await {
                return self.on_challenge(store).await;
            }

            let links = match self.listing_links(tab).await? {
                Some(links) => links,
                None => {
                    warn!("No listings found on page {}", page);
                    return Ok(Halt::NoListings);
                }
            };

            info!("{} offers listed on page {}", links.len(), page);

            let report = self.batcher.run(browser, store, &links).await?;
            stats.absorb(report);

            store.set_last_page(page)?;
            stats.pages_processed += 1;

            if page >= self.max_pages {
                return Ok(Halt::MaxPages);
            }

            if !self.next_page(tab).await? {
                info!("No next page after page {}", page);
                return Ok(Halt::NoNextPage);
            }
            page += 1;
        }
    }

    /// Waits for the listing markers and collects the detail links
    async fn listing_links(&self, tab: &dyn Tab) -> Result<Option<Vec<String>>> {
        let listed = self
            .pacer
            .interruptible(tab.wait_for_selector(&self.listing_selector, self.listing_timeout))
            .await?;
        if !listed {
            return Ok(None);
        }

        let html = match tab.content().await {
            Ok(html) => html,
            Err(e) => {
                error!("Could not read results page: {}", e);
                return Ok(None);
            }
        };

        let page_url = tab
            .current_url()
            .await
            .ok()
            .and_then(|location| Url::parse(&location).ok())
            .unwrap_or_else(|| self.search_url.clone());

        Ok(Some(collect_listing_links(
            &html,
            &self.listing_selector,
            &page_url,
        )))
    }

    /// The one place the challenge counter is incremented, then the cool-down
    ///
    /// The count is persisted before the cool-down, and cancelling the
    /// cool-down still halts with [`Halt::Challenge`].
    async fn on_challenge(&self, store: &mut CheckpointStore) -> Result<Halt> {
        error!("Bot challenge detected, stopping");
        store.increment_challenge_count()?;
        if self.pacer.pause(self.pacer.delays().after_captcha).await.is_err() {
            debug!("Challenge cool-down cut short");
        }
        Ok(Halt::Challenge)
    }

    async fn accept_cookies(&self, tab: &dyn Tab) -> Result<()> {
        let banner = self
            .pacer
            .interruptible(tab.wait_for_selector(&self.cookie_selector, COOKIE_BANNER_TIMEOUT))
            .await?;
        if !banner {
            debug!("No cookie banner");
            return Ok(());
        }

        self.pacer.pause(self.pacer.delays().detail_settle).await?;
        match tab.click(&self.cookie_selector).await {
            Ok(()) => debug!("Cookie banner accepted"),
            Err(e) => debug!("Could not accept cookies: {}", e),
        }
        self.pacer.pause(self.pacer.delays().page_settle).await
    }

    /// Follows the next-page control; false if there is none or it failed
    async fn next_page(&self, tab: &dyn Tab) -> Result<bool> {
        if !tab
            .wait_for_selector(&self.next_page_selector, Duration::ZERO)
            .await
        {
            return Ok(false);
        }

        human_scroll(tab, &self.pacer).await?;
        self.pacer.pause(self.pacer.delays().page_settle).await?;

        let navigation = self
            .pacer
            .interruptible(tab.click_and_wait(&self.next_page_selector, self.pagination_timeout))
            .await?;
        if let Err(e) = navigation {
            error!("Next page navigation failed: {}", e);
            return Ok(false);
        }

        self.pacer.pause(self.pacer.delays().between_pages).await?;
        Ok(true)
    }
}
