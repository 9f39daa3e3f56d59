//! Bounded-concurrency fetch of detail pages
//!
//! Unseen URLs are split into batches of `parallel-tabs`. The fetches of one
//! batch run concurrently, each in its own tab, and their outcomes are applied
//! to the checkpoint store in arrival order. The next batch starts only after
//! the whole batch has finished.

use crate::browser::{Browser, Tab};
use crate::checkpoint::{CheckpointStore, Record};
use crate::crawler::extractor::{Extraction, Extractor};
use crate::crawler::timing::Pacer;
use crate::url::is_same_site;
use crate::{Result, ScrapeError};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// Counters for one call to [`Batcher::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Size of each dispatched batch, in order
    pub batch_sizes: Vec<usize>,

    /// Records accepted into the checkpoint
    pub accepted: usize,

    /// Listings that no longer exist; marked seen
    pub not_found: usize,

    /// Navigation timeouts and off-site redirects; left unseen
    pub skipped: usize,

    /// Extraction and browser failures; left unseen
    pub failed: usize,
}

impl BatchReport {
    pub fn fetched(&self) -> usize {
        self.batch_sizes.iter().sum()
    }
}

/// Result of fetching one detail URL
#[derive(Debug)]
enum FetchOutcome {
    Record(Record),
    NotFound,
    Skipped,
    Failed,
    Interrupted,
}

/// Fetches detail pages in batches of a fixed width
#[derive(Debug, Clone)]
pub struct Batcher {
    extractor: Extractor,
    pacer: Pacer,
    site_domain: String,
    width: usize,
    navigation_timeout: Duration,
}

impl Batcher {
    pub fn new(
        extractor: Extractor,
        pacer: Pacer,
        site_domain: impl Into<String>,
        width: usize,
        navigation_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            pacer,
            site_domain: site_domain.into(),
            width: width.max(1),
            navigation_timeout,
        }
    }

    /// Fetches every unseen URL of `urls` and feeds the results into `store`
    ///
    /// A batch in flight is always drained before an error is returned, so no
    /// tab is left open and no finished record is lost.
    pub async fn run(
        &self,
        browser: &dyn Browser,
        store: &mut CheckpointStore,
        urls: &[String],
    ) -> Result<BatchReport> {
        let pending = pending_urls(store, urls);
        let mut report = BatchReport::default();

        if pending.is_empty() {
            info!("No new offers on this page");
            return Ok(report);
        }

        let batch_count = pending.len().div_ceil(self.width);
        info!("{} new offers to fetch in {} batches", pending.len(), batch_count);

        for (index, batch) in pending.chunks(self.width).enumerate() {
            self.pacer.checkpoint()?;
            debug!("Batch {}/{}: {} offers", index + 1, batch_count, batch.len());
            report.batch_sizes.push(batch.len());

            let mut in_flight: FuturesUnordered<_> = batch
                .iter()
                .map(|url| async move { (url, self.fetch(browser, url).await) })
                .collect();

            let mut failure: Option<ScrapeError> = None;

            while let Some((url, outcome)) = in_flight.next().await {
                if let Err(e) = apply(store, &mut report, url, outcome) {
                    failure.get_or_insert(e);
                }
            }

            if let Some(e) = failure {
                return Err(e);
            }

            self.pacer.pause(self.pacer.delays().between_batches).await?;
        }

        Ok(report)
    }

    /// Fetches one URL in a fresh tab, closing the tab on every path
    async fn fetch(&self, browser: &dyn Browser, url: &str) -> FetchOutcome {
        let tab = match browser.new_tab().await {
            Ok(tab) => tab,
            Err(e) => {
                error!("Could not open a tab for {}: {}", url, e);
                return FetchOutcome::Failed;
            }
        };

        let outcome = self.visit(tab.as_ref(), url).await;

        if let Err(e) = tab.close().await {
            debug!("Failed to close tab for {}: {}", url, e);
        }

        outcome
    }

    async fn visit(&self, tab: &dyn Tab, url: &str) -> FetchOutcome {
        let navigation = match self
            .pacer
            .interruptible(tab.goto(url, self.navigation_timeout))
            .await
        {
            Err(_) => return FetchOutcome::Interrupted,
            Ok(Ok(navigation)) => navigation,
            Ok(Err(e)) if e.is_timeout() => {
                info!("Navigation timeout, skipping {}", url);
                return FetchOutcome::Skipped;
            }
            Ok(Err(e)) => {
                error!("Navigation failed for {}: {}", url, e);
                return FetchOutcome::Failed;
            }
        };

        if navigation.is_not_found() {
            info!("Page not found, skipping {}", url);
            return FetchOutcome::NotFound;
        }

        if self
            .pacer
            .pause(self.pacer.delays().between_jobs)
            .await
            .is_err()
        {
            return FetchOutcome::Interrupted;
        }

        if !self.is_on_site(&navigation.final_url) {
            info!(
                "Redirected away from the site ({}), skipping {}",
                navigation.final_url, url
            );
            return FetchOutcome::Skipped;
        }

        match self.extractor.extract(tab, url, &self.pacer).await {
            Ok(Extraction::Record(record)) => FetchOutcome::Record(record),
            Ok(Extraction::Skipped) => {
                info!("Offer no longer available, skipping {}", url);
                FetchOutcome::NotFound
            }
            Ok(Extraction::Failed { reason }) => {
                error!("Extraction failed for {}: {}", url, reason);
                FetchOutcome::Failed
            }
            Err(_) => FetchOutcome::Interrupted,
        }
    }

    fn is_on_site(&self, location: &str) -> bool {
        Url::parse(location)
            .map(|url| is_same_site(&url, &self.site_domain))
            .unwrap_or(false)
    }
}

/// Applies one fetch outcome to the store
fn apply(
    store: &mut CheckpointStore,
    report: &mut BatchReport,
    url: &str,
    outcome: FetchOutcome,
) -> Result<()> {
    match outcome {
        FetchOutcome::Record(record) => {
            let label = format!("{} - {}", record.title, record.company);
            if store.add_record(record)? {
                report.accepted += 1;
                info!(success = true, "Offer saved: {}", label);
            }
        }
        FetchOutcome::NotFound => {
            store.mark_seen(url)?;
            report.not_found += 1;
        }
        FetchOutcome::Skipped => report.skipped += 1,
        FetchOutcome::Failed => report.failed += 1,
        FetchOutcome::Interrupted => return Err(ScrapeError::Interrupted),
    }
    Ok(())
}

/// URLs of `urls` not yet seen, without repeats, in input order
pub fn pending_urls(store: &CheckpointStore, urls: &[String]) -> Vec<String> {
    let mut queued = HashSet::new();
    urls.iter()
        .filter(|url| !store.is_seen(url))
        .filter(|url| queued.insert(url.as_str()))
        .cloned()
        .collect()
}
