//! Integration tests for the crawler
//!
//! These tests drive the coordinator against a scripted job board and check
//! the full crawl cycle end-to-end: records, checkpoint file and CSV output.

mod support;

use offre_scraper::checkpoint::{Checkpoint, CheckpointStore, Record};
use offre_scraper::config::Interval;
use offre_scraper::crawler::{Coordinator, Halt, ResumeChoice, RunReport};
use offre_scraper::Config;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use support::{job_url, test_config, Detail, FakeBrowser, FakeSite};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

async fn run_crawl(config: &Config, browser: Arc<FakeBrowser>) -> (RunReport, Coordinator) {
    run_crawl_with_cancel(config, browser, CancellationToken::new()).await
}

async fn run_crawl_with_cancel(
    config: &Config,
    browser: Arc<FakeBrowser>,
    cancel: CancellationToken,
) -> (RunReport, Coordinator) {
    let mut coordinator =
        Coordinator::new(config, browser, cancel).expect("Failed to create coordinator");
    let report = coordinator.run().await;
    (report, coordinator)
}

fn read_checkpoint(config: &Config) -> Checkpoint {
    let content = std::fs::read_to_string(&config.output.checkpoint_path)
        .expect("Checkpoint file should exist");
    serde_json::from_str(&content).expect("Checkpoint should be valid JSON")
}

/// URL column of the CSV output, in file order
fn csv_url_column(config: &Config) -> Vec<String> {
    let mut reader =
        csv::Reader::from_path(&config.output.csv_path).expect("CSV output should exist");
    reader
        .records()
        .map(|row| row.expect("Valid CSV row")[8].to_string())
        .collect()
}

/// URL column of the CSV output, sorted
fn csv_urls(config: &Config) -> Vec<String> {
    sorted(csv_url_column(config))
}

/// Cancels `token` after `delay`
fn cancel_after(token: &CancellationToken, delay: Duration) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        token.cancel();
    });
}

/// Fetches within a batch complete in any order
fn sorted(mut urls: Vec<String>) -> Vec<String> {
    urls.sort();
    urls
}

fn assert_records_are_seen(checkpoint: &Checkpoint) {
    for record in &checkpoint.job_offers {
        assert!(
            checkpoint.scraped_urls.contains(&record.url),
            "record {} missing from seen URLs",
            record.url
        );
    }
}

fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(job_url).collect()
}

#[tokio::test]
async fn test_three_listings_complete_crawl() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 2, 10);
    let site = FakeSite::new(vec![ids(1..=3)]).into_browser();

    let (report, coordinator) = run_crawl(&config, Arc::clone(&site)).await;

    assert_eq!(report.halt, Some(Halt::NoNextPage));
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.statistics.offers, 3);
    assert_eq!(report.statistics.last_page, 1);
    assert!(report.checkpoint_removed);
    assert!(!Path::new(&config.output.checkpoint_path).exists());

    assert_eq!(csv_urls(&config), ids(1..=3));
    let appended: Vec<String> = coordinator
        .store()
        .checkpoint()
        .job_offers
        .iter()
        .map(|record| record.url.clone())
        .collect();
    assert_eq!(csv_url_column(&config), appended, "CSV rows follow append order");
    assert_records_are_seen(coordinator.store().checkpoint());

    let record = &coordinator.store().checkpoint().job_offers[0];
    assert_eq!(record.company, "Acme");
    assert_eq!(record.contract, "CDI");
    assert_eq!(record.remote, "yes");

    assert_eq!(site.site.open_tabs(), 0, "every tab must be closed");
}

#[tokio::test]
async fn test_batches_respect_parallel_tabs() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 2, 1);
    let site = FakeSite::new(vec![ids(1..=5)]).into_browser();

    let (report, _) = run_crawl(&config, Arc::clone(&site)).await;

    assert_eq!(report.halt, Some(Halt::MaxPages));
    assert_eq!(report.walk.fetch.batch_sizes, vec![2, 2, 1]);
    assert_eq!(report.walk.fetch.accepted, 5);
    assert!(site.site.max_open_detail_tabs() <= 2);
    assert_eq!(site.site.max_open_detail_tabs(), 2);
}

#[tokio::test]
async fn test_challenge_on_second_page_keeps_progress() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 2, 10);
    let site = FakeSite::new(vec![ids(1..=2), ids(3..=4)])
        .with_challenge_on_page(2)
        .into_browser();

    let (report, _) = run_crawl(&config, Arc::clone(&site)).await;

    assert_eq!(report.halt, Some(Halt::Challenge));
    assert_eq!(report.exit_code(), 0);
    assert!(!report.checkpoint_removed);

    let checkpoint = read_checkpoint(&config);
    assert_eq!(checkpoint.last_page, 1);
    assert_eq!(checkpoint.captcha_count, 1);
    assert_eq!(checkpoint.job_offers.len(), 2);
    assert_records_are_seen(&checkpoint);
    assert_eq!(csv_urls(&config), ids(1..=2));
}

#[tokio::test]
async fn test_resume_replays_pagination_without_refetching() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 2, 10);
    let pages = vec![ids(1..=2), ids(3..=4), vec![job_url(2), job_url(5)]];

    let first = FakeSite::new(pages.clone())
        .with_challenge_on_page(2)
        .into_browser();
    let (report, _) = run_crawl(&config, Arc::clone(&first)).await;
    assert_eq!(report.halt, Some(Halt::Challenge));
    assert_eq!(sorted(first.site.fetched()), ids(1..=2));

    let second = FakeSite::new(pages).into_browser();
    let (report, coordinator) = run_crawl(&config, Arc::clone(&second)).await;

    assert_eq!(report.halt, Some(Halt::NoNextPage));
    assert_eq!(report.walk.pages_replayed, 1);
    assert_eq!(report.walk.pages_processed, 2);
    // one replayed click, then one click from page 2 to page 3
    assert_eq!(second.site.pagination_clicks(), 2);

    assert_eq!(sorted(second.site.fetched()), ids(3..=5));

    let checkpoint = coordinator.store().checkpoint();
    assert_eq!(checkpoint.job_offers.len(), 5);
    assert_eq!(checkpoint.captcha_count, 1);
    assert_eq!(checkpoint.last_page, 3);
    assert_records_are_seen(checkpoint);
    assert_eq!(csv_urls(&config), ids(1..=5));
}

#[tokio::test]
async fn test_resume_from_prewritten_checkpoint() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 3, 3);

    {
        let mut store = CheckpointStore::load(&config.output.checkpoint_path);
        for url in ids(1..=4) {
            store.add_record(Record::unspecified(url)).unwrap();
        }
        store.set_last_page(2).unwrap();
    }

    let site = FakeSite::new(vec![ids(1..=2), ids(3..=4), ids(5..=6)]).into_browser();
    let mut coordinator =
        Coordinator::new(&config, Arc::clone(&site) as _, CancellationToken::new()).unwrap();
    assert!(coordinator.has_progress());
    coordinator
        .apply_resume_choice(ResumeChoice::Resume)
        .unwrap();

    let report = coordinator.run().await;

    assert_eq!(report.halt, Some(Halt::MaxPages));
    assert_eq!(site.site.pagination_clicks(), 2);
    assert_eq!(sorted(site.site.fetched()), ids(5..=6));
    assert_eq!(report.statistics.offers, 6);
    assert!(report.checkpoint_removed);
}

#[tokio::test]
async fn test_reset_choice_discards_progress() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 2, 1);

    {
        let mut store = CheckpointStore::load(&config.output.checkpoint_path);
        store.add_record(Record::unspecified(job_url(1))).unwrap();
        store.set_last_page(1).unwrap();
    }

    let site = FakeSite::new(vec![ids(1..=2)]).into_browser();
    let mut coordinator =
        Coordinator::new(&config, Arc::clone(&site) as _, CancellationToken::new()).unwrap();
    coordinator.apply_resume_choice(ResumeChoice::Reset).unwrap();
    assert!(!coordinator.has_progress());

    let report = coordinator.run().await;

    assert_eq!(site.site.pagination_clicks(), 0);
    assert_eq!(sorted(site.site.fetched()), ids(1..=2));
    assert_eq!(report.statistics.offers, 2);
}

#[tokio::test]
async fn test_not_found_and_failed_listings() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 2, 1);
    let site = FakeSite::new(vec![ids(1..=6)])
        .with_detail(&job_url(2), Detail::Status404)
        .with_detail(&job_url(3), Detail::Gone)
        .with_detail(&job_url(4), Detail::Broken)
        .with_detail(&job_url(5), Detail::Timeout)
        .with_detail(
            &job_url(6),
            Detail::Redirect("https://careers.acme.com/apply".to_string()),
        )
        .into_browser();

    let (report, coordinator) = run_crawl(&config, Arc::clone(&site)).await;

    assert_eq!(report.halt, Some(Halt::MaxPages));
    let fetch = &report.walk.fetch;
    assert_eq!(fetch.accepted, 1);
    assert_eq!(fetch.not_found, 2);
    assert_eq!(fetch.failed, 1);
    assert_eq!(fetch.skipped, 2);

    let store = coordinator.store();
    assert_eq!(store.record_count(), 1);
    assert!(store.is_seen(&job_url(1)));
    assert!(store.is_seen(&job_url(2)));
    assert!(store.is_seen(&job_url(3)));
    assert!(!store.is_seen(&job_url(4)));
    assert!(!store.is_seen(&job_url(5)));
    assert!(!store.is_seen(&job_url(6)));
    assert_records_are_seen(store.checkpoint());

    assert_eq!(csv_urls(&config), vec![job_url(1)]);
    assert_eq!(site.site.open_tabs(), 0);
}

#[tokio::test]
async fn test_repeated_listings_fetched_once() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 2, 10);
    let site = FakeSite::new(vec![
        vec![job_url(1), job_url(2), job_url(1)],
        vec![job_url(2), job_url(3)],
    ])
    .into_browser();

    let (report, coordinator) = run_crawl(&config, Arc::clone(&site)).await;

    assert_eq!(report.halt, Some(Halt::NoNextPage));
    assert_eq!(sorted(site.site.fetched()), ids(1..=3));
    assert_eq!(coordinator.store().record_count(), 3);
    assert_eq!(csv_urls(&config), ids(1..=3));
}

#[tokio::test]
async fn test_empty_results_page_completes() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 2, 10);
    let site = FakeSite::new(vec![Vec::new()]).into_browser();

    let (report, _) = run_crawl(&config, site).await;

    assert_eq!(report.halt, Some(Halt::NoListings));
    assert_eq!(report.statistics.offers, 0);
    assert!(report.checkpoint_removed);
    assert!(!Path::new(&config.output.csv_path).exists());
}

#[tokio::test]
async fn test_interrupt_keeps_checkpoint_and_flushes_output() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 1, 10);
    let cancel = CancellationToken::new();
    let site = FakeSite::new(vec![ids(1..=3)])
        .with_cancel_on_fetch(&job_url(2), cancel.clone())
        .into_browser();

    let (report, _) = run_crawl_with_cancel(&config, Arc::clone(&site), cancel).await;

    assert_eq!(report.halt, Some(Halt::Interrupted));
    assert_eq!(report.exit_code(), 0);
    assert!(!report.checkpoint_removed);

    let checkpoint = read_checkpoint(&config);
    assert_eq!(checkpoint.job_offers.len(), 1);
    assert_eq!(checkpoint.last_page, 0);
    assert!(!checkpoint.scraped_urls.contains(&job_url(2)));
    assert_eq!(csv_urls(&config), vec![job_url(1)]);
    assert!(!site.site.fetched().contains(&job_url(3)));
    assert_eq!(site.site.open_tabs(), 0);
}

#[tokio::test]
async fn test_unreachable_search_page_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), 2, 10);
    let site = FakeSite::new(vec![ids(1..=2)])
        .with_search_down()
        .into_browser();

    let (report, _) = run_crawl(&config, site).await;

    assert_eq!(report.halt, None);
    assert_eq!(report.exit_code(), 1);
    assert!(report.error.is_some());
    assert!(!report.checkpoint_removed);
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_cuts_hung_navigation_short() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), 1, 10);
    config.browser.navigation_timeout_ms = 25_000;
    let site = FakeSite::new(vec![ids(1..=3)])
        .with_detail(&job_url(2), Detail::Hang)
        .into_browser();

    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_secs(1));

    let start = tokio::time::Instant::now();
    let (report, _) = run_crawl_with_cancel(&config, Arc::clone(&site), cancel).await;

    assert_eq!(report.halt, Some(Halt::Interrupted));
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "shutdown waited {:?}",
        start.elapsed()
    );

    let checkpoint = read_checkpoint(&config);
    assert_eq!(checkpoint.job_offers.len(), 1);
    assert!(!checkpoint.scraped_urls.contains(&job_url(2)));
    assert!(!site.site.fetched().contains(&job_url(3)));
    assert_eq!(site.site.open_tabs(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_challenge_counted_when_cool_down_interrupted() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path(), 2, 10);
    config.delays.after_captcha = Interval::new(10_000, 10_000);
    let site = FakeSite::new(vec![ids(1..=2)])
        .with_challenge_on_page(1)
        .into_browser();

    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_secs(1));

    let start = tokio::time::Instant::now();
    let (report, _) = run_crawl_with_cancel(&config, site, cancel).await;

    assert_eq!(report.halt, Some(Halt::Challenge));
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(!report.checkpoint_removed);

    let checkpoint = read_checkpoint(&config);
    assert_eq!(checkpoint.captcha_count, 1);
    assert!(checkpoint.job_offers.is_empty());
}
