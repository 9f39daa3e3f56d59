//! Run statistics
//!
//! Every halt path prints these so the user knows how far the crawl got and
//! where the results are.

use crate::checkpoint::Checkpoint;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Number of accepted offers
    pub offers: usize,

    /// Number of detail URLs handled, with or without a record
    pub urls_seen: usize,

    /// Last fully processed results page
    pub last_page: u32,

    /// Bot challenges encountered so far
    pub captcha_count: u32,

    /// Seconds since the crawl started
    pub elapsed_seconds: i64,

    /// Where the CSV output lives
    pub output_path: String,
}

impl CrawlStatistics {
    /// Builds statistics from the current checkpoint
    pub fn from_checkpoint(checkpoint: &Checkpoint, output_path: &str) -> Self {
        Self {
            offers: checkpoint.job_offers.len(),
            urls_seen: checkpoint.scraped_urls.len(),
            last_page: checkpoint.last_page,
            captcha_count: checkpoint.captcha_count,
            elapsed_seconds: checkpoint.elapsed_seconds(),
            output_path: output_path.to_string(),
        }
    }

    /// Share of handled URLs that produced a record, as a percentage
    pub fn yield_rate(&self) -> f64 {
        if self.urls_seen == 0 {
            return 0.0;
        }
        (self.offers as f64 / self.urls_seen as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("{}", "━".repeat(50));
    println!("Statistics:");
    println!("  Offers scraped: {}", stats.offers);
    println!(
        "  URLs handled: {} ({:.1}% yielded an offer)",
        stats.urls_seen,
        stats.yield_rate()
    );
    println!("  Last page: {}", stats.last_page);
    println!("  Challenges encountered: {}", stats.captcha_count);
    println!("  Elapsed: {}s", stats.elapsed_seconds);
    println!("  File: {}", stats.output_path);
    println!("{}", "━".repeat(50));
}

/// Prints what to do after a bot challenge stopped the crawl
pub fn print_challenge_instructions() {
    println!("\nNext steps:");
    println!("  1. Solve the challenge in the browser window");
    println!("  2. Wait 2-3 minutes");
    println!("  3. Run the scraper again");
    println!("  4. It resumes from the last completed page\n");
}
