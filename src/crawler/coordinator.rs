//! Crawler coordinator - run lifecycle and shutdown policy
//!
//! The coordinator wires the checkpoint store to the CSV output, drives the
//! walker and decides what happens to the checkpoint once the walker halts:
//! - a completed crawl flushes the output and deletes the checkpoint
//! - a challenge or an interruption flushes the output and keeps it
//! - a fatal error keeps it so the next run resumes

use crate::browser::Browser;
use crate::checkpoint::CheckpointStore;
use crate::config::Config;
use crate::crawler::timing::Pacer;
use crate::crawler::walker::{Halt, WalkStats, Walker};
use crate::output::{print_challenge_instructions, print_statistics, CrawlStatistics, CsvOutput};
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What to do with the progress of a previous run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    Resume,
    Reset,
}

/// Interprets the answer to the resume prompt
///
/// `reset` (any case, surrounding whitespace ignored) discards the previous
/// progress; any other answer resumes.
pub fn resume_choice(answer: &str) -> ResumeChoice {
    if answer.trim().eq_ignore_ascii_case("reset") {
        ResumeChoice::Reset
    } else {
        ResumeChoice::Resume
    }
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Why the walker stopped; `None` after a fatal error
    pub halt: Option<Halt>,

    /// Message of the fatal error, if any
    pub error: Option<String>,

    /// Progress made during this run
    pub walk: WalkStats,

    /// Totals of the whole crawl, previous runs included
    pub statistics: CrawlStatistics,

    /// Whether the checkpoint file was deleted
    pub checkpoint_removed: bool,
}

impl RunReport {
    /// Process exit code: 1 after a fatal error, 0 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.halt.is_some() {
            0
        } else {
            1
        }
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    browser: Arc<dyn Browser>,
    store: CheckpointStore,
    walker: Walker,
    output_path: String,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Loads the checkpoint (or starts fresh) and registers the CSV output as
    /// an observer of the record set.
    pub fn new(
        config: &Config,
        browser: Arc<dyn Browser>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let pacer = Pacer::new(config.delays.clone(), cancel);
        let walker = Walker::new(config, pacer)?;

        let output_path = config.output.csv_path.clone();
        let store = CheckpointStore::load(&config.output.checkpoint_path)
            .with_observer(Box::new(CsvOutput::new(&output_path)));

        Ok(Self {
            browser,
            store,
            walker,
            output_path,
        })
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Returns true if a previous run left records or page progress behind
    pub fn has_progress(&self) -> bool {
        self.store.checkpoint().has_progress()
    }

    /// Applies the answer to the resume prompt
    pub fn apply_resume_choice(&mut self, choice: ResumeChoice) -> Result<()> {
        match choice {
            ResumeChoice::Reset => {
                self.store.reset()?;
                tracing::info!("Progress reset");
            }
            ResumeChoice::Resume => {
                let checkpoint = self.store.checkpoint();
                tracing::info!(
                    "Resuming: {} offers, last page {}",
                    checkpoint.job_offers.len(),
                    checkpoint.last_page
                );
            }
        }
        Ok(())
    }

    /// Runs the crawl to a halt and applies the shutdown policy
    pub async fn run(&mut self) -> RunReport {
        tracing::info!("Search: {}", self.walker.search_url());

        let result = self.walker.walk(self.browser.as_ref(), &mut self.store).await;

        if let Err(e) = self.browser.close().await {
            tracing::debug!("Failed to close browser: {}", e);
        }

        let (halt, error, walk) = match result {
            Ok(walk) => (Some(walk.halt), None, walk.stats),
            Err(e) => (None, Some(e.to_string()), WalkStats::default()),
        };

        let mut checkpoint_removed = false;

        match halt {
            Some(halt) if halt.is_complete() => {
                self.store.notify();
                tracing::info!(success = true, "Scraping complete ({})", halt);
                match self.store.complete() {
                    Ok(()) => checkpoint_removed = true,
                    Err(e) => tracing::error!("Failed to remove checkpoint: {}", e),
                }
            }
            Some(Halt::Challenge) => {
                self.store.notify();
                tracing::error!("Stopped by a bot challenge, progress kept");
            }
            Some(_) => {
                self.store.notify();
                tracing::info!("Interrupted, progress kept");
            }
            None => {
                tracing::error!("Fatal error: {}", error.as_deref().unwrap_or_default());
                println!(
                    "\n{} offers saved in {}. Run again to resume.",
                    self.store.record_count(),
                    self.output_path
                );
            }
        }

        let statistics =
            CrawlStatistics::from_checkpoint(self.store.checkpoint(), &self.output_path);
        print_statistics(&statistics);
        if halt == Some(Halt::Challenge) {
            print_challenge_instructions();
        }

        RunReport {
            halt,
            error,
            walk,
            statistics,
            checkpoint_removed,
        }
    }
}
