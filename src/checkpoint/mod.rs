//! Checkpoint module for persisting crawl progress
//!
//! This module owns all durable crawl state:
//! - The last fully processed results page
//! - Every detail URL already handled, in discovery order
//! - The accumulated job offer records
//! - Run start time and challenge counter
//!
//! The whole checkpoint is rewritten on every mutation so that a crash loses
//! at most the operation in flight.

mod record;
mod store;

pub use record::{Record, REMOTE_NO, REMOTE_YES, UNSPECIFIED};
pub use store::{CheckpointObserver, CheckpointStore};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while persisting the checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Durable crawl state
///
/// Serialized field names are part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Last results page whose listings were fully handed to the batcher
    pub last_page: u32,

    /// Detail URLs already handled, in discovery order, without duplicates
    pub scraped_urls: Vec<String>,

    /// Accepted records, in acceptance order
    pub job_offers: Vec<Record>,

    /// Crawl start, milliseconds since the Unix epoch
    pub start_time: i64,

    /// Number of bot challenges encountered
    pub captcha_count: u32,
}

impl Checkpoint {
    /// Creates an empty checkpoint stamped with the current time
    pub fn new() -> Self {
        Self {
            last_page: 0,
            scraped_urls: Vec::new(),
            job_offers: Vec::new(),
            start_time: chrono::Utc::now().timestamp_millis(),
            captcha_count: 0,
        }
    }

    /// Returns true if a previous run left progress behind
    pub fn has_progress(&self) -> bool {
        self.last_page > 0 || !self.job_offers.is_empty() || !self.scraped_urls.is_empty()
    }

    /// Seconds elapsed since the crawl started
    pub fn elapsed_seconds(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        ((now - self.start_time) / 1000).max(0)
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new()
    }
}
