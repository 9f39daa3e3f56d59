//! Output module for exporting scraped offers
//!
//! This module handles:
//! - Rendering the accepted records to a CSV file after every change
//! - Summarizing run statistics for the console

mod csv_writer;
pub mod stats;

pub use csv_writer::{CsvOutput, CSV_COLUMNS};
pub use stats::{print_challenge_instructions, print_statistics, CrawlStatistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
