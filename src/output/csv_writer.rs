//! CSV rendering of the accepted records
//!
//! The file is regenerated from the full record set on every change. Write
//! failures never interrupt the crawl: the checkpoint stays the source of
//! truth and the next change rewrites the file anyway.

use crate::checkpoint::{CheckpointObserver, Record};
use crate::output::OutputResult;
use std::fs;
use std::path::{Path, PathBuf};

/// Column order of the CSV file
pub const CSV_COLUMNS: [&str; 9] = [
    "title",
    "company",
    "location",
    "salary",
    "contract",
    "remote",
    "publishedDate",
    "description",
    "url",
];

/// Writes records to a CSV file, overwriting it each time
#[derive(Debug, Clone)]
pub struct CsvOutput {
    path: PathBuf,
}

impl CsvOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders `records` to the destination file
    ///
    /// An empty record set leaves the file untouched.
    pub fn write(&self, records: &[Record]) -> OutputResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(CSV_COLUMNS)?;
        for record in records {
            writer.write_record([
                &record.title,
                &record.company,
                &record.location,
                &record.salary,
                &record.contract,
                &record.remote,
                &record.published_date,
                &record.description,
                &record.url,
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Renders `records`, logging and swallowing any failure
    pub fn flush(&self, records: &[Record]) {
        match self.write(records) {
            Ok(()) if records.is_empty() => {}
            Ok(()) => tracing::info!(success = true, "CSV updated: {} offers", records.len()),
            Err(e) => tracing::error!("Failed to write CSV {}: {}", self.path.display(), e),
        }
    }
}

impl CheckpointObserver for CsvOutput {
    fn on_records_changed(&self, records: &[Record]) {
        self.flush(records);
    }
}
