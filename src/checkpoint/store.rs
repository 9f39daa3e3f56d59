//! JSON checkpoint store
//!
//! The store is the exclusive owner of the checkpoint file. Every mutation
//! rewrites the whole document through a temporary file and a rename, so the
//! file on disk is always either the previous or the new snapshot.

use crate::checkpoint::{Checkpoint, CheckpointError, CheckpointResult, Record};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Subscriber notified whenever the accepted record set changes
pub trait CheckpointObserver: Send {
    /// Called with the full, current record set
    fn on_records_changed(&self, records: &[Record]);
}

/// Durable key-value record of crawl progress
pub struct CheckpointStore {
    path: PathBuf,
    data: Checkpoint,
    seen: HashSet<String>,
    observers: Vec<Box<dyn CheckpointObserver>>,
}

impl CheckpointStore {
    /// Loads the checkpoint at `path`
    ///
    /// A missing file yields an empty checkpoint. So does an unreadable or
    /// corrupt one: that is logged and the crawl starts fresh.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let data = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Checkpoint>(&content) {
                Ok(checkpoint) => {
                    tracing::info!(
                        "Loaded checkpoint: page {}, {} offers, {} URLs seen",
                        checkpoint.last_page,
                        checkpoint.job_offers.len(),
                        checkpoint.scraped_urls.len()
                    );
                    checkpoint
                }
                Err(e) => {
                    tracing::error!(
                        "Checkpoint {} is unreadable ({}), starting fresh",
                        path.display(),
                        e
                    );
                    Checkpoint::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No checkpoint at {}, starting fresh", path.display());
                Checkpoint::new()
            }
            Err(e) => {
                tracing::error!(
                    "Failed to read checkpoint {} ({}), starting fresh",
                    path.display(),
                    e
                );
                Checkpoint::new()
            }
        };

        let (data, seen) = repair(data);

        Self {
            path,
            data,
            seen,
            observers: Vec::new(),
        }
    }

    /// Registers an observer of record changes
    pub fn add_observer(&mut self, observer: Box<dyn CheckpointObserver>) {
        self.observers.push(observer);
    }

    /// Builder form of [`add_observer`](Self::add_observer)
    pub fn with_observer(mut self, observer: Box<dyn CheckpointObserver>) -> Self {
        self.add_observer(observer);
        self
    }

    /// Current in-memory checkpoint
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.data
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if `url` has already been handled
    pub fn is_seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn record_count(&self) -> usize {
        self.data.job_offers.len()
    }

    /// Accepts a record unless its URL was already seen
    ///
    /// On acceptance the checkpoint is persisted and observers are notified.
    /// Returns whether the record was accepted.
    pub fn add_record(&mut self, record: Record) -> CheckpointResult<bool> {
        if self.seen.contains(&record.url) {
            return Ok(false);
        }

        self.seen.insert(record.url.clone());
        self.data.scraped_urls.push(record.url.clone());
        self.data.job_offers.push(record);
        self.persist()?;
        self.notify();
        Ok(true)
    }

    /// Marks a URL as handled without a record
    ///
    /// Used for listings that no longer exist, so they are not fetched again.
    pub fn mark_seen(&mut self, url: &str) -> CheckpointResult<bool> {
        if !self.seen.insert(url.to_string()) {
            return Ok(false);
        }

        self.data.scraped_urls.push(url.to_string());
        self.persist()?;
        Ok(true)
    }

    pub fn set_last_page(&mut self, page: u32) -> CheckpointResult<()> {
        self.data.last_page = page;
        self.persist()
    }

    pub fn increment_challenge_count(&mut self) -> CheckpointResult<()> {
        self.data.captcha_count += 1;
        self.persist()
    }

    /// Discards all progress and persists the empty checkpoint
    pub fn reset(&mut self) -> CheckpointResult<()> {
        self.data = Checkpoint::new();
        self.seen.clear();
        self.persist()
    }

    /// Pushes the current record set to every observer
    pub fn notify(&self) {
        for observer in &self.observers {
            observer.on_records_changed(&self.data.job_offers);
        }
    }

    /// Deletes the checkpoint file after a completed crawl
    pub fn complete(&mut self) -> CheckpointResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Removed checkpoint {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Io {
                path: self.path.display().to_string(),
                source,
            }),
        }
    }

    /// Rewrites the whole checkpoint: temp file, fsync, rename
    fn persist(&self) -> CheckpointResult<()> {
        let io_err = |source| CheckpointError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let json = serde_json::to_vec_pretty(&self.data)?;
        let tmp = temp_path(&self.path);

        let mut file = File::create(&tmp).map_err(io_err)?;
        file.write_all(&json).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

/// Sibling path used for the write-then-rename
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Restores the checkpoint invariants after a load
///
/// Drops duplicate URLs and duplicate records, and adds any record URL that is
/// missing from the seen list.
fn repair(mut data: Checkpoint) -> (Checkpoint, HashSet<String>) {
    let mut seen = HashSet::new();
    data.scraped_urls.retain(|url| seen.insert(url.clone()));

    let mut recorded = HashSet::new();
    data.job_offers.retain(|record| recorded.insert(record.url.clone()));

    for record in &data.job_offers {
        if seen.insert(record.url.clone()) {
            tracing::warn!("Checkpoint record {} was missing from seen URLs", record.url);
            data.scraped_urls.push(record.url.clone());
        }
    }

    (data, seen)
}
