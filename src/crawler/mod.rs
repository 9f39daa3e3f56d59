//! Crawler module for browser-driven listing traversal
//!
//! This module contains the core crawling logic, including:
//! - Randomized, cancellable pacing
//! - Bot challenge detection
//! - Listing link collection and detail record extraction
//! - Batched detail fetching and results page traversal
//! - Overall run coordination

mod batcher;
mod challenge;
mod coordinator;
mod extractor;
mod links;
mod timing;
mod walker;

pub use batcher::{pending_urls, BatchReport, Batcher};
pub use challenge::{contains_challenge_phrase, ChallengeDetector};
pub use coordinator::{resume_choice, Coordinator, ResumeChoice, RunReport};
pub use extractor::{
    classify_contract, is_not_found_page, is_remote, Extraction, Extractor, CONTRACT_KEYWORDS,
};
pub use links::collect_listing_links;
pub use timing::{human_scroll, Pacer};
pub use walker::{Halt, Walk, WalkStats, Walker};
