//! Pacing between browser actions
//!
//! Every delay is drawn at random from a configured [`Interval`] and doubles
//! as a cancellation point: a pending pause resolves to
//! [`ScrapeError::Interrupted`] as soon as the run is cancelled.

use crate::browser::Tab;
use crate::config::{DelayConfig, Interval};
use crate::{Result, ScrapeError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SCROLL_STEPS: std::ops::RangeInclusive<u32> = 1..=2;
const SCROLL_PIXELS: std::ops::RangeInclusive<u32> = 200..=600;

impl Interval {
    /// Draws a duration uniformly from `[min, max]` milliseconds
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return Duration::from_millis(self.min);
        }
        Duration::from_millis(rand::rng().random_range(self.min..=self.max))
    }
}

/// Randomized, cancellable delays
#[derive(Debug, Clone)]
pub struct Pacer {
    delays: DelayConfig,
    cancel: CancellationToken,
}

impl Pacer {
    pub fn new(delays: DelayConfig, cancel: CancellationToken) -> Self {
        Self { delays, cancel }
    }

    pub fn delays(&self) -> &DelayConfig {
        &self.delays
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails with [`ScrapeError::Interrupted`] once the run has been cancelled
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(ScrapeError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleeps for a sample of `interval`
    pub async fn pause(&self, interval: Interval) -> Result<()> {
        self.sleep(interval.sample()).await
    }

    /// Sleeps for `duration` unless cancelled first
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScrapeError::Interrupted),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }

    /// Runs a browser action unless the run is cancelled first
    ///
    /// The action is dropped on cancellation, so a hung navigation or wait
    /// never holds off shutdown.
    pub async fn interruptible<F>(&self, action: F) -> Result<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScrapeError::Interrupted),
            output = action => Ok(output),
        }
    }
}

/// Scrolls the tab down once or twice by a random amount, pausing after each step
///
/// Scroll failures are ignored; only cancellation is reported.
pub async fn human_scroll(tab: &dyn Tab, pacer: &Pacer) -> Result<()> {
    let steps = rand::rng().random_range(SCROLL_STEPS);
    for _ in 0..steps {
        let pixels = rand::rng().random_range(SCROLL_PIXELS);
        if let Err(e) = tab.scroll_by(pixels).await {
            tracing::debug!("Scroll failed: {}", e);
        }
        pacer.pause(pacer.delays().scroll).await?;
    }
    Ok(())
}
