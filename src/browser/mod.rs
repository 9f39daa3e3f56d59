//! Browser automation seam
//!
//! The crawler never talks to a browser engine directly. It drives tabs
//! through the [`Browser`] and [`Tab`] traits:
//! - open an isolated tab
//! - navigate with a bounded timeout
//! - wait for a selector, test visibility, click
//! - read the rendered HTML, title and visible text
//!
//! [`chromium::ChromiumBrowser`] is the production implementation.

pub mod chromium;

pub use chromium::ChromiumBrowser;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a browser implementation
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation timeout for {url}")]
    NavigationTimeout { url: String },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("No element matches {selector}")]
    ElementNotFound { selector: String },

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

impl BrowserError {
    /// Returns true for navigation timeouts, which the crawler treats as skips
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::NavigationTimeout { .. })
    }
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// Outcome of a completed navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// HTTP status of the main document, if the engine reported one
    pub status: Option<u16>,

    /// Location after redirects
    pub final_url: String,
}

impl Navigation {
    /// Returns true if the document could not be retrieved: no response or HTTP 404
    pub fn is_not_found(&self) -> bool {
        matches!(self.status, None | Some(404))
    }
}

/// A browser engine able to open isolated tabs
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a fresh, blank tab
    async fn new_tab(&self) -> BrowserResult<Box<dyn Tab>>;

    /// Shuts the engine down
    async fn close(&self) -> BrowserResult<()>;
}

/// One browsing context with its own navigation state
#[async_trait]
pub trait Tab: Send + Sync {
    /// Navigates to `url`, failing with [`BrowserError::NavigationTimeout`]
    /// if the document does not load within `timeout`
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<Navigation>;

    /// Current location of the tab
    async fn current_url(&self) -> BrowserResult<String>;

    /// Waits until an element matches `selector`; false on timeout
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> bool;

    /// Returns true if an element matches `selector` and is rendered visibly
    async fn is_visible(&self, selector: &str) -> BrowserResult<bool>;

    /// Clicks the first element matching `selector`
    async fn click(&self, selector: &str) -> BrowserResult<()>;

    /// Clicks the first element matching `selector` and waits for the
    /// navigation it triggers
    async fn click_and_wait(&self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    /// Scrolls the viewport down by `pixels`
    async fn scroll_by(&self, pixels: u32) -> BrowserResult<()>;

    /// Serialized HTML of the rendered document
    async fn content(&self) -> BrowserResult<String>;

    /// Document title
    async fn title(&self) -> BrowserResult<String>;

    /// Visible text of the document body
    async fn inner_text(&self) -> BrowserResult<String>;

    /// Closes the tab
    async fn close(self: Box<Self>) -> BrowserResult<()>;
}
