//! Chromium implementation of the browser seam
//!
//! Launches a Chrome/Chromium process over the DevTools protocol with the
//! stealth flags job boards expect from a regular desktop session.

use super::{Browser, BrowserError, BrowserResult, Navigation, Tab};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Interval between two DOM polls while waiting for a selector
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 720;

const STEALTH_ARGS: [&str; 5] = [
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-blink-features=AutomationControlled",
    "--disable-features=IsolateOrigins,site-per-process",
    "--disable-web-security",
];

/// HTTP status of the main document, 0 when the engine does not expose it
const STATUS_SCRIPT: &str = r#"
    (function() {
        const nav = performance.getEntriesByType('navigation')[0];
        return nav && nav.responseStatus ? nav.responseStatus : 0;
    })()
"#;

const INNER_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

impl From<CdpError> for BrowserError {
    fn from(e: CdpError) -> Self {
        BrowserError::Protocol(e.to_string())
    }
}

/// A Chromium process and its DevTools event loop
pub struct ChromiumBrowser {
    browser: Mutex<chromiumoxide::Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launches a browser with the configured head mode and executable
    pub async fn launch(config: &BrowserConfig) -> BrowserResult<Self> {
        info!(
            "Launching browser {}",
            if config.headless { "(headless)" } else { "(visible)" }
        );

        let mut builder = chromiumoxide::BrowserConfig::builder()
            .window_size(WINDOW_WIDTH, WINDOW_HEIGHT)
            .request_timeout(Duration::from_millis(config.navigation_timeout_ms))
            .args(STEALTH_ARGS);

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &config.executable {
            builder = builder.chrome_executable(executable);
        }

        let cdp_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = chromiumoxide::Browser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {:?}", e);
                }
            }
            debug!("Browser event handler task completed");
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
        })
    }
}

impl Drop for ChromiumBrowser {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn new_tab(&self) -> BrowserResult<Box<dyn Tab>> {
        let page = self.browser.lock().await.new_page("about:blank").await?;
        Ok(Box::new(ChromiumTab { page }))
    }

    async fn close(&self) -> BrowserResult<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            error!("Failed to close browser: {}", e);
        }
        let _ = browser.wait().await;
        self.handler.abort();
        info!("Browser closed");
        Ok(())
    }
}

/// One Chromium page
pub struct ChromiumTab {
    page: Page,
}

impl ChromiumTab {
    async fn evaluate_string(&self, script: &str) -> BrowserResult<String> {
        self.page
            .evaluate(script)
            .await?
            .into_value::<String>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn response_status(&self) -> Option<u16> {
        let status = self
            .page
            .evaluate(STATUS_SCRIPT)
            .await
            .ok()?
            .into_value::<u16>()
            .ok()?;
        (status > 0).then_some(status)
    }
}

#[async_trait]
impl Tab for ChromiumTab {
    async fn goto(&self, url: &str, timeout: Duration) -> BrowserResult<Navigation> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Err(_) => {
                return Err(BrowserError::NavigationTimeout {
                    url: url.to_string(),
                })
            }
            Ok(Err(CdpError::Timeout)) => {
                return Err(BrowserError::NavigationTimeout {
                    url: url.to_string(),
                })
            }
            Ok(Err(e)) => {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Ok(Ok(_)) => {}
        }

        // goto resolves only once a document has committed, so a missing
        // status means the engine hid it rather than that nothing answered
        let status = self.response_status().await.or(Some(200));
        let final_url = self.current_url().await?;

        Ok(Navigation { status, final_url })
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self
            .page
            .url()
            .await?
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.page.find_element(selector).await.is_ok() {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_visible(&self, selector: &str) -> BrowserResult<bool> {
        let quoted =
            serde_json::to_string(selector).map_err(|e| BrowserError::Script(e.to_string()))?;
        let script = format!(
            r#"
            (function() {{
                const el = document.querySelector({quoted});
                if (!el) return false;
                const style = window.getComputedStyle(el);
                if (style.display === 'none' || style.visibility === 'hidden') return false;
                const rect = el.getBoundingClientRect();
                return rect.width > 0 && rect.height > 0;
            }})()
            "#
        );

        self.page
            .evaluate(script)
            .await?
            .into_value::<bool>()
            .map_err(|e| BrowserError::Script(e.to_string()))
    }

    async fn click(&self, selector: &str) -> BrowserResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound {
                selector: selector.to_string(),
            })?;
        element.click().await?;
        Ok(())
    }

    async fn click_and_wait(&self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        self.click(selector).await?;

        match tokio::time::timeout(timeout, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: self.current_url().await.unwrap_or_default(),
            }),
        }
    }

    async fn scroll_by(&self, pixels: u32) -> BrowserResult<()> {
        self.page
            .evaluate(format!(
                "window.scrollBy({{ top: {}, behavior: 'smooth' }})",
                pixels
            ))
            .await?;
        Ok(())
    }

    async fn content(&self) -> BrowserResult<String> {
        Ok(self.page.content().await?)
    }

    async fn title(&self) -> BrowserResult<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn inner_text(&self) -> BrowserResult<String> {
        self.evaluate_string(INNER_TEXT_SCRIPT).await
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        self.page.close().await?;
        Ok(())
    }
}
