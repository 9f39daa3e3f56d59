//! Bot challenge detection

use crate::browser::Tab;
use regex::Regex;
use std::sync::LazyLock;

static CHALLENGE_PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)vérifiez que vous êtes humain|prouvez que vous êtes|verify you are human")
        .expect("challenge phrase pattern is valid")
});

/// Recognizes an interstitial anti-bot page
#[derive(Debug, Clone)]
pub struct ChallengeDetector {
    selectors: Vec<String>,
}

impl ChallengeDetector {
    pub fn new(selectors: &[String]) -> Self {
        Self {
            selectors: selectors.to_vec(),
        }
    }

    /// Returns true if a challenge marker is visibly rendered or the page text
    /// asks the visitor to prove they are human
    ///
    /// Any failure to inspect the page counts as "no challenge".
    pub async fn detect(&self, tab: &dyn Tab) -> bool {
        for selector in &self.selectors {
            if matches!(tab.is_visible(selector).await, Ok(true)) {
                tracing::debug!("Challenge marker visible: {}", selector);
                return true;
            }
        }

        match tab.inner_text().await {
            Ok(text) => contains_challenge_phrase(&text),
            Err(e) => {
                tracing::debug!("Could not read page text for challenge check: {}", e);
                false
            }
        }
    }
}

/// Returns true if `text` contains one of the known challenge phrases
pub fn contains_challenge_phrase(text: &str) -> bool {
    CHALLENGE_PHRASES.is_match(text)
}
