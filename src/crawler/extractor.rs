//! Record extraction from a loaded detail page
//!
//! Field values come from the rendered HTML. Each field has an ordered list of
//! candidate selectors and the first one yielding non-empty text wins; a field
//! with no match holds [`UNSPECIFIED`].

use crate::browser::Tab;
use crate::checkpoint::{Record, REMOTE_NO, REMOTE_YES, UNSPECIFIED};
use crate::config::SelectorConfig;
use crate::crawler::timing::{human_scroll, Pacer};
use crate::Result;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;

/// Employment types in priority order; the first one present in the
/// description is the record's contract type
pub const CONTRACT_KEYWORDS: [&str; 5] = ["stage", "CDD", "CDI", "alternance", "freelance"];

static CONTRACT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    CONTRACT_KEYWORDS
        .iter()
        .map(|keyword| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(keyword));
            (
                *keyword,
                Regex::new(&pattern).expect("contract keyword pattern is valid"),
            )
        })
        .collect()
});

static REMOTE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)télétravail|remote|distanciel").expect("remote pattern is valid")
});

static NOT_FOUND_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)404|not found|page introuvable|n'existe plus")
        .expect("not-found title pattern is valid")
});

static NOT_FOUND_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)cette offre n'est plus disponible|job.*no longer available")
        .expect("not-found content pattern is valid")
});

/// Outcome of extracting one detail page
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// A complete record
    Record(Record),

    /// The posting is gone; not an error
    Skipped,

    /// The content region never appeared on a page that is not a not-found page
    Failed { reason: String },
}

/// Extracts records using the configured selectors
#[derive(Debug, Clone)]
pub struct Extractor {
    description_selector: String,
    content_timeout: Duration,
    description: Vec<Selector>,
    title: Vec<Selector>,
    company: Vec<Selector>,
    location: Vec<Selector>,
    salary: Vec<Selector>,
    published_date: Vec<Selector>,
}

impl Extractor {
    pub fn new(selectors: &SelectorConfig, content_timeout: Duration) -> Self {
        Self {
            description_selector: selectors.description.clone(),
            content_timeout,
            description: compile(std::slice::from_ref(&selectors.description)),
            title: compile(&selectors.title),
            company: compile(&selectors.company),
            location: compile(&selectors.location),
            salary: compile(&selectors.salary),
            published_date: compile(&selectors.published_date),
        }
    }

    /// Extracts the record of the detail page currently loaded in `tab`
    ///
    /// Only cancellation is reported as an error; every page-level problem is
    /// an [`Extraction`] outcome.
    pub async fn extract(&self, tab: &dyn Tab, url: &str, pacer: &Pacer) -> Result<Extraction> {
        let has_description = pacer
            .interruptible(tab.wait_for_selector(&self.description_selector, self.content_timeout))
            .await?;

        if !has_description {
            if is_not_found(tab).await {
                return Ok(Extraction::Skipped);
            }
            return Ok(Extraction::Failed {
                reason: "description not found".to_string(),
            });
        }

        human_scroll(tab, pacer).await?;
        pacer.pause(pacer.delays().detail_settle).await?;

        match tab.content().await {
            Ok(html) => Ok(Extraction::Record(self.parse_record(&html, url))),
            Err(e) => Ok(Extraction::Failed {
                reason: format!("could not read page content: {}", e),
            }),
        }
    }

    /// Builds a record from detail page HTML
    pub fn parse_record(&self, html: &str, url: &str) -> Record {
        let document = Html::parse_document(html);

        let description = first_match(&document, &self.description, block_text);
        let body = description.as_deref().unwrap_or_default();

        let field = |selectors: &[Selector]| {
            first_match(&document, selectors, inline_text)
                .unwrap_or_else(|| UNSPECIFIED.to_string())
        };

        Record {
            title: field(&self.title),
            company: field(&self.company),
            location: field(&self.location),
            salary: field(&self.salary),
            contract: classify_contract(body).unwrap_or(UNSPECIFIED).to_string(),
            remote: if is_remote(body) { REMOTE_YES } else { REMOTE_NO }.to_string(),
            published_date: field(&self.published_date),
            description: description.unwrap_or_else(|| UNSPECIFIED.to_string()),
            url: url.to_string(),
        }
    }
}

/// Returns the highest-priority contract keyword found in `text`
pub fn classify_contract(text: &str) -> Option<&'static str> {
    CONTRACT_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(keyword, _)| *keyword)
}

/// Returns true if `text` mentions remote work
pub fn is_remote(text: &str) -> bool {
    REMOTE_PATTERN.is_match(text)
}

/// Returns true if a title or page body identifies a not-found page
pub fn is_not_found_page(title: &str, content: &str) -> bool {
    NOT_FOUND_TITLE.is_match(title) || NOT_FOUND_CONTENT.is_match(content)
}

async fn is_not_found(tab: &dyn Tab) -> bool {
    let title = tab.title().await.unwrap_or_default();
    let content = tab.content().await.unwrap_or_default();
    is_not_found_page(&title, &content)
}

fn compile(selectors: &[String]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(selector) => Some(selector),
            Err(e) => {
                tracing::warn!("Ignoring invalid selector {}: {:?}", s, e);
                None
            }
        })
        .collect()
}

fn first_match(
    document: &Html,
    selectors: &[Selector],
    text: fn(ElementRef<'_>) -> String,
) -> Option<String> {
    selectors.iter().find_map(|selector| {
        document
            .select(selector)
            .next()
            .map(text)
            .filter(|t| !t.is_empty())
    })
}

/// Element text with all whitespace runs collapsed to single spaces
fn inline_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Element text with one trimmed, non-empty line per text line
fn block_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
