//! Job offer record definition
//!
//! A record is one extracted job posting. Every field is always present; a
//! value the page did not provide holds [`UNSPECIFIED`].

use serde::{Deserialize, Serialize};

/// Placeholder for a field the detail page did not provide
pub const UNSPECIFIED: &str = "unspecified";

/// Rendering of the remote flag
pub const REMOTE_YES: &str = "yes";
pub const REMOTE_NO: &str = "no";

/// One extracted job offer
///
/// Field order matches the column order of the CSV output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub contract: String,
    pub remote: String,
    pub published_date: String,
    pub description: String,

    /// Canonical detail URL, the unique key of a record
    pub url: String,
}

impl Record {
    /// Creates a record for `url` with every other field unspecified
    pub fn unspecified(url: impl Into<String>) -> Self {
        Self {
            title: UNSPECIFIED.to_string(),
            company: UNSPECIFIED.to_string(),
            location: UNSPECIFIED.to_string(),
            salary: UNSPECIFIED.to_string(),
            contract: UNSPECIFIED.to_string(),
            remote: REMOTE_NO.to_string(),
            published_date: UNSPECIFIED.to_string(),
            description: UNSPECIFIED.to_string(),
            url: url.into(),
        }
    }

    /// Returns true if the posting advertises remote work
    pub fn is_remote(&self) -> bool {
        self.remote == REMOTE_YES
    }
}
