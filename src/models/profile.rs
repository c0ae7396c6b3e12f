//! Fields extracted from a detail page.

use chrono::{DateTime, Utc};

/// Outcome of reading the "blog date" of a detail page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatedAt {
    /// The date span was present and parsed
    Parsed(DateTime<Utc>),
    /// No date span on the page
    Missing,
    /// The date span held text that did not fit the layout
    Unparsable(String),
}

impl UpdatedAt {
    /// Resolve to a timestamp, substituting `fallback` when nothing usable was found.
    pub fn or(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            UpdatedAt::Parsed(at) => *at,
            UpdatedAt::Missing | UpdatedAt::Unparsable(_) => fallback,
        }
    }
}

/// Metadata of one torrent profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailFields {
    /// Markup of the description block
    pub plot: Option<String>,

    /// Cover image URL on the asset host
    pub cover: Option<String>,

    /// Screenshot thumbnail URLs, in page order
    pub screenshots: Vec<String>,

    pub updated: UpdatedAt,
}
