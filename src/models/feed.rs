//! Feed data structures.

use chrono::{DateTime, Utc};

use crate::models::FeedConfig;

/// Author identity of the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub uri: String,
    pub email: String,
}

/// One syndicated torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// Sanitized, HTML-escaped title
    pub title: String,

    /// Detail page URL, also used as the entry id
    pub link: String,

    pub category: String,

    pub updated: DateTime<Utc>,

    /// HTML fragment with mirrored image URLs
    pub content: String,
}

/// The feed assembled by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub title: String,
    pub author: Person,
    pub updated: DateTime<Utc>,
    pub self_link: String,

    /// Entries in discovery order
    pub items: Vec<FeedItem>,
}

impl Feed {
    /// Create an empty feed with header fields from configuration.
    pub fn new(config: &FeedConfig, self_link: impl Into<String>, updated: DateTime<Utc>) -> Self {
        Self {
            title: config.title.clone(),
            author: Person {
                name: config.author_name.clone(),
                uri: config.author_uri.clone(),
                email: config.author_email.clone(),
            },
            updated,
            self_link: self_link.into(),
            items: Vec::new(),
        }
    }

    /// Append an item, keeping insertion order.
    pub fn push(&mut self, item: FeedItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
