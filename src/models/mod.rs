// src/models/mod.rs

//! Domain models for the feed crawler.
//!
//! Plain data carried between the pipeline stages: configuration, listing
//! rows, detail page fields, mirrored media and the feed itself.

pub mod config;
mod feed;
mod listing;
mod media;
mod profile;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, Credentials, FeedConfig, NotifyConfig, SiteConfig, StorageBackend,
    StorageConfig,
};
pub use feed::{Feed, FeedItem, Person};
pub use listing::{ListingPage, ListingRow};
pub use media::MediaAsset;
pub use profile::{DetailFields, UpdatedAt};
