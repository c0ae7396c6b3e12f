//! Service layer for the feed crawler.
//!
//! This module contains the business logic for:
//! - Authenticated site access (`Session`, `SiteClient`)
//! - Listing pagination (`ListingScanner`)
//! - Row and profile extraction (`ProfileExtractor`)
//! - Artwork mirroring (`MediaMirror`)
//! - Atom serialization (`feed::build`)
//! - Run notifications (`Notifier`)

pub mod feed;
pub mod listing;
pub mod media;
pub mod notify;
pub mod profile;
pub mod session;

pub use listing::ListingScanner;
pub use media::MediaMirror;
pub use notify::{LogNotifier, Notifier, SlackNotifier};
pub use profile::ProfileExtractor;
pub use session::{FetchedAsset, Session, SiteClient};
