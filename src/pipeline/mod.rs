//! Pipeline entry points for a feed run.
//!
//! - `run_pipeline`: Log in, crawl, build and publish the feed
//! - `run_crawler`: Walk the listing and assemble the feed in memory

pub mod crawl;
pub mod pacing;
pub mod publish;
pub mod run;

pub use crawl::{CrawlOutcome, run_crawler};
pub use pacing::Pacer;
pub use run::{Collaborators, RunOptions, RunReport, crawl_and_publish, login, run_pipeline};
