// src/pipeline/run.rs

//! Full run: login, crawl, build, publish, report.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::crawl::{CrawlOutcome, run_crawler};
use crate::pipeline::pacing::Pacer;
use crate::pipeline::publish::{upload_feed, write_output};
use crate::services::{MediaMirror, Notifier, Session, SiteClient, feed, notify};
use crate::storage::{self, ObjectStore, RetryPolicy};
use crate::utils::log::{header, step, summary};

/// Where the finished feed goes.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Also write the document to this file
    pub output: Option<PathBuf>,

    /// Upload the document under `storage.feed_key`
    pub upload: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output: None,
            upload: true,
        }
    }
}

/// Everything a crawl talks to.
pub struct Collaborators {
    pub site: Arc<dyn SiteClient>,
    pub store: Arc<dyn ObjectStore>,
    pub notifier: Box<dyn Notifier>,
    pub pacer: Pacer,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: CrawlOutcome,
    pub feed_bytes: usize,
    pub output: Option<PathBuf>,
    pub uploaded_to: Option<String>,
}

/// Log in against the live site and run everything.
pub async fn run_pipeline(config: &Config, options: &RunOptions) -> Result<RunReport> {
    header("anifeed run");
    let notifier = notify::from_config(&config.notify)?;
    notifier.notify("Begin to crawl.").await;

    step(1, 3, "Login");
    let site = match login(config).await {
        Ok(session) => session,
        Err(e) => {
            notifier.notify(&format!("Login failed: {e}")).await;
            return Err(e);
        }
    };

    step(2, 3, "Open storage");
    let store = storage::open(&config.storage).await?;

    step(3, 3, "Crawl and publish");
    let collaborators = Collaborators {
        site: Arc::new(site),
        store,
        notifier,
        pacer: Pacer::from_config(&config.crawler),
    };
    crawl_and_publish(config, options, collaborators, Utc::now()).await
}

/// Create a session and log in with the configured credentials.
pub async fn login(config: &Config) -> Result<Session> {
    let session = Session::create(&config.site, &config.crawler)?;
    session.login(&config.credentials).await?;
    Ok(session)
}

/// Crawl with the given collaborators, then build and publish the feed.
///
/// Nothing is written or uploaded unless the crawl and the build succeed.
pub async fn crawl_and_publish(
    config: &Config,
    options: &RunOptions,
    collaborators: Collaborators,
    run_started: DateTime<Utc>,
) -> Result<RunReport> {
    let Collaborators {
        site,
        store,
        notifier,
        mut pacer,
    } = collaborators;

    let result = crawl_build_publish(
        config,
        options,
        site,
        store,
        notifier.as_ref(),
        &mut pacer,
        run_started,
    )
    .await;

    match result {
        Ok(report) => {
            notifier.notify("Atom feed is ready.").await;
            log_summary(&report);
            Ok(report)
        }
        Err(e) => {
            notifier.notify(&format!("Run failed: {e}")).await;
            Err(e)
        }
    }
}

async fn crawl_build_publish(
    config: &Config,
    options: &RunOptions,
    site: Arc<dyn SiteClient>,
    store: Arc<dyn ObjectStore>,
    notifier: &dyn Notifier,
    pacer: &mut Pacer,
    run_started: DateTime<Utc>,
) -> Result<RunReport> {
    let mirror = MediaMirror::new(site.clone(), store.clone(), &config.storage);
    let outcome = run_crawler(config, site.as_ref(), &mirror, notifier, pacer, run_started).await?;

    let bytes = feed::build(&outcome.feed)?;

    // Upload before touching the local file so a failed publish leaves nothing behind.
    let uploaded_to = if options.upload {
        let policy = RetryPolicy::from_config(&config.storage);
        Some(upload_feed(store.as_ref(), &config.storage.feed_key, &bytes, &policy).await?)
    } else {
        None
    };
    if let Some(path) = &options.output {
        write_output(path, &bytes).await?;
    }

    Ok(RunReport {
        outcome,
        feed_bytes: bytes.len(),
        output: options.output.clone(),
        uploaded_to,
    })
}

fn log_summary(report: &RunReport) {
    let o = &report.outcome;
    summary(
        "Run complete",
        &[
            ("Items", o.feed.len().to_string()),
            ("Pages scanned", o.pages_scanned.to_string()),
            ("Rows seen", o.rows_seen.to_string()),
            ("Rows excluded", o.rows_excluded.to_string()),
            ("Duplicates", o.duplicates.to_string()),
            ("Detail failures", o.detail_failures.to_string()),
            ("Asset failures", o.asset_failures.to_string()),
            ("Synthesized timestamps", o.synthesized_timestamps.to_string()),
            ("Feed bytes", report.feed_bytes.to_string()),
            (
                "Uploaded to",
                report.uploaded_to.clone().unwrap_or_else(|| "-".into()),
            ),
        ],
    );
}
