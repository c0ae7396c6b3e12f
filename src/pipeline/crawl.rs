// src/pipeline/crawl.rs

//! Sequential crawl: listing pages, profiles, artwork, feed items.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Config, DetailFields, Feed, FeedItem, ListingRow, UpdatedAt};
use crate::pipeline::pacing::Pacer;
use crate::services::profile::render_content;
use crate::services::{ListingScanner, MediaMirror, Notifier, ProfileExtractor, SiteClient};
use crate::utils::log::sub_item;

/// The feed assembled by a crawl plus what happened along the way.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub feed: Feed,
    pub pages_scanned: u32,
    pub rows_seen: usize,
    pub rows_excluded: usize,
    pub duplicates: usize,
    pub detail_failures: usize,
    pub asset_failures: usize,
    pub synthesized_timestamps: usize,
}

impl CrawlOutcome {
    fn new(feed: Feed) -> Self {
        Self {
            feed,
            pages_scanned: 0,
            rows_seen: 0,
            rows_excluded: 0,
            duplicates: 0,
            detail_failures: 0,
            asset_failures: 0,
            synthesized_timestamps: 0,
        }
    }

    /// Whether anything was reported to the notifier as degraded.
    pub fn is_degraded(&self) -> bool {
        self.detail_failures + self.asset_failures + self.synthesized_timestamps > 0
    }
}

/// Walk the listing and build the feed.
///
/// Fatal errors (access denied, missing pagination total in strict mode,
/// listing transport failures) are returned. Item and asset problems are
/// reported to `notifier` and the crawl moves on. `run_started` stamps the
/// feed and stands in for timestamps the site did not provide.
pub async fn run_crawler(
    config: &Config,
    site: &dyn SiteClient,
    mirror: &MediaMirror,
    notifier: &dyn Notifier,
    pacer: &mut Pacer,
    run_started: DateTime<Utc>,
) -> Result<CrawlOutcome> {
    let scanner = ListingScanner::new(site, &config.site)?;
    let extractor = ProfileExtractor::new(&config.site)?;

    let total = match scanner.discover_page_count().await? {
        Some(total) => total,
        None if config.crawler.strict_page_total => {
            return Err(AppError::PaginationNotFound {
                listing_path: config.site.listing_path.clone(),
            });
        }
        None => {
            notifier
                .notify("Can't find the listing page total, continuing with total=0.")
                .await;
            0
        }
    };

    let feed = Feed::new(&config.feed, config.feed_self_link(), run_started);
    let mut outcome = CrawlOutcome::new(feed);
    let mut seen: HashSet<String> = HashSet::new();

    log::info!("Start to parse listing pages.");
    for index in 1..=config.crawler.pages_to_scan {
        pacer.pause().await;
        let page = scanner.fetch_page(total, index).await?;
        outcome.pages_scanned += 1;

        let (rows, excluded) = extractor.scan_rows(&page.body);
        outcome.rows_seen += rows.len() + excluded;
        outcome.rows_excluded += excluded;
        log::info!(
            "Page {}: {} rows, {} excluded",
            page.index,
            rows.len(),
            excluded
        );

        for row in rows {
            if !seen.insert(row.detail_url.clone()) {
                log::debug!("Duplicate row skipped: {}", row.detail_url);
                outcome.duplicates += 1;
                continue;
            }

            pacer.pause().await;
            let item =
                crawl_item(&row, site, &extractor, mirror, notifier, run_started, &mut outcome)
                    .await;
            if let Some(item) = item {
                outcome.feed.push(item);
            }
        }
    }

    Ok(outcome)
}

async fn crawl_item(
    row: &ListingRow,
    site: &dyn SiteClient,
    extractor: &ProfileExtractor,
    mirror: &MediaMirror,
    notifier: &dyn Notifier,
    run_started: DateTime<Utc>,
    outcome: &mut CrawlOutcome,
) -> Option<FeedItem> {
    log::info!("Reading torrent profile: {}", row.detail_url);

    let body = match site.get_text(&row.detail_url).await {
        Ok(body) => body,
        Err(e) => {
            outcome.detail_failures += 1;
            notifier
                .notify(&format!(
                    "Failed to get the torrent profile page {}: {}",
                    row.detail_url, e
                ))
                .await;
            return None;
        }
    };

    let detail = extractor.extract_detail(&body);
    let updated = resolve_updated(&detail, row, notifier, run_started, outcome).await;

    let cover = match &detail.cover {
        Some(url) => Some(mirror_or_source(url, mirror, notifier, outcome).await),
        None => None,
    };
    let mut screenshots = Vec::with_capacity(detail.screenshots.len());
    for url in &detail.screenshots {
        screenshots.push(mirror_or_source(url, mirror, notifier, outcome).await);
    }

    Some(FeedItem {
        title: extractor.sanitize_title(&row.raw_title),
        link: row.detail_url.clone(),
        category: row.category.clone(),
        updated,
        content: render_content(row, &detail, cover.as_deref(), &screenshots),
    })
}

async fn resolve_updated(
    detail: &DetailFields,
    row: &ListingRow,
    notifier: &dyn Notifier,
    run_started: DateTime<Utc>,
    outcome: &mut CrawlOutcome,
) -> DateTime<Utc> {
    let message = match &detail.updated {
        UpdatedAt::Parsed(at) => return *at,
        UpdatedAt::Missing => format!("Unable to extract upload time data: {}", row.detail_url),
        UpdatedAt::Unparsable(raw) => {
            format!("Unable to parse time format '{}': {}", raw, row.detail_url)
        }
    };

    outcome.synthesized_timestamps += 1;
    notifier.notify(&message).await;
    detail.updated.or(run_started)
}

/// Public URL of the mirrored copy, or the source URL if mirroring failed.
async fn mirror_or_source(
    url: &str,
    mirror: &MediaMirror,
    notifier: &dyn Notifier,
    outcome: &mut CrawlOutcome,
) -> String {
    match mirror.mirror(url).await {
        Ok(asset) => {
            sub_item(&format!("{} -> {}", asset.source_url, asset.public_url));
            asset.public_url
        }
        Err(e) => {
            outcome.asset_failures += 1;
            notifier
                .notify(&format!("Failed to mirror {}: {}", url, e))
                .await;
            url.to_string()
        }
    }
}
