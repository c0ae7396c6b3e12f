//! Integration tests for the crawl and publish pipeline.
//!
//! The site, the object store and the notifier are in-memory fakes, so these
//! run without network access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anifeed::error::{AppError, Result};
use anifeed::models::{Config, StorageBackend};
use anifeed::pipeline::{Collaborators, Pacer, RunOptions, crawl_and_publish, run_crawler};
use anifeed::services::{FetchedAsset, MediaMirror, Notifier, SiteClient};
use anifeed::storage::{LocalStore, ObjectStore, PutObject, StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

const BASE: &str = "https://tracker.test";
const COVER: &str = "https://tracker.test/imghost/covers/2020/01/cover.jpg";
const SHOT: &str = "https://tracker.test/imghost/screenthumb/2020/01/shot.jpg";

#[derive(Default)]
struct FakeSite {
    pages: HashMap<String, String>,
    assets: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl FakeSite {
    fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    fn with_asset(mut self, url: &str) -> Self {
        self.assets.insert(url.to_string(), b"image".to_vec());
        self
    }

    fn requested(&self, url: &str) -> bool {
        self.requests.lock().unwrap().iter().any(|u| u == url)
    }

    fn lookup(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::crawl(url, "404 Not Found"))
    }
}

#[async_trait]
impl SiteClient for FakeSite {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.lookup(url)
    }

    async fn get_xhr_text(&self, url: &str) -> Result<String> {
        self.lookup(url)
    }

    async fn get_asset(&self, url: &str) -> Result<FetchedAsset> {
        self.requests.lock().unwrap().push(url.to_string());
        let bytes = self
            .assets
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::crawl(url, "404 Not Found"))?;
        Ok(FetchedAsset {
            bytes,
            content_type: Some("image/jpeg".into()),
        })
    }
}

#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: Mutex<u32>,
    broken: bool,
}

impl MemoryStore {
    fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    fn puts(&self) -> u32 {
        *self.puts.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn put(&self, object: PutObject<'_>) -> StoreResult<()> {
        *self.puts.lock().unwrap() += 1;
        if self.broken {
            return Err(StoreError::Backend("AccessDenied".into()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(object.key.to_string(), object.body.to_vec());
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.site.base_url = BASE.into();
    config.site.asset_prefix = format!("{BASE}/imghost/");
    config.crawler.pages_to_scan = 1;
    config.storage.backend = StorageBackend::Local;
    config.storage.public_base_url = "https://cdn.test".into();
    config.storage.media_prefix = "media".into();
    config.storage.feed_key = "feed.xml".into();
    config.storage.upload_max_attempts = 1;
    config
}

fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 6, 0, 0).unwrap()
}

fn landing(total: u32) -> String {
    format!(r#"<a href="ajax/torrents_data.php?total={total}&amp;page=1">1</a>"#)
}

fn listing_url(total: u32, page: u32) -> String {
    format!("{BASE}/ajax/torrents_data.php?total={total}&page={page}")
}

fn landing_url() -> String {
    format!("{BASE}/torrents.php")
}

fn detail_url(id: u32) -> String {
    format!("{BASE}/torrent-details.php?torid={id}")
}

fn row(category: &str, id: u32, title: &str) -> String {
    format!(
        r#"<tr class="dataOdd">
             <td><a href="torrents.php?cat=1" title="{category}">c</a></td>
             <td><a href="torrent-details.php?torid={id}"><strong>{title}</strong></a></td>
           </tr>"#
    )
}

fn profile(date: Option<&str>, cover: Option<&str>, shots: &[&str]) -> String {
    let mut html = String::from("<html><body>");
    if let Some(date) = date {
        html.push_str(&format!(r#"<span class="blogDate">{date}</span>"#));
    }
    if let Some(cover) = cover {
        html.push_str(&format!(r#"<img src="{cover}" />"#));
    }
    html.push_str(r#"<div id="torDescription"><p>Plot.</p></div>"#);
    for shot in shots {
        html.push_str(&format!(r#"<img src="{shot}" />"#));
    }
    html.push_str("</body></html>");
    html
}

async fn crawl(
    config: &Config,
    site: Arc<FakeSite>,
    store: Arc<MemoryStore>,
    notifier: &RecordingNotifier,
) -> Result<anifeed::pipeline::CrawlOutcome> {
    let mirror = MediaMirror::new(site.clone(), store, &config.storage);
    run_crawler(
        config,
        site.as_ref(),
        &mirror,
        notifier,
        &mut Pacer::disabled(),
        run_time(),
    )
    .await
}

#[tokio::test]
async fn excluded_category_yields_no_items() {
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(1))
            .with_page(listing_url(1, 1), row("Manga", 1, "Some Manga")),
    );
    let notifier = RecordingNotifier::default();

    let outcome = crawl(&config(), site.clone(), Arc::default(), &notifier)
        .await
        .unwrap();

    assert!(outcome.feed.is_empty());
    assert_eq!(outcome.rows_seen, 1);
    assert_eq!(outcome.rows_excluded, 1);
    assert!(!site.requested(&detail_url(1)));
    assert!(notifier.messages().is_empty());
}

#[tokio::test]
async fn blog_date_becomes_item_timestamp() {
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(1))
            .with_page(listing_url(1, 1), row("Anime Series", 1, "Frieren"))
            .with_page(detail_url(1), profile(Some("5 Jan, 2020 [3:04 pm]"), None, &[])),
    );
    let notifier = RecordingNotifier::default();

    let outcome = crawl(&config(), site, Arc::default(), &notifier)
        .await
        .unwrap();

    assert_eq!(outcome.feed.len(), 1);
    let item = &outcome.feed.items[0];
    assert_eq!(item.updated.to_rfc3339(), "2020-01-05T15:04:00+00:00");
    assert_eq!(item.title, "Frieren");
    assert_eq!(item.link, detail_url(1));
    assert_eq!(item.category, "Anime Series");
    assert!(notifier.messages().is_empty());
    assert!(!outcome.is_degraded());
}

#[tokio::test]
async fn missing_blog_date_uses_run_time_and_notifies_once() {
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(1))
            .with_page(listing_url(1, 1), row("Anime Series", 1, "Frieren"))
            .with_page(detail_url(1), profile(None, None, &[])),
    );
    let notifier = RecordingNotifier::default();

    let outcome = crawl(&config(), site, Arc::default(), &notifier)
        .await
        .unwrap();

    assert_eq!(outcome.feed.items[0].updated, run_time());
    assert_eq!(outcome.synthesized_timestamps, 1);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn shared_cover_is_uploaded_once() {
    let listing = format!(
        "{}{}",
        row("Anime Series", 1, "First"),
        row("Anime Series", 2, "Second")
    );
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(1))
            .with_page(listing_url(1, 1), listing)
            .with_page(detail_url(1), profile(Some("5 Jan, 2020 [3:04 pm]"), Some(COVER), &[SHOT]))
            .with_page(detail_url(2), profile(Some("6 Jan, 2020 [9:30 am]"), Some(COVER), &[]))
            .with_asset(COVER)
            .with_asset(SHOT),
    );
    let store = Arc::new(MemoryStore::default());
    let notifier = RecordingNotifier::default();

    let outcome = crawl(&config(), site, store.clone(), &notifier)
        .await
        .unwrap();

    let public_cover = "https://cdn.test/media/2020/01/cover.jpg";
    assert_eq!(outcome.feed.len(), 2);
    assert!(outcome.feed.items[0].content.contains(public_cover));
    assert!(outcome.feed.items[1].content.contains(public_cover));
    assert!(
        outcome.feed.items[0]
            .content
            .contains("https://cdn.test/media/2020/01/shot.jpg")
    );
    assert_eq!(store.puts(), 2);
    assert_eq!(outcome.feed.items[0].title, "First");
    assert_eq!(outcome.feed.items[1].title, "Second");
}

#[tokio::test]
async fn duplicate_detail_urls_collapse() {
    let listing = format!(
        "{}{}",
        row("Anime Series", 1, "Once"),
        row("Anime Series", 1, "Once again")
    );
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(1))
            .with_page(listing_url(1, 1), listing)
            .with_page(detail_url(1), profile(Some("5 Jan, 2020 [3:04 pm]"), None, &[])),
    );
    let notifier = RecordingNotifier::default();

    let outcome = crawl(&config(), site, Arc::default(), &notifier)
        .await
        .unwrap();

    assert_eq!(outcome.feed.len(), 1);
    assert_eq!(outcome.duplicates, 1);
    assert_eq!(outcome.feed.items[0].title, "Once");
}

#[tokio::test]
async fn missing_page_total_is_fatal_in_strict_mode() {
    let site = Arc::new(FakeSite::default().with_page(landing_url(), "<html>maintenance</html>"));
    let notifier = RecordingNotifier::default();

    let err = crawl(&config(), site.clone(), Arc::default(), &notifier)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PaginationNotFound { .. }));
    assert!(!site.requested(&listing_url(0, 1)));
}

#[tokio::test]
async fn missing_page_total_continues_in_legacy_mode() {
    let mut config = config();
    config.crawler.strict_page_total = false;
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), "<html>maintenance</html>")
            .with_page(listing_url(0, 1), row("Anime Series", 1, "Frieren"))
            .with_page(detail_url(1), profile(Some("5 Jan, 2020 [3:04 pm]"), None, &[])),
    );
    let notifier = RecordingNotifier::default();

    let outcome = crawl(&config, site.clone(), Arc::default(), &notifier)
        .await
        .unwrap();

    assert!(site.requested(&listing_url(0, 1)));
    assert_eq!(outcome.feed.len(), 1);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn access_denied_aborts_the_crawl() {
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(3))
            .with_page(listing_url(3, 1), "<h1>Access Denied!</h1>"),
    );
    let notifier = RecordingNotifier::default();

    let err = crawl(&config(), site, Arc::default(), &notifier)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AccessDenied { page: 1 }));
}

#[tokio::test]
async fn failed_detail_page_skips_the_item() {
    let listing = format!(
        "{}{}",
        row("Anime Series", 1, "Broken"),
        row("Anime Series", 2, "Fine")
    );
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(1))
            .with_page(listing_url(1, 1), listing)
            .with_page(detail_url(2), profile(Some("5 Jan, 2020 [3:04 pm]"), None, &[])),
    );
    let notifier = RecordingNotifier::default();

    let outcome = crawl(&config(), site, Arc::default(), &notifier)
        .await
        .unwrap();

    assert_eq!(outcome.feed.len(), 1);
    assert_eq!(outcome.feed.items[0].title, "Fine");
    assert_eq!(outcome.detail_failures, 1);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn failed_mirror_keeps_source_url() {
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(1))
            .with_page(listing_url(1, 1), row("Anime Series", 1, "Frieren"))
            .with_page(detail_url(1), profile(Some("5 Jan, 2020 [3:04 pm]"), Some(COVER), &[]))
            .with_asset(COVER),
    );
    let store = Arc::new(MemoryStore::broken());
    let notifier = RecordingNotifier::default();

    let outcome = crawl(&config(), site, store, &notifier)
        .await
        .unwrap();

    assert!(outcome.feed.items[0].content.contains(COVER));
    assert_eq!(outcome.asset_failures, 1);
    assert_eq!(notifier.messages().len(), 1);
}

#[tokio::test]
async fn pages_are_fetched_in_order() {
    let mut config = config();
    config.crawler.pages_to_scan = 2;
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(2))
            .with_page(listing_url(2, 1), row("Anime Series", 1, "Page one"))
            .with_page(listing_url(2, 2), row("Anime Series", 2, "Page two"))
            .with_page(detail_url(1), profile(Some("5 Jan, 2020 [3:04 pm]"), None, &[]))
            .with_page(detail_url(2), profile(Some("5 Jan, 2020 [3:04 pm]"), None, &[])),
    );
    let notifier = RecordingNotifier::default();

    let outcome = crawl(&config, site, Arc::default(), &notifier)
        .await
        .unwrap();

    assert_eq!(outcome.pages_scanned, 2);
    let titles: Vec<_> = outcome.feed.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Page one", "Page two"]);
}

#[tokio::test]
async fn successful_run_writes_and_uploads_the_feed() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("out/feed.xml");
    let store = Arc::new(LocalStore::new(tmp.path().join("bucket")));
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(1))
            .with_page(listing_url(1, 1), row("Anime Series", 1, "Tom &amp; Jerry"))
            .with_page(detail_url(1), profile(Some("5 Jan, 2020 [3:04 pm]"), Some(COVER), &[]))
            .with_asset(COVER),
    );
    let notifier = RecordingNotifier::default();

    let report = crawl_and_publish(
        &config(),
        &RunOptions {
            output: Some(output.clone()),
            upload: true,
        },
        Collaborators {
            site,
            store: store.clone(),
            notifier: Box::new(notifier.clone()),
            pacer: Pacer::disabled(),
        },
        run_time(),
    )
    .await
    .unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("<updated>2020-01-05T15:04:00Z</updated>"));
    assert!(written.contains("Tom &amp;amp; Jerry"));
    assert!(store.exists("feed.xml").await.unwrap());
    assert!(store.exists("media/2020/01/cover.jpg").await.unwrap());
    assert_eq!(report.feed_bytes, written.len());
    assert!(report.uploaded_to.is_some());
    assert_eq!(notifier.messages(), vec!["Atom feed is ready.".to_string()]);
}

#[tokio::test]
async fn failed_run_publishes_nothing() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("feed.xml");
    let store = Arc::new(LocalStore::new(tmp.path().join("bucket")));
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(1))
            .with_page(listing_url(1, 1), "Access Denied!"),
    );
    let notifier = RecordingNotifier::default();

    let err = crawl_and_publish(
        &config(),
        &RunOptions {
            output: Some(output.clone()),
            upload: true,
        },
        Collaborators {
            site,
            store: store.clone(),
            notifier: Box::new(notifier.clone()),
            pacer: Pacer::disabled(),
        },
        run_time(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::AccessDenied { .. }));
    assert!(!output.exists());
    assert!(!store.exists("feed.xml").await.unwrap());
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Run failed"));
}

#[tokio::test]
async fn failed_upload_leaves_no_output_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("feed.xml");
    let store = Arc::new(MemoryStore::broken());
    let site = Arc::new(
        FakeSite::default()
            .with_page(landing_url(), landing(1))
            .with_page(listing_url(1, 1), row("Anime Series", 1, "Frieren"))
            .with_page(detail_url(1), profile(Some("5 Jan, 2020 [3:04 pm]"), None, &[])),
    );
    let notifier = RecordingNotifier::default();

    let err = crawl_and_publish(
        &config(),
        &RunOptions {
            output: Some(output.clone()),
            upload: true,
        },
        Collaborators {
            site,
            store: store.clone(),
            notifier: Box::new(notifier.clone()),
            pacer: Pacer::disabled(),
        },
        run_time(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Storage(StoreError::Backend(_))));
    assert_eq!(store.puts(), 1);
    assert!(!output.exists());
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("Run failed"));
}
