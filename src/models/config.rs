//! Application configuration structures.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Target site layout
    #[serde(default)]
    pub site: SiteConfig,

    /// Login credentials
    #[serde(default)]
    pub credentials: Credentials,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Object storage for mirrored media and the feed
    #[serde(default)]
    pub storage: StorageConfig,

    /// Feed metadata
    #[serde(default)]
    pub feed: FeedConfig,

    /// Notification webhook
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration, or the defaults if the file does not exist.
    ///
    /// A file that exists but cannot be read or parsed is an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No config file at {:?}. Using defaults.", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Apply secrets from the environment on top of the file values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(username) = non_empty("ANIFEED_USERNAME") {
            self.credentials.username = username;
        }
        if let Some(password) = non_empty("ANIFEED_PASSWORD") {
            self.credentials.password = password;
        }
        if let Some(key) = non_empty("ANIFEED_STORAGE_KEY") {
            self.storage.access_key = key;
        }
        if let Some(secret) = non_empty("ANIFEED_STORAGE_SECRET") {
            self.storage.secret_key = secret;
        }
        if let Some(webhook) = non_empty("ANIFEED_SLACK_WEBHOOK") {
            self.notify.slack_webhook_url = webhook;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.site.base_url.trim().is_empty() {
            return Err(AppError::validation("site.base_url is empty"));
        }
        url::Url::parse(&self.site.base_url)?;
        if self.site.listing_path.trim().is_empty() {
            return Err(AppError::validation("site.listing_path is empty"));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.pages_to_scan == 0 {
            return Err(AppError::validation("crawler.pages_to_scan must be > 0"));
        }
        if self.crawler.min_delay_secs > self.crawler.max_delay_secs {
            return Err(AppError::validation(
                "crawler.min_delay_secs must not exceed crawler.max_delay_secs",
            ));
        }
        if self.storage.upload_max_attempts == 0 {
            return Err(AppError::validation(
                "storage.upload_max_attempts must be > 0",
            ));
        }
        if self.storage.public_base_url.trim().is_empty() {
            return Err(AppError::validation("storage.public_base_url is empty"));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.trim().is_empty() {
            return Err(AppError::validation("storage.bucket is empty"));
        }
        Ok(())
    }

    /// Self link of the published feed.
    pub fn feed_self_link(&self) -> String {
        if self.feed.self_link.trim().is_empty() {
            format!(
                "{}/{}",
                self.storage.public_base_url.trim_end_matches('/'),
                self.storage.feed_key
            )
        } else {
            self.feed.self_link.clone()
        }
    }
}

/// Target site endpoints and content policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Scheme and host of the tracker
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Script name under `ajax/` serving listing pages
    #[serde(default = "defaults::listing_path")]
    pub listing_path: String,

    /// URL prefix under which cover and screenshot images live
    #[serde(default = "defaults::asset_prefix")]
    pub asset_prefix: String,

    /// Categories never syndicated (substring match)
    #[serde(default = "defaults::excluded_categories")]
    pub excluded_categories: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            listing_path: defaults::listing_path(),
            asset_prefix: defaults::asset_prefix(),
            excluded_categories: defaults::excluded_categories(),
        }
    }
}

impl SiteConfig {
    pub fn login_url(&self) -> String {
        format!("{}/login.php", self.base())
    }

    pub fn landing_url(&self) -> String {
        format!("{}/torrents.php", self.base())
    }

    pub fn listing_url(&self, total: u32, page: u32) -> String {
        format!(
            "{}/ajax/{}?total={}&page={}",
            self.base(),
            self.listing_path,
            total,
            page
        )
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Login credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Automatic retries for idempotent GETs
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay between GET retries in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Number of listing pages to walk
    #[serde(default = "defaults::pages_to_scan")]
    pub pages_to_scan: u32,

    /// Lower bound of the anti-hammer pause
    #[serde(default = "defaults::min_delay")]
    pub min_delay_secs: u64,

    /// Upper bound (exclusive) of the anti-hammer pause
    #[serde(default = "defaults::max_delay")]
    pub max_delay_secs: u64,

    /// Abort when the landing page carries no pagination total
    #[serde(default = "defaults::strict_page_total")]
    pub strict_page_total: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
            pages_to_scan: defaults::pages_to_scan(),
            min_delay_secs: defaults::min_delay(),
            max_delay_secs: defaults::max_delay(),
            strict_page_total: defaults::strict_page_total(),
        }
    }
}

/// Which object store receives media and the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Local,
}

/// Object storage settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// S3-compatible endpoint URL (empty for AWS defaults)
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    #[serde(default = "defaults::region")]
    pub region: String,

    #[serde(default = "defaults::bucket")]
    pub bucket: String,

    #[serde(default)]
    pub access_key: String,

    #[serde(default)]
    pub secret_key: String,

    /// Public URL under which stored keys are served
    #[serde(default = "defaults::public_base_url")]
    pub public_base_url: String,

    /// Key prefix for mirrored media
    #[serde(default = "defaults::media_prefix")]
    pub media_prefix: String,

    /// Object key of the published feed
    #[serde(default = "defaults::feed_key")]
    pub feed_key: String,

    /// Root directory for the local backend
    #[serde(default = "defaults::local_dir")]
    pub local_dir: String,

    /// Upload attempts before a rate limit becomes fatal
    #[serde(default = "defaults::upload_max_attempts")]
    pub upload_max_attempts: u32,

    /// Backoff unit in milliseconds; attempt `n` waits `n` units
    #[serde(default = "defaults::upload_backoff")]
    pub upload_backoff_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            endpoint: defaults::endpoint(),
            region: defaults::region(),
            bucket: defaults::bucket(),
            access_key: String::new(),
            secret_key: String::new(),
            public_base_url: defaults::public_base_url(),
            media_prefix: defaults::media_prefix(),
            feed_key: defaults::feed_key(),
            local_dir: defaults::local_dir(),
            upload_max_attempts: defaults::upload_max_attempts(),
            upload_backoff_ms: defaults::upload_backoff(),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("public_base_url", &self.public_base_url)
            .field("media_prefix", &self.media_prefix)
            .field("feed_key", &self.feed_key)
            .field("upload_max_attempts", &self.upload_max_attempts)
            .finish_non_exhaustive()
    }
}

/// Feed header fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "defaults::feed_title")]
    pub title: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub author_uri: String,
    #[serde(default)]
    pub self_link: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: defaults::feed_title(),
            author_name: String::new(),
            author_email: String::new(),
            author_uri: String::new(),
            self_link: String::new(),
        }
    }
}

/// Chat webhook settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Slack-compatible incoming webhook; empty disables delivery
    #[serde(default)]
    pub slack_webhook_url: String,

    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            slack_webhook_url: String::new(),
            timeout_secs: defaults::timeout(),
        }
    }
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("webhook_configured", &!self.slack_webhook_url.is_empty())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

mod defaults {
    // Site defaults
    pub fn base_url() -> String {
        "https://animetorrents.me".into()
    }
    pub fn listing_path() -> String {
        "torrents_data.php".into()
    }
    pub fn asset_prefix() -> String {
        "https://animetorrents.me/imghost/".into()
    }
    pub fn excluded_categories() -> Vec<String> {
        vec!["Manga".into(), "Novel".into(), "Doujin".into()]
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; anifeed/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        5
    }
    pub fn retry_delay() -> u64 {
        500
    }
    pub fn pages_to_scan() -> u32 {
        3
    }
    pub fn min_delay() -> u64 {
        1
    }
    pub fn max_delay() -> u64 {
        5
    }
    pub fn strict_page_total() -> bool {
        true
    }

    // Storage defaults
    pub fn endpoint() -> String {
        "https://ams3.digitaloceanspaces.com".into()
    }
    pub fn region() -> String {
        "eu-west-1".into()
    }
    pub fn bucket() -> String {
        "ikon".into()
    }
    pub fn public_base_url() -> String {
        "https://ikon.ams3.digitaloceanspaces.com".into()
    }
    pub fn media_prefix() -> String {
        "animetorrents".into()
    }
    pub fn feed_key() -> String {
        "animetorrents-feed.xml".into()
    }
    pub fn local_dir() -> String {
        "storage".into()
    }
    pub fn upload_max_attempts() -> u32 {
        5
    }
    pub fn upload_backoff() -> u64 {
        1000
    }

    // Feed defaults
    pub fn feed_title() -> String {
        "Animetorrents.me feed".into()
    }
}
