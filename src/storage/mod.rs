//! Object storage for mirrored media and the published feed.
//!
//! Backends implement [`ObjectStore`]: a metadata-only existence check and a
//! single-object put. Everything above this seam (dedup, retry, public URLs)
//! is backend independent.
//!
//! ## Key Layout
//!
//! ```text
//! {bucket}/
//! ├── animetorrents-feed.xml        # Published Atom feed
//! └── {media_prefix}/               # Mirrored artwork
//!     └── {segment}/{segment}/{filename}
//! ```

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::{AppError, Result};
use crate::models::{StorageBackend, StorageConfig};

// Re-export for convenience
pub use local::LocalStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

/// Result type for backend calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure reported by a storage backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend asked us to slow down; safe to retry later
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Any other backend failure
    #[error("{0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, StoreError::RateLimited(_))
    }
}

/// A single object to write.
#[derive(Debug, Clone, Copy)]
pub struct PutObject<'a> {
    pub key: &'a str,
    pub body: &'a [u8],
    pub content_type: &'a str,
}

/// Trait for object storage backends.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether `key` exists without transferring its body.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Write an object, replacing any previous version.
    async fn put(&self, object: PutObject<'_>) -> StoreResult<()>;

    /// Human-readable location of a key, for logs.
    fn location(&self, key: &str) -> String;
}

/// Bounded linear backoff for rate-limited uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Attempt `n` is followed by a pause of `n` units
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_unit: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_unit,
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.upload_max_attempts,
            Duration::from_millis(config.upload_backoff_ms),
        )
    }

    /// Pause after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }
}

/// Put an object, retrying only while the backend reports rate limiting.
///
/// Returns the number of attempts used. Any other backend error is returned
/// immediately; a rate limit on the final attempt becomes
/// [`AppError::RateLimitExhausted`].
pub async fn put_with_retry(
    store: &dyn ObjectStore,
    object: PutObject<'_>,
    policy: &RetryPolicy,
) -> Result<u32> {
    let mut attempt = 1;
    loop {
        match store.put(object).await {
            Ok(()) => return Ok(attempt),
            Err(err) if err.is_rate_limited() => {
                if attempt >= policy.max_attempts {
                    return Err(AppError::RateLimitExhausted {
                        key: object.key.to_string(),
                        attempts: attempt,
                    });
                }
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "Upload of {} rate limited (attempt {}/{}), retrying in {:?}",
                    store.location(object.key),
                    attempt,
                    policy.max_attempts,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Open the configured backend.
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StorageBackend::Local => {
            log::info!("Using local storage at {}", config.local_dir);
            Ok(Arc::new(LocalStore::new(&config.local_dir)))
        }
        #[cfg(feature = "s3")]
        StorageBackend::S3 => {
            log::info!("Using S3 bucket {}", config.bucket);
            Ok(Arc::new(S3Store::from_config(config).await))
        }
        #[cfg(not(feature = "s3"))]
        StorageBackend::S3 => Err(AppError::config(
            "storage.backend = \"s3\" needs the `s3` feature",
        )),
    }
}

/// Public URL of a stored key, each key segment percent-encoded.
pub fn public_url(base_url: &str, key: &str) -> String {
    let path = key
        .trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}
