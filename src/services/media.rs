// src/services/media.rs

//! Artwork mirroring into owned storage.

use std::path::Path;
use std::sync::Arc;

use url::Url;

use crate::error::{AppError, Result};
use crate::models::{MediaAsset, StorageConfig};
use crate::services::session::SiteClient;
use crate::storage::{ObjectStore, PutObject, RetryPolicy, public_url, put_with_retry};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Copies remote assets into the object store, once per key.
pub struct MediaMirror {
    site: Arc<dyn SiteClient>,
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
    public_base_url: String,
    retry: RetryPolicy,
}

impl MediaMirror {
    pub fn new(site: Arc<dyn SiteClient>, store: Arc<dyn ObjectStore>, config: &StorageConfig) -> Self {
        Self {
            site,
            store,
            key_prefix: config.media_prefix.clone(),
            public_base_url: config.public_base_url.clone(),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Key and public URL for a source URL, without touching storage.
    pub fn asset_for(&self, source_url: &str) -> Result<MediaAsset> {
        let key = derive_key(&self.key_prefix, source_url)?;
        Ok(MediaAsset {
            source_url: source_url.to_string(),
            public_url: public_url(&self.public_base_url, &key),
            key,
        })
    }

    /// Mirror one asset and return where it is served from.
    ///
    /// An existing key short-circuits: nothing is fetched or uploaded.
    pub async fn mirror(&self, source_url: &str) -> Result<MediaAsset> {
        let asset = self.asset_for(source_url)?;

        if self.store.exists(&asset.key).await? {
            log::debug!("Already mirrored: {}", self.store.location(&asset.key));
            return Ok(asset);
        }

        log::info!("Mirroring {}", source_url);
        let fetched = self.site.get_asset(source_url).await?;
        let content_type = fetched
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| guess_content_type(&asset.key).to_string());

        let attempts = put_with_retry(
            self.store.as_ref(),
            PutObject {
                key: &asset.key,
                body: &fetched.bytes,
                content_type: &content_type,
            },
            &self.retry,
        )
        .await?;

        log::info!(
            "Stored {} ({} bytes, {} attempt(s))",
            self.store.location(&asset.key),
            fetched.bytes.len(),
            attempts
        );
        Ok(asset)
    }
}

/// Storage key for a media URL: the prefix plus the last three path segments.
///
/// Segments are percent-decoded, so the key names the file as the host
/// stores it (`my%20cover.jpg` becomes `my cover.jpg`).
pub fn derive_key(prefix: &str, source_url: &str) -> Result<String> {
    let url = Url::parse(source_url)?;
    let segments: Vec<String> = url
        .path_segments()
        .map(|s| {
            s.filter(|seg| !seg.is_empty())
                .map(|seg| {
                    String::from_utf8_lossy(&urlencoding::decode_binary(seg.as_bytes()))
                        .into_owned()
                })
                .collect()
        })
        .unwrap_or_default();

    if segments.len() < 3 {
        return Err(AppError::media_key(
            source_url,
            format!("path has {} segment(s), need at least 3", segments.len()),
        ));
    }

    let tail = segments[segments.len() - 3..].join("/");
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        Ok(tail)
    } else {
        Ok(format!("{prefix}/{tail}"))
    }
}

fn guess_content_type(key: &str) -> &'static str {
    let ext = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => FALLBACK_CONTENT_TYPE,
    }
}
