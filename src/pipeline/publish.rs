// src/pipeline/publish.rs

//! Hand-off of the built feed to disk and object storage.

use std::path::Path;

use crate::error::Result;
use crate::services::feed::ATOM_CONTENT_TYPE;
use crate::storage::{ObjectStore, PutObject, RetryPolicy, put_with_retry};

/// Write the feed document to a local file, creating parent directories.
pub async fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    log::info!("Feed written to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Upload the feed under `key`; returns the stored location.
pub async fn upload_feed(
    store: &dyn ObjectStore,
    key: &str,
    bytes: &[u8],
    policy: &RetryPolicy,
) -> Result<String> {
    put_with_retry(
        store,
        PutObject {
            key,
            body: bytes,
            content_type: ATOM_CONTENT_TYPE,
        },
        policy,
    )
    .await?;

    let location = store.location(key);
    log::info!("Feed uploaded to {}", location);
    Ok(location)
}
