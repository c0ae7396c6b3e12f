//! Local filesystem storage implementation.
//!
//! Mirrors objects into a directory tree for dry runs and tests. Production
//! deployments should use the S3 backend.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── animetorrents-feed.xml
//! └── animetorrents/
//!     └── YYYY/
//!         └── MM/
//!             └── cover.jpg
//! ```

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::storage::{ObjectStore, PutObject, StoreError, StoreResult};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a key, refusing keys that escape the root.
    fn path(&self, key: &str) -> StoreResult<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return Err(StoreError::Backend(format!("invalid object key '{key}'")));
        }
        Ok(self.root_dir.join(relative))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let path = self.path(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn put(&self, object: PutObject<'_>) -> StoreResult<()> {
        let path = self.path(object.key)?;
        self.write_bytes(&path, object.body).await?;
        log::debug!(
            "Stored {} bytes ({}) at {}",
            object.body.len(),
            object.content_type,
            path.display()
        );
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        self.root_dir.join(key).display().to_string()
    }
}
