use std::path::{Path, PathBuf};

use super::{sanitize_key, KeyValueStore};
use crate::error::{OfpptError, Result};

/// Key-value store backed by one JSON file per key.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a store under the default data directory (~/.local/share/ofppt/storage/ on Linux).
    pub fn new() -> Result<Self> {
        Self::with_dir(Self::default_dir()?)
    }

    /// Create a store rooted at a custom directory (useful for testing)
    pub fn with_dir(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir).map_err(|e| {
            OfpptError::storage(format!("Failed to create storage directory: {}", e))
        })?;
        Ok(Self { base_dir })
    }

    pub fn default_dir() -> Result<PathBuf> {
        let data = dirs::data_dir().ok_or_else(|| {
            OfpptError::Config("Could not determine data directory".to_string())
        })?;
        Ok(data.join("ofppt").join("storage"))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Write `contents` to `path` through a temporary sibling so readers never see a partial file.
pub(crate) async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(|e| {
        OfpptError::storage(format!("Failed to write temporary file: {}", e))
    })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| OfpptError::storage(format!("Failed to rename file: {}", e)))
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.entry_path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OfpptError::storage(format!(
                "Failed to read '{}': {}",
                key, e
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        write_atomic(&self.entry_path(key), value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OfpptError::storage(format!(
                "Failed to remove '{}': {}",
                key, e
            ))),
        }
    }
}
