use crate::keys::normalize_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    public_base_url: Option<String>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/circuitscope")
    /// * `public_base_url` - Base URL the root is served under, if any
    pub async fn new(
        base_path: impl Into<PathBuf>,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            public_base_url: public_base_url.map(|u| u.trim_end_matches('/').to_string()),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// The key is sanitized lexically first. If the target already exists it is also
    /// canonicalized, so a symlink inside the storage root cannot point outside it.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        let key = normalize_key(storage_key)?;
        let path = self.base_path.join(&key);

        if let Ok(canonical) = path.canonicalize() {
            let base_canonical = self.base_path.canonicalize().map_err(|e| {
                StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
            })?;
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn save(
        &self,
        path: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<String> {
        let key = normalize_key(path)?;
        let target = self.key_to_path(&key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&target).await?;

        let mut file = fs::File::create(&target).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", target.display(), e))
        })?;

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write stream to file {}: {}",
                target.display(),
                e
            ))
        })?;

        file.flush().await?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", target.display(), e))
        })?;

        tracing::debug!(
            path = %target.display(),
            key = %key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage save successful"
        );

        Ok(key)
    }

    async fn upload(&self, path: &str, local_file: &Path) -> StorageResult<String> {
        let key = normalize_key(path)?;
        let target = self.key_to_path(&key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&target).await?;

        let size = fs::copy(local_file, &target).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to copy {} to {}: {}",
                local_file.display(),
                target.display(),
                e
            ))
        })?;

        tracing::debug!(
            from = %local_file.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(key)
    }

    async fn download(&self, path: &str, destination: &Path) -> StorageResult<()> {
        let source = self.key_to_path(path)?;

        if !fs::try_exists(&source).await.unwrap_or(false) {
            return Err(StorageError::NotFound(path.to_string()));
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::copy(&source, destination).await.map_err(|e| {
            StorageError::DownloadFailed(format!(
                "Failed to copy {} to {}: {}",
                source.display(),
                destination.display(),
                e
            ))
        })?;

        Ok(())
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let source = self.key_to_path(path)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&source).await.unwrap_or(false) {
            return Err(StorageError::NotFound(path.to_string()));
        }

        let data = fs::read(&source).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", source.display(), e))
        })?;

        tracing::debug!(
            path = %source.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage read successful"
        );

        Ok(data)
    }

    async fn delete(&self, path: &str) -> StorageResult<()> {
        let target = self.key_to_path(path)?;

        if !fs::try_exists(&target).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&target).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", target.display(), e))
        })?;

        tracing::debug!(path = %target.display(), "Local storage delete successful");

        Ok(())
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        let target = self.key_to_path(path)?;
        Ok(fs::try_exists(&target).await.unwrap_or(false))
    }

    async fn get_url(&self, path: &str) -> StorageResult<Option<String>> {
        let key = normalize_key(path)?;
        Ok(self
            .public_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base, key)))
    }

    fn filesystem_path(&self, path: &str) -> StorageResult<PathBuf> {
        self.key_to_path(path)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
