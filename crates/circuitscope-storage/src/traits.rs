//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use circuitscope_core::PathError;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Operation not supported by {backend} storage: {operation}")]
    Unsupported {
        backend: StorageBackend,
        operation: &'static str,
    },

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<PathError> for StorageError {
    fn from(err: PathError) -> Self {
        StorageError::InvalidKey(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte-storage collaborator for the preview pipeline.
///
/// All paths are relative keys (see the crate docs). Methods returning a path return
/// the normalized key the object was stored under.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist everything the reader yields under `path`, replacing any existing object.
    async fn save(
        &self,
        path: &str,
        reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<String>;

    /// Persist an in-memory buffer under `path`.
    async fn save_bytes(&self, path: &str, data: Vec<u8>) -> StorageResult<String> {
        let reader = Box::pin(std::io::Cursor::new(data)) as Pin<Box<dyn AsyncRead + Send + Unpin>>;
        self.save(path, reader).await
    }

    /// Copy a local file into storage under `path`.
    async fn upload(&self, path: &str, local_file: &Path) -> StorageResult<String>;

    /// Copy the object at `path` to a local file, creating parent directories.
    async fn download(&self, path: &str, destination: &Path) -> StorageResult<()>;

    /// Read the whole object at `path`.
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Remove the object at `path`. Missing objects are not an error.
    async fn delete(&self, path: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Public or presigned URL for the object, if the backend can produce one.
    async fn get_url(&self, path: &str) -> StorageResult<Option<String>>;

    /// Concrete filesystem location of `path`.
    ///
    /// Only local backends support this; others fail with [`StorageError::Unsupported`].
    fn filesystem_path(&self, path: &str) -> StorageResult<PathBuf>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
