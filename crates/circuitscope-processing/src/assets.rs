//! Read side of the preview namespace, plus archive persistence.
//!
//! Client-supplied asset paths are sanitized before any storage call; every rejection
//! surfaces as not-found.

use circuitscope_core::constants::{ARCHIVE_EXTENSION, SAFE_ASSET_EXTENSIONS};
use circuitscope_core::models::{PreviewIndex, PreviewSummary};
use circuitscope_core::{has_allowed_extension, sanitize_relative_path, AppError, PathError};
use circuitscope_storage::keys::{archive_key, preview_asset_key, preview_index_key};
use circuitscope_storage::{Storage, StorageError};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Archive of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for AssetError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AssetError::NotFound(key),
            other => AssetError::Storage(other),
        }
    }
}

impl From<AssetError> for AppError {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::InvalidPath(e) => AppError::from(e),
            AssetError::NotFound(what) => AppError::NotFound(what),
            AssetError::InvalidArchive(msg) => AppError::InvalidInput(msg),
            e @ AssetError::TooLarge { .. } => AppError::PayloadTooLarge(e.to_string()),
            AssetError::Storage(e) => AppError::Storage(e.to_string()),
        }
    }
}

/// Load a project's manifest.
///
/// A missing manifest is `NotFound`. A manifest that exists but does not parse is
/// logged and treated as empty.
#[tracing::instrument(skip(storage))]
pub async fn load_preview_index(
    storage: &dyn Storage,
    project_id: Uuid,
) -> Result<PreviewIndex, AssetError> {
    let bytes = match storage.read(&preview_index_key(project_id)).await {
        Ok(bytes) => bytes,
        Err(StorageError::NotFound(_)) => {
            return Err(AssetError::NotFound("Preview index not found".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice(&bytes) {
        Ok(index) => Ok(index),
        Err(e) => {
            tracing::error!(project_id = %project_id, error = %e, "Failed to parse preview index");
            Ok(PreviewIndex::default())
        }
    }
}

/// Asset paths per collection plus project metadata, for listings.
pub async fn list_previews_summary(
    storage: &dyn Storage,
    project_id: Uuid,
) -> Result<PreviewSummary, AssetError> {
    Ok(load_preview_index(storage, project_id).await?.summary())
}

/// Resolve a client-supplied asset path to its storage key.
///
/// The path must sanitize cleanly, carry a safe extension, be listed in the current
/// manifest and exist. Objects left in storage by an unpublished run are not served.
#[tracing::instrument(skip(storage))]
pub async fn resolve_preview_asset(
    storage: &dyn Storage,
    project_id: Uuid,
    asset_path: &str,
) -> Result<String, AssetError> {
    let clean = sanitize_relative_path(asset_path)?;
    if !has_allowed_extension(&clean, SAFE_ASSET_EXTENSIONS) {
        return Err(AssetError::NotFound("Unsupported asset type".to_string()));
    }

    let index = load_preview_index(storage, project_id).await?;
    if !index.asset_paths().iter().any(|p| *p == clean) {
        return Err(AssetError::NotFound(clean));
    }

    let key = preview_asset_key(project_id, &clean)?;
    if !storage.exists(&key).await? {
        return Err(AssetError::NotFound(clean));
    }
    Ok(key)
}

/// Persist an uploaded archive at `projects/{id}/{filename}` and return its key.
#[tracing::instrument(skip(storage, bytes), fields(size = bytes.len()))]
pub async fn store_project_archive(
    storage: &dyn Storage,
    project_id: Uuid,
    filename: &str,
    bytes: Vec<u8>,
    max_bytes: u64,
) -> Result<String, AssetError> {
    let is_zip = filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
    if !is_zip {
        return Err(AssetError::InvalidArchive(format!(
            "expected a .{} file, got {}",
            ARCHIVE_EXTENSION, filename
        )));
    }

    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(AssetError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let key = archive_key(project_id, filename)?;
    let stored = storage.save_bytes(&key, bytes).await?;
    tracing::info!(project_id = %project_id, key = %stored, "Project archive stored");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuitscope_core::models::LayoutEntry;
    use circuitscope_core::ErrorMetadata;
    use circuitscope_storage::LocalStorage;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_missing_index_is_not_found() {
        let (_dir, storage) = storage().await;
        let err = load_preview_index(&storage, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
        assert_eq!(AppError::from(err).to_string(), "Not found: Preview index not found");
    }

    #[tokio::test]
    async fn test_corrupt_index_is_empty() {
        let (_dir, storage) = storage().await;
        let id = Uuid::new_v4();
        storage
            .save_bytes(&preview_index_key(id), b"{oops".to_vec())
            .await
            .unwrap();
        let index = load_preview_index(&storage, id).await.unwrap();
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_summary() {
        let (_dir, storage) = storage().await;
        let id = Uuid::new_v4();
        let index = PreviewIndex {
            layouts: vec![LayoutEntry {
                id: "front".to_string(),
                filename: "front.svg".to_string(),
                title: "Front copper".to_string(),
                layers: vec!["F.Cu".to_string()],
                path: "layouts/front.svg".to_string(),
            }],
            ..Default::default()
        };
        crate::index::publish_index(&storage, id, &index).await.unwrap();

        let summary = list_previews_summary(&storage, id).await.unwrap();
        assert_eq!(summary.layouts, vec!["layouts/front.svg".to_string()]);
        assert!(summary.schematics.is_empty());
    }

    fn front_layout() -> LayoutEntry {
        LayoutEntry {
            id: "front".to_string(),
            filename: "front.svg".to_string(),
            title: "Front copper".to_string(),
            layers: vec!["F.Cu".to_string()],
            path: "layouts/front.svg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_resolve_asset() {
        let (_dir, storage) = storage().await;
        let id = Uuid::new_v4();
        let index = PreviewIndex {
            layouts: vec![front_layout()],
            ..Default::default()
        };
        crate::index::publish_index(&storage, id, &index).await.unwrap();
        let key = preview_asset_key(id, "layouts/front.svg").unwrap();
        storage.save_bytes(&key, b"<svg/>".to_vec()).await.unwrap();
        storage
            .save_bytes(&preview_asset_key(id, "notes.txt").unwrap(), b"x".to_vec())
            .await
            .unwrap();

        assert_eq!(
            resolve_preview_asset(&storage, id, "layouts/./front.svg")
                .await
                .unwrap(),
            key
        );
        assert!(matches!(
            resolve_preview_asset(&storage, id, "layouts/back.svg").await,
            Err(AssetError::NotFound(_))
        ));
        assert!(matches!(
            resolve_preview_asset(&storage, id, "notes.txt").await,
            Err(AssetError::NotFound(_))
        ));
        for evil in ["../index.json", "layouts/../../x.svg", "/etc/passwd.svg"] {
            let err = resolve_preview_asset(&storage, id, evil).await.unwrap_err();
            assert!(matches!(err, AssetError::InvalidPath(_)));
            assert_eq!(AppError::from(err).http_status_code(), 404);
        }
    }

    #[tokio::test]
    async fn test_resolve_asset_outside_manifest_is_not_found() {
        let (_dir, storage) = storage().await;
        let id = Uuid::new_v4();
        crate::index::publish_index(&storage, id, &PreviewIndex::default())
            .await
            .unwrap();
        let orphan = preview_asset_key(id, "schematics/orphan.svg").unwrap();
        storage.save_bytes(&orphan, b"<svg/>".to_vec()).await.unwrap();

        let err = resolve_preview_asset(&storage, id, "schematics/orphan.svg")
            .await
            .unwrap_err();
        assert!(matches!(err, AssetError::NotFound(ref p) if p == "schematics/orphan.svg"));
    }

    #[tokio::test]
    async fn test_resolve_asset_without_manifest_is_not_found() {
        let (_dir, storage) = storage().await;
        let id = Uuid::new_v4();
        let key = preview_asset_key(id, "layouts/front.svg").unwrap();
        storage.save_bytes(&key, b"<svg/>".to_vec()).await.unwrap();

        assert!(matches!(
            resolve_preview_asset(&storage, id, "layouts/front.svg").await,
            Err(AssetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_listed_asset_missing_from_storage() {
        let (_dir, storage) = storage().await;
        let id = Uuid::new_v4();
        let index = PreviewIndex {
            layouts: vec![front_layout()],
            ..Default::default()
        };
        crate::index::publish_index(&storage, id, &index).await.unwrap();

        assert!(matches!(
            resolve_preview_asset(&storage, id, "layouts/front.svg").await,
            Err(AssetError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_store_archive() {
        let (_dir, storage) = storage().await;
        let id = Uuid::new_v4();

        let key = store_project_archive(&storage, id, "../Amp.ZIP", b"PK".to_vec(), 1024)
            .await
            .unwrap();
        assert_eq!(key, format!("projects/{}/Amp.ZIP", id));
        assert_eq!(storage.read(&key).await.unwrap(), b"PK");

        assert!(matches!(
            store_project_archive(&storage, id, "amp.rar", vec![], 1024).await,
            Err(AssetError::InvalidArchive(_))
        ));
        assert!(matches!(
            store_project_archive(&storage, id, "amp.zip", vec![0; 2048], 1024).await,
            Err(AssetError::TooLarge { .. })
        ));
    }
}
