//! PreviewIndexBuilder - assembles the manifest from stage results and publishes it.

use circuitscope_core::constants::SAFE_ASSET_EXTENSIONS;
use circuitscope_core::models::{
    LayoutEntry, ModelEntry, PhotoEntry, PreviewIndex, ProjectMetadata, SchematicEntry,
};
use circuitscope_core::{has_allowed_extension, sanitize_relative_path};
use circuitscope_storage::keys::preview_index_key;
use circuitscope_storage::{Storage, StorageError, StorageResult};
use uuid::Uuid;

/// Manifest builder. Stages hand their results in; nothing is visible until
/// [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct PreviewIndexBuilder {
    project: ProjectMetadata,
    schematics: Vec<SchematicEntry>,
    layouts: Vec<LayoutEntry>,
    models: Vec<ModelEntry>,
    photos: Vec<PhotoEntry>,
}

fn is_publishable(path: &str) -> bool {
    sanitize_relative_path(path).is_ok_and(|clean| clean == path)
        && has_allowed_extension(path, SAFE_ASSET_EXTENSIONS)
}

fn keep_publishable<T>(entries: Vec<T>, paths: impl Fn(&T) -> Vec<&str>, kind: &str) -> Vec<T> {
    entries
        .into_iter()
        .filter(|entry| {
            let ok = paths(entry).into_iter().all(is_publishable);
            if !ok {
                tracing::warn!(kind, "Dropping manifest entry with an unpublishable path");
            }
            ok
        })
        .collect()
}

impl PreviewIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, metadata: ProjectMetadata) -> Self {
        self.project = metadata;
        self
    }

    pub fn schematic(mut self, entry: SchematicEntry) -> Self {
        self.schematics.push(entry);
        self
    }

    pub fn layouts(mut self, entries: Vec<LayoutEntry>) -> Self {
        self.layouts.extend(entries);
        self
    }

    pub fn model(mut self, entry: ModelEntry) -> Self {
        self.models.push(entry);
        self
    }

    pub fn photos(mut self, entries: Vec<PhotoEntry>) -> Self {
        self.photos.extend(entries);
        self
    }

    /// Finish the manifest. Entries whose paths are not normalized relative paths with a
    /// safe extension are dropped.
    pub fn build(self) -> PreviewIndex {
        PreviewIndex {
            project: self.project,
            schematics: keep_publishable(
                self.schematics,
                |s| {
                    let mut paths = vec![s.path.as_str()];
                    paths.extend(s.pages.iter().map(|p| p.path.as_str()));
                    paths.extend(s.composed.iter().map(|c| c.path.as_str()));
                    paths
                },
                "schematic",
            ),
            layouts: keep_publishable(self.layouts, |l| vec![l.path.as_str()], "layout"),
            models: keep_publishable(self.models, |m| vec![m.path.as_str()], "model"),
            photos: keep_publishable(self.photos, |p| vec![p.path.as_str()], "photo"),
        }
    }
}

/// Stable JSON form of a manifest.
pub fn index_to_json(index: &PreviewIndex) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec_pretty(index)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write `index` to `projects/{id}/previews/index.json`, replacing any previous one.
#[tracing::instrument(skip(storage, index))]
pub async fn publish_index(
    storage: &dyn Storage,
    project_id: Uuid,
    index: &PreviewIndex,
) -> StorageResult<String> {
    let bytes = index_to_json(index).map_err(|e| StorageError::UploadFailed(e.to_string()))?;
    storage.save_bytes(&preview_index_key(project_id), bytes).await
}
