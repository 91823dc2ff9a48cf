//! PhotoStage - copies photos shipped in the archive into the preview namespace.

use circuitscope_core::constants::PHOTO_DIR;
use circuitscope_core::models::PhotoEntry;
use std::path::Path;

use super::StageError;
use crate::archive::ExtractedTree;
use crate::naming::{slugify, UniqueNames};

#[derive(Debug, Clone, Copy, Default)]
pub struct PhotoStage;

impl PhotoStage {
    pub fn new() -> Self {
        Self
    }

    #[tracing::instrument(skip_all)]
    pub async fn collect(
        &self,
        tree: &ExtractedTree,
        publish_root: &Path,
    ) -> Result<Vec<PhotoEntry>, StageError> {
        if tree.photos.is_empty() {
            return Ok(Vec::new());
        }

        let output_dir = publish_root.join(PHOTO_DIR);
        tokio::fs::create_dir_all(&output_dir).await?;

        let mut names = UniqueNames::new();
        let mut entries = Vec::with_capacity(tree.photos.len());
        for photo in &tree.photos {
            let title = photo
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let extension = photo
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_ascii_lowercase()))
                .unwrap_or_default();
            let filename = names.claim(&slugify(&title, "photo"), &extension);

            tokio::fs::copy(photo, output_dir.join(&filename)).await?;
            entries.push(PhotoEntry {
                id: filename.trim_end_matches(extension.as_str()).to_string(),
                path: format!("{}/{}", PHOTO_DIR, filename),
                filename,
                title,
            });
        }

        Ok(entries)
    }
}
