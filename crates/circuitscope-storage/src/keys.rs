//! Storage key layout for project archives and the preview namespace.
//!
//! `projects/{project_id}/{archive}` holds the uploaded archive and
//! `projects/{project_id}/previews/...` every generated asset plus `index.json`.

use circuitscope_core::constants::{INDEX_FILENAME, PREVIEW_DIR_NAME, PROJECTS_DIR};
use circuitscope_core::{sanitize_relative_path, PathError};
use uuid::Uuid;

/// Normalize a key, rejecting traversal and absolute paths.
pub fn normalize_key(key: &str) -> Result<String, PathError> {
    sanitize_relative_path(key)
}

pub fn project_prefix(project_id: Uuid) -> String {
    format!("{}/{}", PROJECTS_DIR, project_id)
}

/// Prefix of the preview namespace, without a trailing slash.
pub fn preview_prefix(project_id: Uuid) -> String {
    format!("{}/{}", project_prefix(project_id), PREVIEW_DIR_NAME)
}

pub fn preview_index_key(project_id: Uuid) -> String {
    format!("{}/{}", preview_prefix(project_id), INDEX_FILENAME)
}

/// Key of an asset given its manifest-relative path. The relative path is sanitized.
pub fn preview_asset_key(project_id: Uuid, relative: &str) -> Result<String, PathError> {
    let clean = sanitize_relative_path(relative)?;
    Ok(format!("{}/{}", preview_prefix(project_id), clean))
}

/// Key of an uploaded archive. Only the final path component of `filename` is kept.
pub fn archive_key(project_id: Uuid, filename: &str) -> Result<String, PathError> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let clean = sanitize_relative_path(base)?;
    Ok(format!("{}/{}", project_prefix(project_id), clean))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_keys() {
        let id = Uuid::nil();
        assert_eq!(
            preview_index_key(id),
            "projects/00000000-0000-0000-0000-000000000000/previews/index.json"
        );
        assert_eq!(
            preview_asset_key(id, "layouts/front.svg").unwrap(),
            "projects/00000000-0000-0000-0000-000000000000/previews/layouts/front.svg"
        );
        assert!(preview_asset_key(id, "../index.json").is_err());
        assert!(preview_asset_key(id, "/etc/passwd").is_err());
    }

    #[test]
    fn test_archive_key_strips_directories() {
        let id = Uuid::nil();
        assert_eq!(
            archive_key(id, "../../evil/board.zip").unwrap(),
            "projects/00000000-0000-0000-0000-000000000000/board.zip"
        );
        assert!(archive_key(id, "..").is_err());
    }
}
