//! Project metadata from the `.kicad_pro` file.

use circuitscope_core::models::ProjectMetadata;
use serde_json::Value;
use std::path::Path;

fn field(object: &Value, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract title block fields from project-file JSON.
///
/// Looks in `metadata.title_block`, then `metadata`, then `meta`. Missing fields stay
/// absent.
pub fn parse_project_metadata(content: &str, source: &str) -> ProjectMetadata {
    let data: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(source, error = %e, "Unable to parse project metadata");
            return ProjectMetadata::default();
        }
    };

    let metadata = data
        .get("metadata")
        .filter(|v| v.is_object())
        .or_else(|| data.get("meta").filter(|v| v.is_object()));
    let Some(metadata) = metadata else {
        return ProjectMetadata {
            source: Some(source.to_string()),
            ..Default::default()
        };
    };

    let block = metadata
        .get("title_block")
        .filter(|v| v.is_object())
        .unwrap_or(metadata);

    ProjectMetadata {
        source: Some(source.to_string()),
        title: field(block, "title"),
        company: field(block, "company"),
        revision: field(block, "revision"),
        date: field(block, "date"),
    }
}

/// Read project metadata from `project_file`. Any failure yields empty metadata.
pub async fn read_project_metadata(project_file: &Path, source: &str) -> ProjectMetadata {
    match tokio::fs::read_to_string(project_file).await {
        Ok(content) => parse_project_metadata(&content, source),
        Err(e) => {
            tracing::debug!(source, error = %e, "Unable to read project metadata");
            ProjectMetadata::default()
        }
    }
}
