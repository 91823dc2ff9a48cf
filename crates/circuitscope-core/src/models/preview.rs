//! Preview manifest (`index.json`) shape.
//!
//! Every `path` is relative to the project's preview namespace
//! (`projects/{id}/previews/`) and carries one of the safe asset extensions.

use serde::{Deserialize, Serialize};

/// Best-effort metadata read from the design's project file. Unknown fields stay absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl ProjectMetadata {
    pub fn is_empty(&self) -> bool {
        self == &ProjectMetadata::default()
    }
}

/// One exported schematic sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchematicPage {
    pub id: String,
    pub filename: String,
    pub title: String,
    pub page: u32,
    pub path: String,
}

/// All sheets tiled into one drawing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedSchematic {
    pub id: String,
    pub filename: String,
    pub title: String,
    pub path: String,
    pub columns: u32,
    pub rows: u32,
}

/// The single top-level schematic entry. `path`, `filename` and `title` mirror the
/// representative asset: the composed grid when there is one, otherwise the lone page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchematicEntry {
    pub id: String,
    pub filename: String,
    pub title: String,
    pub path: String,
    pub page_count: u32,
    pub multi_page: bool,
    pub pages: Vec<SchematicPage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composed: Option<ComposedSchematic>,
    /// Every schematic source discovered in the archive, relative to the archive root.
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub id: String,
    pub filename: String,
    pub title: String,
    pub layers: Vec<String>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub filename: String,
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoEntry {
    pub id: String,
    pub filename: String,
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewIndex {
    #[serde(default)]
    pub project: ProjectMetadata,
    #[serde(default)]
    pub schematics: Vec<SchematicEntry>,
    #[serde(default)]
    pub layouts: Vec<LayoutEntry>,
    #[serde(default)]
    pub models: Vec<ModelEntry>,
    #[serde(default)]
    pub photos: Vec<PhotoEntry>,
}

impl PreviewIndex {
    /// Every distinct asset path the manifest references, in manifest order.
    pub fn asset_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        let mut push = |p: &str| {
            if !paths.iter().any(|existing| existing == p) {
                paths.push(p.to_string());
            }
        };

        for schematic in &self.schematics {
            push(&schematic.path);
            for page in &schematic.pages {
                push(&page.path);
            }
            if let Some(composed) = &schematic.composed {
                push(&composed.path);
            }
        }
        for layout in &self.layouts {
            push(&layout.path);
        }
        for model in &self.models {
            push(&model.path);
        }
        for photo in &self.photos {
            push(&photo.path);
        }
        paths
    }

    pub fn is_empty(&self) -> bool {
        self.schematics.is_empty()
            && self.layouts.is_empty()
            && self.models.is_empty()
            && self.photos.is_empty()
    }

    pub fn summary(&self) -> PreviewSummary {
        PreviewSummary {
            project: self.project.clone(),
            schematics: self.schematics.iter().map(|e| e.path.clone()).collect(),
            layouts: self.layouts.iter().map(|e| e.path.clone()).collect(),
            models: self.models.iter().map(|e| e.path.clone()).collect(),
            photos: self.photos.iter().map(|e| e.path.clone()).collect(),
        }
    }
}

/// Condensed view of a manifest for project listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSummary {
    pub project: ProjectMetadata,
    pub schematics: Vec<String>,
    pub layouts: Vec<String>,
    pub models: Vec<String>,
    pub photos: Vec<String>,
}
