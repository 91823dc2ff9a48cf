//! Preview namespace layout and file-type allow-lists.

/// Top-level folder for all project data in storage.
pub const PROJECTS_DIR: &str = "projects";

/// Folder under a project holding every generated preview asset.
pub const PREVIEW_DIR_NAME: &str = "previews";

pub const SCHEMATIC_DIR: &str = "schematics";
pub const LAYOUT_DIR: &str = "layouts";
pub const MODEL_DIR: &str = "models";
pub const PHOTO_DIR: &str = "photos";

/// Manifest filename, relative to the preview namespace.
pub const INDEX_FILENAME: &str = "index.json";

/// Extensions a published preview asset may carry. Anything else is never served.
pub const SAFE_ASSET_EXTENSIONS: &[&str] = &["svg", "glb", "png", "jpg", "jpeg", "webp"];

/// Design-source extensions that may land one level above the extraction root.
///
/// Changing this list changes the archive-extraction security boundary.
pub const SAFE_SOURCE_EXTENSIONS: &[&str] = &["kicad_sch", "kicad_pcb", "kicad_pro", "kicad_prl"];

/// Extensions collected into the `photos` collection.
pub const PHOTO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Only archives with this extension are accepted for upload.
pub const ARCHIVE_EXTENSION: &str = "zip";
