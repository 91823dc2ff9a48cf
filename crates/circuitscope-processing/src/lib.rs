//! CircuitScope preview processing
//!
//! Turns an extracted KiCad project into publishable preview assets: archive
//! extraction, `kicad-cli` orchestration, SVG grid composition, the per-kind render
//! stages and the `index.json` manifest. Also hosts the read side used when serving
//! assets back to clients.

pub mod archive;
pub mod assets;
pub mod index;
pub mod metadata;
pub mod naming;
pub mod render;
pub mod stages;
pub mod svg;

pub use archive::{ArchiveExtractor, ExtractError, ExtractLimits, ExtractedTree};
pub use assets::{
    list_previews_summary, load_preview_index, resolve_preview_asset, store_project_archive,
    AssetError,
};
pub use index::{index_to_json, publish_index, PreviewIndexBuilder};
pub use metadata::read_project_metadata;
pub use render::{ExternalRenderer, RenderError};
pub use stages::{BoardRenderStage, PhotoStage, SchematicRenderStage, StageError};
pub use svg::{ComposeError, GridLayout, SvgComposer, SvgDocument};
