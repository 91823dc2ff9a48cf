pub mod preview;
pub mod project;

pub use preview::{
    ComposedSchematic, LayoutEntry, ModelEntry, PhotoEntry, PreviewIndex, PreviewSummary,
    ProjectMetadata, SchematicEntry, SchematicPage,
};
pub use project::{ProcessingState, ProcessingStatus};
