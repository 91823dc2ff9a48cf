//! External rendering tool orchestration.

pub mod kicad;
mod renderer;

pub use kicad::{LayerSpec, BOARD_LAYER_SPECS};
pub use renderer::{ExternalRenderer, RenderError};
