//! SVG parsing and grid composition.

mod composer;
mod document;

pub use composer::{grid_shape, ComposeError, GridLayout, SvgComposer};
pub use document::SvgDocument;
