//! Untrusted archive handling: zip-slip safe extraction and design-source discovery.

mod discovery;
mod extractor;

pub use discovery::ExtractedTree;
pub use extractor::{ArchiveExtractor, ExtractError, ExtractLimits, ExtractReport};
