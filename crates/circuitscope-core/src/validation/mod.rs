//! Validation of untrusted input.

pub mod path;

pub use path::{has_allowed_extension, sanitize_relative_path, PathError};
