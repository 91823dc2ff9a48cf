//! CircuitScope Core Library
//!
//! Domain models, error types, configuration and path validation shared by every
//! CircuitScope crate. Nothing in here touches the filesystem or spawns processes.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
pub use validation::{has_allowed_extension, sanitize_relative_path, PathError};
