//! CircuitScope Storage Library
//!
//! Byte-storage abstraction used by the preview pipeline, with local-filesystem and
//! S3-compatible implementations.
//!
//! # Key format
//!
//! Keys are relative, `/`-separated paths. Project data lives under
//! `projects/{project_id}/`; generated previews under `projects/{project_id}/previews/`.
//! Every key passes through `circuitscope_core::sanitize_relative_path` before a backend
//! touches it, so `..` segments and absolute keys are rejected with
//! [`StorageError::InvalidKey`].

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use circuitscope_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
