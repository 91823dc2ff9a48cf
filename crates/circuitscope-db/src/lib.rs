//! CircuitScope persistence layer
//!
//! Only the slice of the project record the preview pipeline owns lives here: the
//! `processing_status` / `processing_error` columns.

pub mod db;

pub use db::{InMemoryProjectStatusRepository, PgProjectStatusRepository, ProjectStatusRepository};

/// Embedded migrations for the status columns.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
