//! Repositories for the processing status field.
//!
//! `ProjectStatusRepository` is the seam the worker depends on. The Postgres
//! implementation is used by deployed services; the in-memory one backs local CLI runs
//! and tests.

pub mod memory;
pub mod project_status;

pub use memory::InMemoryProjectStatusRepository;
pub use project_status::{PgProjectStatusRepository, ProjectStatusRepository};
