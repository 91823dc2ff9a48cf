//! CircuitScope background processing
//!
//! A run downloads a project archive, extracts it, renders previews, publishes assets
//! and the manifest, and records the outcome on the project's processing status.
//! [`ProcessingScheduler`] starts runs out-of-band; [`ProcessingOrchestrator`] is one
//! run; [`ProcessingStateMachine`] guards the persisted status.

pub mod error;
pub mod orchestrator;
pub mod scheduler;
pub mod state;

pub use error::ProcessingError;
pub use orchestrator::ProcessingOrchestrator;
pub use scheduler::{ProcessingScheduler, RunHandle};
pub use state::ProcessingStateMachine;
