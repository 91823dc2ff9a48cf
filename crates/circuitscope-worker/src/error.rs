use circuitscope_core::models::ProcessingStatus;
use circuitscope_core::AppError;
use uuid::Uuid;

/// Errors from scheduling or bookkeeping a run. Failures inside a run are not
/// returned here; they end up as the `failed` status and its message.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("Invalid status transition for project {project_id}: {from} -> {to}")]
    InvalidTransition {
        project_id: Uuid,
        from: ProcessingStatus,
        to: ProcessingStatus,
    },

    #[error("Status repository error: {0}")]
    Repository(#[from] AppError),

    #[error("Processing scheduler is shut down")]
    Shutdown,
}

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::ProjectNotFound(id) => AppError::NotFound(format!("project {}", id)),
            ProcessingError::InvalidTransition {
                project_id,
                from,
                to,
            } => AppError::InvalidTransition {
                project_id,
                from: from.to_string(),
                to: to.to_string(),
            },
            ProcessingError::Repository(e) => e,
            ProcessingError::Shutdown => {
                AppError::Internal("Processing scheduler is shut down".to_string())
            }
        }
    }
}
