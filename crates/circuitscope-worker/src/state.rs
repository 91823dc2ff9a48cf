//! ProcessingStateMachine - guarded writes of the persisted processing status.

use circuitscope_core::models::ProcessingStatus;
use circuitscope_db::ProjectStatusRepository;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ProcessingError;

/// `queued -> processing -> completed | failed`, with terminal states returning to
/// `queued` only when a new run is scheduled.
#[derive(Clone)]
pub struct ProcessingStateMachine {
    repository: Arc<dyn ProjectStatusRepository>,
}

impl ProcessingStateMachine {
    pub fn new(repository: Arc<dyn ProjectStatusRepository>) -> Self {
        Self { repository }
    }

    pub async fn current(&self, project_id: Uuid) -> Result<ProcessingStatus, ProcessingError> {
        self.repository
            .get_state(project_id)
            .await?
            .map(|s| s.status)
            .ok_or(ProcessingError::ProjectNotFound(project_id))
    }

    /// Mark a new run as pending. A project already `queued` stays as it is.
    pub async fn enqueue(&self, project_id: Uuid) -> Result<(), ProcessingError> {
        if self.current(project_id).await? == ProcessingStatus::Queued {
            return Ok(());
        }
        self.transition(project_id, ProcessingStatus::Queued, None)
            .await
    }

    /// The run has started.
    pub async fn start(&self, project_id: Uuid) -> Result<(), ProcessingError> {
        self.transition(project_id, ProcessingStatus::Processing, None)
            .await
    }

    pub async fn complete(&self, project_id: Uuid) -> Result<(), ProcessingError> {
        self.transition(project_id, ProcessingStatus::Completed, None)
            .await
    }

    pub async fn fail(&self, project_id: Uuid, message: String) -> Result<(), ProcessingError> {
        self.transition(project_id, ProcessingStatus::Failed, Some(message))
            .await
    }

    async fn transition(
        &self,
        project_id: Uuid,
        to: ProcessingStatus,
        error: Option<String>,
    ) -> Result<(), ProcessingError> {
        if self
            .repository
            .transition(project_id, to, error)
            .await?
        {
            tracing::info!(project_id = %project_id, status = %to, "Processing status updated");
            return Ok(());
        }

        let from = self.current(project_id).await?;
        Err(ProcessingError::InvalidTransition {
            project_id,
            from,
            to,
        })
    }
}
