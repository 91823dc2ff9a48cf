//! In-memory status repository.

use async_trait::async_trait;
use circuitscope_core::models::{ProcessingState, ProcessingStatus};
use circuitscope_core::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::project_status::ProjectStatusRepository;

#[derive(Default)]
struct Inner {
    states: HashMap<Uuid, ProcessingState>,
    history: HashMap<Uuid, Vec<ProcessingStatus>>,
}

/// Status repository kept in process memory. Records every status a project has been
/// in, which is what the state-machine tests assert on.
#[derive(Clone, Default)]
pub struct InMemoryProjectStatusRepository {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryProjectStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project with an initial status.
    pub fn insert_project(&self, project_id: Uuid, status: ProcessingStatus) {
        let mut inner = self.lock();
        inner
            .states
            .insert(project_id, ProcessingState::new(status));
        inner.history.insert(project_id, vec![status]);
    }

    /// Every status the project has held, oldest first. Re-entering the current status
    /// is not recorded.
    pub fn history(&self, project_id: Uuid) -> Vec<ProcessingStatus> {
        self.lock()
            .history
            .get(&project_id)
            .cloned()
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Every update leaves the maps consistent, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ProjectStatusRepository for InMemoryProjectStatusRepository {
    async fn get_state(&self, project_id: Uuid) -> Result<Option<ProcessingState>, AppError> {
        Ok(self.lock().states.get(&project_id).cloned())
    }

    async fn transition(
        &self,
        project_id: Uuid,
        to: ProcessingStatus,
        error: Option<String>,
    ) -> Result<bool, AppError> {
        let mut inner = self.lock();
        let Some(state) = inner.states.get_mut(&project_id) else {
            return Ok(false);
        };
        if !state.status.can_transition_to(to) {
            return Ok(false);
        }

        let changed = state.status != to;
        state.status = to;
        state.error = error;
        if changed {
            inner.history.entry(project_id).or_default().push(to);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProcessingStatus::*;

    #[tokio::test]
    async fn test_guarded_transitions() {
        let repo = InMemoryProjectStatusRepository::new();
        let id = Uuid::new_v4();
        repo.insert_project(id, Queued);

        assert!(repo.transition(id, Queued, None).await.unwrap());
        assert!(repo.transition(id, Processing, None).await.unwrap());
        assert!(!repo.transition(id, Processing, None).await.unwrap());
        assert!(repo
            .transition(id, Failed, Some("kicad-cli timed out".to_string()))
            .await
            .unwrap());
        assert!(!repo.transition(id, Completed, None).await.unwrap());

        let state = repo.get_state(id).await.unwrap().unwrap();
        assert_eq!(state.status, Failed);
        assert_eq!(state.error.as_deref(), Some("kicad-cli timed out"));
        assert_eq!(repo.history(id), vec![Queued, Processing, Failed]);
    }

    #[tokio::test]
    async fn test_missing_project() {
        let repo = InMemoryProjectStatusRepository::new();
        let id = Uuid::new_v4();
        assert!(repo.get_state(id).await.unwrap().is_none());
        assert!(!repo.transition(id, Queued, None).await.unwrap());
    }
}
