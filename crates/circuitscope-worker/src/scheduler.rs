//! Out-of-band scheduling of processing runs.
//!
//! Runs are detached tokio tasks. A semaphore bounds how many run at once, and runs for
//! the same project are serialized so they never interleave writes to one preview
//! namespace. Each run talks to the status repository on its own; nothing is shared
//! with the request that scheduled it.

use circuitscope_core::models::ProcessingStatus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::ProcessingError;
use crate::orchestrator::ProcessingOrchestrator;

type ProjectLock = Arc<AsyncMutex<()>>;

/// Handle to a scheduled run; resolves to the terminal status.
pub type RunHandle = JoinHandle<Result<ProcessingStatus, ProcessingError>>;

#[derive(Clone)]
pub struct ProcessingScheduler {
    orchestrator: ProcessingOrchestrator,
    permits: Arc<Semaphore>,
    project_locks: Arc<Mutex<HashMap<Uuid, ProjectLock>>>,
}

impl ProcessingScheduler {
    pub fn new(orchestrator: ProcessingOrchestrator) -> Self {
        let max_runs = orchestrator.config().max_concurrent_runs.max(1);
        tracing::info!(max_concurrent_runs = max_runs, "Processing scheduler started");
        Self {
            orchestrator,
            permits: Arc::new(Semaphore::new(max_runs)),
            project_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Mark the project `queued` and start a detached run for `archive_key`.
    ///
    /// If a run for the project is already processing, the new run waits for it and is
    /// marked `queued` once it finishes. Dropping the returned handle does not cancel
    /// the run.
    #[tracing::instrument(skip(self), fields(project_id = %project_id))]
    pub async fn schedule(
        &self,
        project_id: Uuid,
        archive_key: String,
    ) -> Result<RunHandle, ProcessingError> {
        match self.orchestrator.state().enqueue(project_id).await {
            Ok(()) => {}
            Err(ProcessingError::InvalidTransition {
                from: ProcessingStatus::Processing,
                ..
            }) => {
                tracing::info!(
                    project_id = %project_id,
                    "Run already in progress, new run will start after it"
                );
            }
            Err(e) => return Err(e),
        }

        let this = self.clone();
        Ok(tokio::spawn(async move {
            let lock = this.project_lock(project_id);
            let result = this.run_locked(project_id, &archive_key, &lock).await;
            this.release_project_lock(project_id, lock);
            result
        }))
    }

    /// Stop accepting new runs. Runs already holding a permit finish normally.
    pub fn shutdown(&self) {
        self.permits.close();
    }

    async fn run_locked(
        &self,
        project_id: Uuid,
        archive_key: &str,
        lock: &ProjectLock,
    ) -> Result<ProcessingStatus, ProcessingError> {
        let _guard = lock.clone().lock_owned().await;
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ProcessingError::Shutdown)?;

        self.orchestrator.state().enqueue(project_id).await?;
        self.orchestrator.run(project_id, archive_key).await
    }

    fn project_lock(&self, project_id: Uuid) -> ProjectLock {
        let mut locks = self.project_locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(project_id).or_default().clone()
    }

    fn release_project_lock(&self, project_id: Uuid, lock: ProjectLock) {
        let mut locks = self.project_locks.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map and this run hold it: nobody else is waiting.
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(&project_id);
        }
    }
}
