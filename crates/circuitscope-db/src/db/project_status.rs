//! Project processing status repository: reads and guarded updates of
//! `projects.processing_status`.

use async_trait::async_trait;
use circuitscope_core::models::{ProcessingState, ProcessingStatus};
use circuitscope_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Persisted processing status of a project.
#[async_trait]
pub trait ProjectStatusRepository: Send + Sync {
    /// Current state, or `None` if the project does not exist.
    async fn get_state(&self, project_id: Uuid) -> Result<Option<ProcessingState>, AppError>;

    /// Move the project to `to`, but only from one of `to.allowed_predecessors()`.
    ///
    /// Returns `false` without writing when the project is missing or its current status
    /// does not allow the transition. The check and the write are atomic.
    async fn transition(
        &self,
        project_id: Uuid,
        to: ProcessingStatus,
        error: Option<String>,
    ) -> Result<bool, AppError>;
}

/// Row type for the status columns (for FromRow).
#[derive(Debug, sqlx::FromRow)]
struct ProcessingStateRow {
    processing_status: ProcessingStatus,
    processing_error: Option<String>,
}

impl From<ProcessingStateRow> for ProcessingState {
    fn from(row: ProcessingStateRow) -> Self {
        ProcessingState {
            status: row.processing_status,
            error: row.processing_error,
        }
    }
}

/// Postgres-backed status repository. Each background run constructs its own
/// repository handle from the shared pool, so it never shares a connection with the
/// request that scheduled it.
#[derive(Clone)]
pub struct PgProjectStatusRepository {
    pool: PgPool,
}

impl PgProjectStatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStatusRepository for PgProjectStatusRepository {
    #[tracing::instrument(skip(self), fields(db.table = "projects"))]
    async fn get_state(&self, project_id: Uuid) -> Result<Option<ProcessingState>, AppError> {
        let row: Option<ProcessingStateRow> = sqlx::query_as::<Postgres, ProcessingStateRow>(
            r#"
            SELECT processing_status, processing_error
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProcessingState::from))
    }

    #[tracing::instrument(skip(self, error), fields(db.table = "projects"))]
    async fn transition(
        &self,
        project_id: Uuid,
        to: ProcessingStatus,
        error: Option<String>,
    ) -> Result<bool, AppError> {
        let allowed_from: Vec<String> = to
            .allowed_predecessors()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let result = sqlx::query(
            r#"
            UPDATE projects
            SET processing_status = $2,
                processing_error = $3,
                updated_at = NOW()
            WHERE id = $1
              AND processing_status = ANY($4)
            "#,
        )
        .bind(project_id)
        .bind(to)
        .bind(&error)
        .bind(&allowed_from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
