//! CircuitScope CLI: run the preview pipeline against the configured storage.
//!
//! Configuration comes from the environment (see `circuitscope_core::Config`). Without
//! `DATABASE_URL`, processing status is kept in memory for the duration of the command.

use anyhow::{bail, Context, Result};
use circuitscope_cli::{archive_filename, init_tracing, print_json};
use circuitscope_core::models::ProcessingStatus;
use circuitscope_core::Config;
use circuitscope_db::{
    InMemoryProjectStatusRepository, PgProjectStatusRepository, ProjectStatusRepository,
    MIGRATOR,
};
use circuitscope_processing::{
    list_previews_summary, resolve_preview_asset, store_project_archive,
};
use circuitscope_storage::{create_storage, Storage};
use circuitscope_worker::{ProcessingOrchestrator, ProcessingScheduler};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "circuitscope", about = "KiCad project preview pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a project archive and render its previews
    Process {
        /// Path to the .zip archive
        archive: PathBuf,
        /// Project UUID (required with DATABASE_URL, generated otherwise)
        #[arg(long, value_name = "UUID")]
        project_id: Option<Uuid>,
    },
    /// Print the preview summary of a project
    Summary {
        /// Project UUID
        project_id: Uuid,
    },
    /// Resolve a preview asset path to its storage key
    Resolve {
        /// Project UUID
        project_id: Uuid,
        /// Asset path relative to the preview namespace, e.g. schematics/01-main.svg
        asset_path: String,
    },
    /// Apply the status-column migrations
    Migrate,
}

async fn connect(database_url: &str) -> Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    Ok(pool)
}

async fn process(
    config: &Config,
    storage: Arc<dyn Storage>,
    archive: PathBuf,
    project_id: Option<Uuid>,
) -> Result<()> {
    let (project_id, repository): (Uuid, Arc<dyn ProjectStatusRepository>) =
        match (&config.database_url, project_id) {
            (Some(url), Some(id)) => {
                let pool = connect(url).await?;
                (id, Arc::new(PgProjectStatusRepository::new(pool)))
            }
            (Some(_), None) => bail!("--project-id is required when DATABASE_URL is set"),
            (None, id) => {
                let id = id.unwrap_or_else(Uuid::new_v4);
                let repository = InMemoryProjectStatusRepository::new();
                repository.insert_project(id, ProcessingStatus::Queued);
                (id, Arc::new(repository))
            }
        };

    let bytes = tokio::fs::read(&archive)
        .await
        .with_context(|| format!("Failed to read {}", archive.display()))?;
    let archive_key = store_project_archive(
        storage.as_ref(),
        project_id,
        &archive_filename(&archive)?,
        bytes,
        config.processing.max_archive_size_bytes,
    )
    .await?;

    let orchestrator = ProcessingOrchestrator::new(
        storage.clone(),
        repository.clone(),
        &config.renderer,
        config.processing.clone(),
    );
    let scheduler = ProcessingScheduler::new(orchestrator);
    let status = scheduler
        .schedule(project_id, archive_key)
        .await?
        .await
        .context("Processing task failed")??;

    let error = repository
        .get_state(project_id)
        .await?
        .and_then(|state| state.error);
    let previews = match status {
        ProcessingStatus::Completed => {
            Some(list_previews_summary(storage.as_ref(), project_id).await?)
        }
        _ => None,
    };

    print_json(&serde_json::json!({
        "project_id": project_id,
        "status": status,
        "error": error,
        "previews": previews,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    tracing::debug!(environment = %config.environment, "Configuration loaded");

    if let Commands::Migrate = cli.command {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL is required for migrate")?;
        let pool = connect(url).await?;
        MIGRATOR
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations applied");
        return Ok(());
    }

    let storage = create_storage(&config.storage)
        .await
        .context("Failed to initialize storage")?;

    match cli.command {
        Commands::Process {
            archive,
            project_id,
        } => process(&config, storage, archive, project_id).await?,
        Commands::Summary { project_id } => {
            let summary = list_previews_summary(storage.as_ref(), project_id).await?;
            print_json(&summary)?;
        }
        Commands::Resolve {
            project_id,
            asset_path,
        } => {
            let key = resolve_preview_asset(storage.as_ref(), project_id, &asset_path).await?;
            let url = storage.get_url(&key).await?;
            print_json(&serde_json::json!({ "key": key, "url": url }))?;
        }
        Commands::Migrate => {}
    }

    Ok(())
}
