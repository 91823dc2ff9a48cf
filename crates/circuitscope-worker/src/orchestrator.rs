//! Preview processing orchestration: download → extract → render → publish → update status.

use anyhow::{Context, Result};
use circuitscope_core::config::{ProcessingConfig, RendererConfig};
use circuitscope_core::models::{PreviewIndex, ProcessingStatus};
use circuitscope_db::ProjectStatusRepository;
use circuitscope_processing::archive::{ArchiveExtractor, ExtractLimits, ExtractedTree};
use circuitscope_processing::{
    load_preview_index, publish_index, read_project_metadata, AssetError, BoardRenderStage,
    ExternalRenderer, PhotoStage, PreviewIndexBuilder, SchematicRenderStage, SvgComposer,
};
use circuitscope_storage::keys::preview_asset_key;
use circuitscope_storage::Storage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use uuid::Uuid;

use crate::error::ProcessingError;
use crate::state::ProcessingStateMachine;

/// Runs the preview pipeline for one project at a time.
///
/// Every run gets a fresh scratch directory that is removed when the run ends,
/// whatever the outcome.
#[derive(Clone)]
pub struct ProcessingOrchestrator {
    storage: Arc<dyn Storage>,
    state: ProcessingStateMachine,
    renderer: ExternalRenderer,
    config: ProcessingConfig,
}

impl ProcessingOrchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        repository: Arc<dyn ProjectStatusRepository>,
        renderer: &RendererConfig,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            storage,
            state: ProcessingStateMachine::new(repository),
            renderer: ExternalRenderer::from_config(renderer),
            config,
        }
    }

    pub fn state(&self) -> &ProcessingStateMachine {
        &self.state
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Process the archive stored at `archive_key`. The project must be `queued`.
    ///
    /// Moves the project to `processing`, then to exactly one of `completed` or
    /// `failed`. Errors and panics inside the run are recorded as `failed` with their
    /// message; only status bookkeeping errors are returned.
    #[tracing::instrument(skip(self), fields(project_id = %project_id))]
    pub async fn run(
        &self,
        project_id: Uuid,
        archive_key: &str,
    ) -> Result<ProcessingStatus, ProcessingError> {
        self.state.start(project_id).await?;
        let start = Instant::now();
        tracing::info!(project_id = %project_id, archive_key, "Starting preview processing");

        let this = self.clone();
        let key = archive_key.to_string();
        let outcome = tokio::spawn(async move { this.execute(project_id, &key).await }).await;

        let failure = match outcome {
            Ok(Ok(index)) => {
                tracing::info!(
                    project_id = %project_id,
                    schematics = index.schematics.len(),
                    layouts = index.layouts.len(),
                    models = index.models.len(),
                    photos = index.photos.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Preview processing completed"
                );
                None
            }
            Ok(Err(e)) => Some(format!("{:#}", e)),
            Err(e) if e.is_panic() => Some("Preview processing panicked".to_string()),
            Err(e) => Some(format!("Preview processing aborted: {}", e)),
        };

        let message = match failure {
            None => match self.state.complete(project_id).await {
                Ok(()) => return Ok(ProcessingStatus::Completed),
                Err(e) => format!("Failed to record completion: {}", e),
            },
            Some(message) => message,
        };

        tracing::error!(
            project_id = %project_id,
            error = %message,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Preview processing failed"
        );
        self.state.fail(project_id, message).await?;
        Ok(ProcessingStatus::Failed)
    }

    async fn execute(&self, project_id: Uuid, archive_key: &str) -> Result<PreviewIndex> {
        let scratch = self
            .scratch_dir()
            .context("Failed to create scratch directory")?;

        let archive_path = scratch.path().join("source.zip");
        self.storage
            .download(archive_key, &archive_path)
            .await
            .with_context(|| format!("Failed to download archive {}", archive_key))?;

        let size = tokio::fs::metadata(&archive_path).await?.len();
        if size > self.config.max_archive_size_bytes {
            anyhow::bail!(
                "Archive is {} bytes, limit is {} bytes",
                size,
                self.config.max_archive_size_bytes
            );
        }

        let extract_root = scratch.path().join("extract");
        let extractor = ArchiveExtractor::new(ExtractLimits::from(&self.config));
        let report = {
            let archive_path = archive_path.clone();
            let extract_root = extract_root.clone();
            tokio::task::spawn_blocking(move || {
                let file = std::fs::File::open(&archive_path)?;
                extractor.extract(std::io::BufReader::new(file), &extract_root)
            })
            .await
            .context("Extraction task failed")?
            .context("Failed to extract archive")?
        };

        let tree = ExtractedTree::discover(&report);
        tracing::info!(
            project_id = %project_id,
            schematics = tree.schematics.len(),
            board = tree.board.is_some(),
            photos = tree.photos.len(),
            skipped_entries = report.skipped,
            "Archive extracted"
        );
        if !tree.has_sources() {
            tracing::warn!(project_id = %project_id, "Archive contains no KiCad design sources");
        }

        let publish_root = scratch.path().join("previews");
        tokio::fs::create_dir_all(&publish_root).await?;

        let index = self.render(&tree, &publish_root).await;
        self.publish(project_id, &index, &publish_root).await?;
        Ok(index)
    }

    /// Run every stage. A failing stage is logged and leaves its collection empty.
    async fn render(&self, tree: &ExtractedTree, publish_root: &Path) -> PreviewIndex {
        let mut builder = PreviewIndexBuilder::new();

        if let Some(project_file) = &tree.project_file {
            let source = tree.relative_path(project_file);
            builder = builder.project(read_project_metadata(project_file, &source).await);
        }

        let schematic_stage = SchematicRenderStage::new(
            self.renderer.clone(),
            SvgComposer::new(self.config.grid_padding_ratio),
        );
        match schematic_stage.render(tree, publish_root).await {
            Ok(Some(entry)) => builder = builder.schematic(entry),
            Ok(None) => tracing::debug!("No schematic source in archive"),
            Err(e) => tracing::error!(stage = "schematic", error = %e, "Render stage failed"),
        }

        if let Some(board) = &tree.board {
            let board_stage =
                BoardRenderStage::new(self.renderer.clone(), self.config.min_layer_bytes);
            match board_stage.render_layers(board, publish_root).await {
                Ok(layers) => builder = builder.layouts(layers),
                Err(e) => tracing::error!(stage = "layouts", error = %e, "Render stage failed"),
            }
            match board_stage.render_model(board, publish_root).await {
                Ok(Some(model)) => builder = builder.model(model),
                Ok(None) => tracing::debug!("Model export produced no file"),
                Err(e) => tracing::error!(stage = "model", error = %e, "Render stage failed"),
            }
        } else {
            tracing::debug!("No board source in archive");
        }

        match PhotoStage::new().collect(tree, publish_root).await {
            Ok(photos) => builder = builder.photos(photos),
            Err(e) => tracing::error!(stage = "photos", error = %e, "Render stage failed"),
        }

        builder.build()
    }

    /// Upload every asset of `index`, then the manifest, then drop assets only the
    /// previous manifest referenced.
    async fn publish(
        &self,
        project_id: Uuid,
        index: &PreviewIndex,
        publish_root: &Path,
    ) -> Result<()> {
        let start = Instant::now();
        let previous = match load_preview_index(self.storage.as_ref(), project_id).await {
            Ok(previous) => Some(previous),
            Err(AssetError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read previous preview index");
                None
            }
        };

        let paths = index.asset_paths();
        for path in &paths {
            let key = preview_asset_key(project_id, path)?;
            self.storage
                .upload(&key, &publish_root.join(path))
                .await
                .with_context(|| format!("Failed to publish {}", path))?;
        }

        publish_index(self.storage.as_ref(), project_id, index)
            .await
            .context("Failed to publish preview index")?;

        if let Some(previous) = previous {
            for stale in previous
                .asset_paths()
                .into_iter()
                .filter(|p| !paths.contains(p))
            {
                let deleted = match preview_asset_key(project_id, &stale) {
                    Ok(key) => self.storage.delete(&key).await.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };
                match deleted {
                    Ok(()) => tracing::debug!(asset = %stale, "Removed stale preview asset"),
                    Err(e) => tracing::warn!(asset = %stale, error = %e, "Failed to remove stale preview asset"),
                }
            }
        }

        tracing::info!(
            project_id = %project_id,
            assets = paths.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Preview assets published"
        );
        Ok(())
    }

    fn scratch_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("circuitscope-run-");
        match &self.config.scratch_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)
            }
            None => builder.tempdir(),
        }
    }
}
