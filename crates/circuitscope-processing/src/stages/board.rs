//! BoardRenderStage - per-layer SVG drawings and a GLB model of the board.

use circuitscope_core::constants::{LAYOUT_DIR, MODEL_DIR};
use circuitscope_core::models::{LayoutEntry, ModelEntry};
use std::path::Path;

use super::StageError;
use crate::render::{kicad, ExternalRenderer, LayerSpec, BOARD_LAYER_SPECS};

const MODEL_FILENAME: &str = "board.glb";

/// Renders board layers and the 3D model.
#[derive(Debug, Clone)]
pub struct BoardRenderStage {
    renderer: ExternalRenderer,
    /// Layer drawings smaller than this are treated as empty renders. This is a size
    /// heuristic, not a geometry check. `0` disables it.
    min_layer_bytes: u64,
}

impl BoardRenderStage {
    pub fn new(renderer: ExternalRenderer, min_layer_bytes: u64) -> Self {
        Self {
            renderer,
            min_layer_bytes,
        }
    }

    /// Render every entry of [`BOARD_LAYER_SPECS`] into `{publish_root}/layouts/`.
    ///
    /// Layers the tool cannot export are skipped; partial coverage is a normal result.
    #[tracing::instrument(skip(self, board, publish_root))]
    pub async fn render_layers(
        &self,
        board: &Path,
        publish_root: &Path,
    ) -> Result<Vec<LayoutEntry>, StageError> {
        let output_dir = publish_root.join(LAYOUT_DIR);
        tokio::fs::create_dir_all(&output_dir).await?;

        let mut entries = Vec::new();
        for spec in BOARD_LAYER_SPECS {
            if let Some(entry) = self.render_layer(board, &output_dir, spec).await {
                entries.push(entry);
            }
        }

        tracing::info!(layers = entries.len(), "Board layers rendered");
        Ok(entries)
    }

    async fn render_layer(
        &self,
        board: &Path,
        output_dir: &Path,
        spec: &LayerSpec,
    ) -> Option<LayoutEntry> {
        let filename = format!("{}.svg", spec.key);
        let destination = output_dir.join(&filename);

        if let Err(e) = self
            .renderer
            .run(kicad::board_layer_svg_args(board, &destination, spec))
            .await
        {
            tracing::debug!(layer = spec.key, error = %e, "Board layer not rendered");
            let _ = tokio::fs::remove_file(&destination).await;
            return None;
        }

        let size = match tokio::fs::metadata(&destination).await {
            Ok(meta) => meta.len(),
            Err(_) => {
                tracing::debug!(layer = spec.key, "Board layer export produced no file");
                return None;
            }
        };
        if size < self.min_layer_bytes {
            tracing::debug!(
                layer = spec.key,
                size,
                min_layer_bytes = self.min_layer_bytes,
                "Board layer render looks empty, skipping"
            );
            let _ = tokio::fs::remove_file(&destination).await;
            return None;
        }

        Some(LayoutEntry {
            id: spec.key.to_string(),
            path: format!("{}/{}", LAYOUT_DIR, filename),
            filename,
            title: spec.title.to_string(),
            layers: spec.layers.iter().map(|l| l.to_string()).collect(),
        })
    }

    /// Export the GLB model into `{publish_root}/models/board.glb`.
    #[tracing::instrument(skip(self, board, publish_root))]
    pub async fn render_model(
        &self,
        board: &Path,
        publish_root: &Path,
    ) -> Result<Option<ModelEntry>, StageError> {
        let output_dir = publish_root.join(MODEL_DIR);
        tokio::fs::create_dir_all(&output_dir).await?;
        let destination = output_dir.join(MODEL_FILENAME);

        self.renderer
            .run(kicad::board_glb_args(board, &destination))
            .await?;

        if !tokio::fs::try_exists(&destination).await? {
            return Ok(None);
        }

        Ok(Some(ModelEntry {
            id: "board-3d".to_string(),
            filename: MODEL_FILENAME.to_string(),
            title: "3D model".to_string(),
            path: format!("{}/{}", MODEL_DIR, MODEL_FILENAME),
        }))
    }
}
