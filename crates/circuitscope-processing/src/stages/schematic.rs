//! SchematicRenderStage - every sheet of the primary schematic, plus a composed grid
//! when there is more than one.

use circuitscope_core::constants::SCHEMATIC_DIR;
use circuitscope_core::models::{ComposedSchematic, SchematicEntry, SchematicPage};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::StageError;
use crate::archive::ExtractedTree;
use crate::naming::{sheet_title, slugify, UniqueNames};
use crate::render::{kicad, ExternalRenderer};
use crate::svg::SvgComposer;

/// Exports schematic sheets through the external renderer.
#[derive(Debug, Clone)]
pub struct SchematicRenderStage {
    renderer: ExternalRenderer,
    composer: SvgComposer,
}

async fn exported_sheets(dir: &Path) -> Result<Vec<PathBuf>, StageError> {
    let mut sheets = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_svg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
        if is_svg && entry.file_type().await?.is_file() {
            sheets.push(path);
        }
    }
    sheets.sort();
    Ok(sheets)
}

impl SchematicRenderStage {
    pub fn new(renderer: ExternalRenderer, composer: SvgComposer) -> Self {
        Self { renderer, composer }
    }

    /// Render the primary schematic of `tree` into `{publish_root}/schematics/`.
    ///
    /// Returns `Ok(None)` when the tree has no schematic.
    #[tracing::instrument(skip(self, tree, publish_root))]
    pub async fn render(
        &self,
        tree: &ExtractedTree,
        publish_root: &Path,
    ) -> Result<Option<SchematicEntry>, StageError> {
        let Some(primary) = tree.primary_schematic.as_deref() else {
            return Ok(None);
        };
        let start = Instant::now();

        let output_dir = publish_root.join(SCHEMATIC_DIR);
        tokio::fs::create_dir_all(&output_dir).await?;

        // Sheets are exported next to the publish root so a run's scratch stays in one place.
        let scratch = publish_root
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(publish_root);
        let export_dir = tempfile::Builder::new()
            .prefix("sheet-export-")
            .tempdir_in(scratch)?;
        self.renderer
            .run(kicad::schematic_svg_args(primary, export_dir.path()))
            .await?;

        let sheets = exported_sheets(export_dir.path()).await?;
        if sheets.is_empty() {
            return Err(StageError::NoSheetsProduced(primary.to_path_buf()));
        }

        let mut names = UniqueNames::new();
        let mut pages = Vec::with_capacity(sheets.len());
        let mut published = Vec::with_capacity(sheets.len());
        for (idx, sheet) in sheets.iter().enumerate() {
            let page = idx as u32 + 1;
            let markup = tokio::fs::read(sheet)
                .await
                .map(|bytes| String::from_utf8_lossy(&bytes).replace('\u{FFFD}', ""))
                .unwrap_or_default();
            let title = sheet_title(&markup, sheet);
            let slug = slugify(&format!("{:02}-{}", page, title), "sheet");
            let filename = names.claim(&slug, ".svg");

            let destination = output_dir.join(&filename);
            tokio::fs::copy(sheet, &destination).await?;
            published.push(destination);

            pages.push(SchematicPage {
                id: filename.trim_end_matches(".svg").to_string(),
                path: format!("{}/{}", SCHEMATIC_DIR, filename),
                filename,
                title,
                page,
            });
        }

        let stem = primary
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let composed = if pages.len() > 1 {
            self.compose(&stem, published, &output_dir, &mut names).await
        } else {
            None
        };

        let (id, filename, title, path) = match (&composed, pages.first()) {
            (Some(grid), _) => (
                grid.id.clone(),
                grid.filename.clone(),
                grid.title.clone(),
                grid.path.clone(),
            ),
            (None, Some(page)) => (
                page.id.clone(),
                page.filename.clone(),
                page.title.clone(),
                page.path.clone(),
            ),
            (None, None) => return Err(StageError::NoSheetsProduced(primary.to_path_buf())),
        };

        let sources = tree
            .schematics
            .iter()
            .map(|p| tree.relative_path(p))
            .collect();

        tracing::info!(
            pages = pages.len(),
            composed = composed.is_some(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Schematic rendered"
        );

        Ok(Some(SchematicEntry {
            id,
            filename,
            title,
            path,
            page_count: pages.len() as u32,
            multi_page: pages.len() > 1,
            pages,
            composed,
            sources,
        }))
    }

    /// Compose published pages into one grid. Failure leaves the first page as the
    /// representative.
    async fn compose(
        &self,
        stem: &str,
        pages: Vec<PathBuf>,
        output_dir: &Path,
        names: &mut UniqueNames,
    ) -> Option<ComposedSchematic> {
        let filename = names.claim(&format!("{}-sheets", slugify(stem, "schematic")), ".svg");
        let destination = output_dir.join(&filename);
        let composer = self.composer;

        let target = destination.clone();
        let result =
            tokio::task::spawn_blocking(move || composer.compose_files(&pages, &target)).await;

        match result {
            Ok(Ok(layout)) => Some(ComposedSchematic {
                id: filename.trim_end_matches(".svg").to_string(),
                path: format!("{}/{}", SCHEMATIC_DIR, filename),
                title: format!("{} (all sheets)", stem),
                filename,
                columns: layout.columns as u32,
                rows: layout.rows as u32,
            }),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Sheet composition failed, using first page");
                let _ = tokio::fs::remove_file(&destination).await;
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sheet composition task failed, using first page");
                None
            }
        }
    }
}
