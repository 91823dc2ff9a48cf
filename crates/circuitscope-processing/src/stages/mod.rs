//! Render stages. Each stage turns design sources into published files under a local
//! preview root and returns the manifest entries describing them. A failing stage only
//! loses its own collection.

mod board;
mod photos;
mod schematic;

pub use board::BoardRenderStage;
pub use photos::PhotoStage;
pub use schematic::SchematicRenderStage;

use crate::render::RenderError;
use crate::svg::ComposeError;
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("No schematic sheets produced for {}", .0.display())]
    NoSheetsProduced(PathBuf),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Background task failed: {0}")]
    Join(String),
}

#[cfg(all(test, unix))]
pub(crate) mod testing {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Shell stand-in for `kicad-cli`: exports `sheets` schematic pages, front/back board
    /// layers (inner layers fail) and a GLB model.
    pub fn install_fake_kicad_cli(dir: &Path, sheets: usize) -> PathBuf {
        let script = format!(
            r#"#!/bin/sh
out=""
layers=""
prev=""
for arg in "$@"; do
  case "$prev" in
    --output) out="$arg" ;;
    --layers) layers="$arg" ;;
  esac
  prev="$arg"
done
case "$1:$3" in
  sch:svg)
    i=1
    while [ "$i" -le {sheets} ]; do
      printf '<svg xmlns="http://www.w3.org/2000/svg" width="297mm" height="210mm"><title>Sheet %s</title><rect id="r%s"/></svg>' "$i" "$i" > "$out/board-sheet$i.svg"
      i=$((i+1))
    done
    ;;
  pcb:svg)
    case "$layers" in
      In*) echo "layer not present on board" >&2; exit 1 ;;
    esac
    printf '<svg xmlns="http://www.w3.org/2000/svg" width="100" height="80"><path d="M0 0 L10 10"/></svg>' > "$out"
    ;;
  pcb:glb)
    printf 'glTF' > "$out"
    ;;
  *) exit 2 ;;
esac
"#
        );
        install_script(dir, "kicad-cli", &script)
    }

    /// Stand-in whose schematic export copies the given `(filename, bytes)` sheets
    /// verbatim. The export directory it was handed is written to `last-export`.
    pub fn install_sheet_exporter(dir: &Path, sheets: &[(&str, &[u8])]) -> PathBuf {
        let fixtures = dir.join("sheet-fixtures");
        std::fs::create_dir_all(&fixtures).unwrap();
        for (name, bytes) in sheets {
            std::fs::write(fixtures.join(name), bytes).unwrap();
        }
        let script = format!(
            r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  [ "$prev" = "--output" ] && out="$arg"
  prev="$arg"
done
printf '%s' "$out" > "{record}"
cp "{fixtures}"/* "$out"/
"#,
            record = dir.join("last-export").display(),
            fixtures = fixtures.display(),
        );
        install_script(dir, "sheet-exporter", &script)
    }

    fn install_script(dir: &Path, name: &str, script: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
