#![allow(dead_code)]

use circuitscope_core::config::{ProcessingConfig, RendererConfig};
use circuitscope_core::models::ProcessingStatus;
use circuitscope_db::InMemoryProjectStatusRepository;
use circuitscope_storage::{LocalStorage, Storage};
use circuitscope_worker::{ProcessingOrchestrator, ProcessingScheduler};
use std::io::{Cursor, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;
use zip::write::{FileOptions, ZipWriter};

/// Shell stand-in for `kicad-cli`. Exports `sheets` schematic pages, front and back
/// layers (inner layers fail as if absent from the board) and a GLB model.
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
    let path = dir.join("kicad-cli");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        for (name, data) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer
}

pub const PROJECT_FILE: &[u8] =
    br#"{"metadata": {"title_block": {"title": "Audio Amp", "company": "ACME", "revision": "B"}}}"#;

pub struct Harness {
    pub dir: TempDir,
    pub storage: Arc<LocalStorage>,
    pub repo: InMemoryProjectStatusRepository,
    pub scheduler: ProcessingScheduler,
}

impl Harness {
    /// Harness whose renderer is the fake CLI exporting `sheets` pages.
    pub async fn new(sheets: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let cli = install_fake_kicad_cli(dir.path(), sheets);
        Self::with_executable(dir, cli).await
    }

    pub async fn with_executable(dir: TempDir, executable: PathBuf) -> Self {
        let storage = Arc::new(
            LocalStorage::new(dir.path().join("storage"), None)
                .await
                .unwrap(),
        );
        Self::with_storage(dir, executable, storage.clone(), storage).await
    }

    pub async fn with_storage(
        dir: TempDir,
        executable: PathBuf,
        local: Arc<LocalStorage>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let repo = InMemoryProjectStatusRepository::new();
        let renderer = RendererConfig {
            executable,
            timeout: Duration::from_secs(30),
        };
        let config = ProcessingConfig {
            min_layer_bytes: 0,
            scratch_dir: Some(dir.path().join("scratch")),
            ..Default::default()
        };
        let orchestrator =
            ProcessingOrchestrator::new(storage, Arc::new(repo.clone()), &renderer, config);
        Self {
            dir,
            storage: local,
            repo,
            scheduler: ProcessingScheduler::new(orchestrator),
        }
    }

    /// Register a project (as the upload request would) and store its archive.
    pub async fn upload(&self, archive: Vec<u8>) -> (Uuid, String) {
        let id = Uuid::new_v4();
        self.repo.insert_project(id, ProcessingStatus::Queued);
        let key = self.store(id, archive).await;
        (id, key)
    }

    pub async fn store(&self, id: Uuid, archive: Vec<u8>) -> String {
        circuitscope_processing::store_project_archive(
            &*self.storage,
            id,
            "project.zip",
            archive,
            u64::MAX,
        )
        .await
        .unwrap()
    }

    pub async fn process(&self, id: Uuid, key: &str) -> ProcessingStatus {
        self.scheduler
            .schedule(id, key.to_string())
            .await
            .unwrap()
            .await
            .unwrap()
            .unwrap()
    }

    pub fn scratch_is_clean(&self) -> bool {
        match std::fs::read_dir(self.dir.path().join("scratch")) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}

/// Each run in `history` is a prefix of `queued, processing, completed | failed`.
pub fn assert_runs_well_formed(history: &[ProcessingStatus]) {
    use ProcessingStatus::*;
    let mut runs: Vec<Vec<ProcessingStatus>> = Vec::new();
    for status in history {
        if *status == Queued || runs.is_empty() {
            runs.push(Vec::new());
        }
        if let Some(run) = runs.last_mut() {
            run.push(*status);
        }
    }
    for run in runs {
        let ok = matches!(
            run.as_slice(),
            [Queued] | [Queued, Processing] | [Queued, Processing, Completed] | [Queued, Processing, Failed]
        );
        assert!(ok, "malformed run in status history: {:?}", history);
    }
}
