use circuitscope_core::constants::PHOTO_EXTENSIONS;
use std::path::{Component, Path, PathBuf};

use super::extractor::ExtractReport;

/// Design sources found in an extracted archive.
#[derive(Debug, Clone, Default)]
pub struct ExtractedTree {
    pub root: PathBuf,
    /// Every schematic source, ordered by relative path.
    pub schematics: Vec<PathBuf>,
    /// The schematic rendered by the schematic stage.
    pub primary_schematic: Option<PathBuf>,
    pub board: Option<PathBuf>,
    pub project_file: Option<PathBuf>,
    pub photos: Vec<PathBuf>,
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn is_autosave(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("_autosave-"))
}

impl ExtractedTree {
    /// Classify the files an extraction wrote.
    pub fn discover(report: &ExtractReport) -> Self {
        let mut tree = ExtractedTree {
            root: report.root.clone(),
            ..Default::default()
        };

        let mut files: Vec<&PathBuf> = report.files.iter().collect();
        files.sort_by_key(|p| tree.relative_path(p));

        for path in files {
            if is_autosave(path) {
                continue;
            }
            match extension_of(path).as_deref() {
                Some("kicad_sch") => tree.schematics.push(path.clone()),
                Some("kicad_pcb") if tree.board.is_none() => tree.board = Some(path.clone()),
                Some("kicad_pro") if tree.project_file.is_none() => {
                    tree.project_file = Some(path.clone())
                }
                Some(ext) if PHOTO_EXTENSIONS.contains(&ext) => tree.photos.push(path.clone()),
                _ => {}
            }
        }

        tree.primary_schematic = tree.pick_primary_schematic();
        tree
    }

    /// The schematic sharing the project file's stem, else the shallowest one.
    fn pick_primary_schematic(&self) -> Option<PathBuf> {
        let project_stem = self
            .project_file
            .as_deref()
            .and_then(Path::file_stem)
            .map(|s| s.to_os_string());

        if let Some(stem) = project_stem {
            if let Some(found) = self
                .schematics
                .iter()
                .find(|p| p.file_stem() == Some(stem.as_os_str()))
            {
                return Some(found.clone());
            }
        }

        self.schematics
            .iter()
            .min_by_key(|p| {
                let relative = self.relative_path(p);
                (relative.split('/').count(), relative)
            })
            .cloned()
    }

    /// Forward-slash path relative to the extraction root. Sources written one level up
    /// come back as `../name`.
    pub fn relative_path(&self, path: &Path) -> String {
        let join = |p: &Path| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/")
        };

        if let Ok(rel) = path.strip_prefix(&self.root) {
            return join(rel);
        }
        if let Some(rel) = self.root.parent().and_then(|p| path.strip_prefix(p).ok()) {
            return format!("../{}", join(rel));
        }
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn has_sources(&self) -> bool {
        !self.schematics.is_empty() || self.board.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(files: &[&str]) -> ExtractReport {
        let root = PathBuf::from("/scratch/extract");
        ExtractReport {
            files: files.iter().map(|f| root.join(f)).collect(),
            root,
            skipped: 0,
            total_bytes: 0,
        }
    }

    #[test]
    fn test_discover_classifies_sources() {
        let tree = ExtractedTree::discover(&report(&[
            "amp/sub/filter.kicad_sch",
            "amp/amp.kicad_pro",
            "amp/amp.kicad_pcb",
            "amp/amp.kicad_sch",
            "amp/_autosave-amp.kicad_sch",
            "amp/photos/top.JPG",
            "amp/README.md",
        ]));

        assert_eq!(
            tree.schematics,
            vec![
                PathBuf::from("/scratch/extract/amp/amp.kicad_sch"),
                PathBuf::from("/scratch/extract/amp/sub/filter.kicad_sch"),
            ]
        );
        assert_eq!(
            tree.primary_schematic,
            Some(PathBuf::from("/scratch/extract/amp/amp.kicad_sch"))
        );
        assert_eq!(
            tree.board,
            Some(PathBuf::from("/scratch/extract/amp/amp.kicad_pcb"))
        );
        assert_eq!(tree.photos.len(), 1);
        assert!(tree.has_sources());
    }

    #[test]
    fn test_primary_falls_back_to_shallowest() {
        let tree = ExtractedTree::discover(&report(&[
            "deep/nested/b.kicad_sch",
            "top/z.kicad_sch",
            "top/a.kicad_sch",
        ]));
        assert_eq!(
            tree.primary_schematic,
            Some(PathBuf::from("/scratch/extract/top/a.kicad_sch"))
        );
    }

    #[test]
    fn test_relative_path_above_root() {
        let tree = ExtractedTree {
            root: PathBuf::from("/scratch/extract"),
            ..Default::default()
        };
        assert_eq!(
            tree.relative_path(Path::new("/scratch/shared.kicad_sch")),
            "../shared.kicad_sch"
        );
        assert_eq!(
            tree.relative_path(Path::new("/scratch/extract/a/b.kicad_sch")),
            "a/b.kicad_sch"
        );
    }

    #[test]
    fn test_empty_tree() {
        let tree = ExtractedTree::discover(&report(&["notes.txt"]));
        assert!(!tree.has_sources());
        assert!(tree.primary_schematic.is_none());
    }
}
