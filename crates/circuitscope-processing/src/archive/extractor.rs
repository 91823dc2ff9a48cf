//! Zip extraction with a path-containment policy.
//!
//! Every entry must land under the destination root. The one exception: entries whose
//! extension is in [`SAFE_SOURCE_EXTENSIONS`] may land exactly one level above the root,
//! because KiCad projects reference shared sheets from a sibling folder. Changing that
//! list or the one-level allowance changes the security boundary of the pipeline.

use circuitscope_core::config::ProcessingConfig;
use circuitscope_core::constants::SAFE_SOURCE_EXTENSIONS;
use circuitscope_core::has_allowed_extension;
use std::fs;
use std::io::{self, Read, Seek};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::ZipArchive;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("IO error during extraction: {0}")]
    Io(#[from] io::Error),
}

impl From<ZipError> for ExtractError {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::Io(e) => ExtractError::Io(e),
            other => ExtractError::CorruptArchive(other.to_string()),
        }
    }
}

/// Archive-bomb caps.
#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    pub max_entries: usize,
    pub max_total_bytes: u64,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        Self::from(&ProcessingConfig::default())
    }
}

impl From<&ProcessingConfig> for ExtractLimits {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            max_entries: config.max_archive_entries,
            max_total_bytes: config.max_extracted_size_bytes,
        }
    }
}

/// What an extraction run wrote.
#[derive(Debug, Clone)]
pub struct ExtractReport {
    /// Destination root the archive was extracted into.
    pub root: PathBuf,
    /// Absolute paths of every file written, in archive order.
    pub files: Vec<PathBuf>,
    pub skipped: usize,
    pub total_bytes: u64,
}

/// Where an archive entry is allowed to go.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryPlacement {
    /// Relative to the destination root.
    Contained(PathBuf),
    /// Relative to the parent of the destination root. Design sources only.
    Parent(PathBuf),
    Skip(&'static str),
}

fn is_metadata_entry(name: &str) -> bool {
    let segments: Vec<&str> = name.split(['/', '\\']).filter(|s| !s.is_empty()).collect();
    segments.contains(&"__MACOSX")
        || segments
            .last()
            .is_some_and(|name| *name == ".DS_Store" || name.starts_with("._"))
}

fn is_absolute_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    name.starts_with('/')
        || name.starts_with('\\')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Lexically resolve an entry name and decide where it may be written.
///
/// Any `..` segment disqualifies an entry unless it is a design source, even when the
/// segment would resolve back inside the root.
fn place_entry(name: &str) -> EntryPlacement {
    if name.contains('\0') {
        return EntryPlacement::Skip("NUL byte in name");
    }
    if is_metadata_entry(name) {
        return EntryPlacement::Skip("OS metadata");
    }
    if is_absolute_name(name) {
        return EntryPlacement::Skip("absolute path");
    }

    let mut parts: Vec<&str> = Vec::new();
    let mut escaped = 0usize;
    let mut saw_parent = false;
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                saw_parent = true;
                if parts.pop().is_none() {
                    escaped += 1;
                }
            }
            s => parts.push(s),
        }
    }

    if parts.is_empty() {
        return EntryPlacement::Skip("empty path");
    }
    if saw_parent && !has_allowed_extension(name, SAFE_SOURCE_EXTENSIONS) {
        return EntryPlacement::Skip("parent-directory segment");
    }

    let relative: PathBuf = parts.iter().collect();
    match escaped {
        0 => EntryPlacement::Contained(relative),
        1 => EntryPlacement::Parent(relative),
        _ => EntryPlacement::Skip("escapes more than one level"),
    }
}

/// Extracts zip archives under [`ExtractLimits`].
#[derive(Debug, Clone, Default)]
pub struct ArchiveExtractor {
    limits: ExtractLimits,
}

impl ArchiveExtractor {
    pub fn new(limits: ExtractLimits) -> Self {
        Self { limits }
    }

    /// Extract `reader` into `destination`, which is created if missing.
    ///
    /// Blocking; async callers should run it on the blocking pool.
    #[tracing::instrument(skip(self, reader), fields(destination = %destination.display()))]
    pub fn extract<R: Read + Seek>(
        &self,
        reader: R,
        destination: &Path,
    ) -> Result<ExtractReport, ExtractError> {
        let mut archive = ZipArchive::new(reader)?;
        if archive.len() > self.limits.max_entries {
            return Err(ExtractError::CorruptArchive(format!(
                "archive has {} entries, limit is {}",
                archive.len(),
                self.limits.max_entries
            )));
        }

        fs::create_dir_all(destination)?;
        let parent = destination.parent().map(Path::to_path_buf);

        let mut report = ExtractReport {
            root: destination.to_path_buf(),
            files: Vec::new(),
            skipped: 0,
            total_bytes: 0,
        };

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();

            if entry
                .unix_mode()
                .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
            {
                tracing::warn!(entry = %name, "Skipping symlink archive entry");
                report.skipped += 1;
                continue;
            }

            let target = match place_entry(&name) {
                EntryPlacement::Contained(relative) => destination.join(relative),
                EntryPlacement::Parent(relative) => match &parent {
                    Some(parent) => {
                        tracing::info!(
                            entry = %name,
                            "Extracting design source one level above the extraction root"
                        );
                        parent.join(relative)
                    }
                    None => {
                        tracing::warn!(entry = %name, "Skipping archive entry: root has no parent");
                        report.skipped += 1;
                        continue;
                    }
                },
                EntryPlacement::Skip(reason) => {
                    if reason == "OS metadata" {
                        tracing::debug!(entry = %name, "Skipping OS metadata entry");
                    } else {
                        tracing::warn!(entry = %name, reason, "Skipping unsafe archive entry");
                    }
                    report.skipped += 1;
                    continue;
                }
            };

            if entry.is_dir() {
                if target.starts_with(destination) {
                    fs::create_dir_all(&target)?;
                }
                continue;
            }

            if let Some(dir) = target.parent() {
                fs::create_dir_all(dir)?;
            }

            let remaining = self
                .limits
                .max_total_bytes
                .saturating_sub(report.total_bytes);
            let mut out = fs::File::create(&target)?;
            let written = io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut out)?;
            if written > remaining {
                drop(out);
                let _ = fs::remove_file(&target);
                return Err(ExtractError::CorruptArchive(format!(
                    "extracted size exceeds limit of {} bytes",
                    self.limits.max_total_bytes
                )));
            }

            report.total_bytes += written;
            report.files.push(target);
        }

        tracing::debug!(
            files = report.files.len(),
            skipped = report.skipped,
            total_bytes = report.total_bytes,
            "Archive extracted"
        );

        Ok(report)
    }
}
