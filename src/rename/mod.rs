//! # Run File Renamer
//!
//! Normalizes instrument file names in the staging directory into a sortable,
//! sequence-indexed form. Names that are already canonical, and anything under
//! the backup subdirectory, are left untouched, so a second pass over the same
//! tree renames nothing.

mod error;
mod name;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use walkdir::WalkDir;

pub use error::RenameError;
pub use name::{is_canonical, CanonicalName, MAX_SEQUENCE, MIN_NAME_TOKENS, SEQUENCE_WIDTH};

use crate::progress::ProgressTracker;
use crate::staging::is_run_file;

/// Subdirectory whose contents are never renamed
pub const DEFAULT_BACKUP_DIR: &str = "original_named_files";

/// A single completed rename
#[derive(Debug, Clone, Serialize)]
pub struct RenamedFile {
    /// Path before the rename
    pub from: PathBuf,
    /// Path after the rename
    pub to: PathBuf,
    /// Sequence index assigned
    pub sequence: u32,
}

/// Outcome of a rename pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenameSummary {
    /// Files renamed, in processing order
    pub renamed: Vec<RenamedFile>,
    /// Files skipped because they were canonical or in the backup directory
    pub skipped: usize,
    /// Sequence index the next rename would receive
    pub next_sequence: u32,
}

/// Renames run files below a root directory
#[derive(Debug, Clone)]
pub struct Renamer {
    backup_dir: String,
}

impl Default for Renamer {
    fn default() -> Self {
        Self {
            backup_dir: DEFAULT_BACKUP_DIR.to_string(),
        }
    }
}

impl Renamer {
    /// Create a renamer that skips the given backup subdirectory name
    pub fn with_backup_dir(backup_dir: impl Into<String>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Rename every non-canonical run file below `root`.
    ///
    /// Files are visited in sorted path order. The sequence index only
    /// advances after a successful rename. The first malformed name aborts the
    /// pass; files renamed before it stay renamed. So does running out of
    /// sequence indices past [`MAX_SEQUENCE`].
    pub fn rename_all(
        &self,
        root: &Path,
        start_sequence: u32,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<RenameSummary, RenameError> {
        info!("Renaming run files under {}", root.display());

        let mut files = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && is_run_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        let mut summary = RenameSummary {
            next_sequence: start_sequence,
            ..Default::default()
        };

        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            if is_canonical(&file_name) || self.in_backup_dir(root, &path) {
                debug!("Skipping already-renamed or backup file: {}", file_name);
                summary.skipped += 1;
                progress.step(format!("Skipping: {}", file_name));
                continue;
            }

            let name = CanonicalName::parse(&file_name)?;
            if summary.next_sequence > MAX_SEQUENCE {
                return Err(RenameError::SequenceOverflow {
                    file: path,
                    sequence: summary.next_sequence,
                });
            }
            let new_name = name.file_name(summary.next_sequence);
            let new_path = path.with_file_name(&new_name);

            if new_path.exists() {
                return Err(RenameError::TargetExists(new_path));
            }
            fs::rename(&path, &new_path).map_err(|source| RenameError::Io {
                path: path.clone(),
                source,
            })?;
            debug!("Renamed: {} -> {}", file_name, new_name);

            summary.renamed.push(RenamedFile {
                from: path,
                to: new_path,
                sequence: summary.next_sequence,
            });
            summary.next_sequence += 1;
            progress.step(format!("Processing: {} -> {}", file_name, new_name));
        }

        info!(
            "Renamed {} run files ({} skipped)",
            summary.renamed.len(),
            summary.skipped
        );
        Ok(summary)
    }

    fn in_backup_dir(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        relative
            .parent()
            .is_some_and(|dir| dir.components().any(|c| c.as_os_str() == self.backup_dir.as_str()))
    }
}

/// Rename run files below `root` with the default backup directory.
pub fn rename_run_files(
    root: &Path,
    start_sequence: u32,
    progress: &mut ProgressTracker<'_>,
) -> Result<RenameSummary, RenameError> {
    Renamer::default().rename_all(root, start_sequence, progress)
}
