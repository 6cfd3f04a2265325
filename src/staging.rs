//! Staging directory layout and archive unpacking.
//!
//! A batch works inside a caller-chosen root directory. Each pipeline stage
//! reads one subdirectory and writes the next:
//!
//! ```text
//! <root>/
//! ├── 1-msv/      # unpacked run files, renamed in place
//! ├── 3-mlt/      # long-form (melted) CSV intermediates
//! ├── 5-mzmlv2/   # indexed mzML documents
//! └── 6-mzxml/    # legacy documents from the external converter
//! ```

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::progress::ProgressTracker;

/// Extension of instrument run files (compared case-insensitively).
pub const RUN_FILE_EXTENSION: &str = "msv";

/// Unpacked run files
pub const RAW_DIR: &str = "1-msv";
/// Long-form CSV intermediates
pub const LONG_FORM_DIR: &str = "3-mlt";
/// mzML documents
pub const MZML_DIR: &str = "5-mzmlv2";
/// Legacy-format documents
pub const LEGACY_DIR: &str = "6-mzxml";

/// Errors raised while preparing the staging area
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Directory could not be created or read
    #[error("Staging I/O error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The input archive could not be read
    #[error("Cannot read archive {path}: {source}")]
    Archive {
        /// Archive path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: zip::result::ZipError,
    },

    /// An archive entry would escape the destination directory
    #[error("Archive entry has an unsafe path: {0}")]
    UnsafeEntry(String),
}

/// Returns true if `path` has the run-file extension.
pub fn is_run_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(RUN_FILE_EXTENSION))
}

/// Count run files anywhere below `dir`.
pub fn count_run_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_run_file(entry.path()))
        .count()
}

/// The fixed set of stage directories under a batch root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    root: PathBuf,
}

impl StagingLayout {
    /// Describe the layout under `root` without touching the filesystem.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Describe the layout under `root` and create every stage directory.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self, StagingError> {
        let layout = Self::new(root);
        make_dirs(&layout.stage_dirs())?;
        debug!("Staging layout ready under {}", layout.root.display());
        Ok(layout)
    }

    /// Create only the long-form and mzML directories under `root`.
    pub fn create_conversion_dirs<P: AsRef<Path>>(root: P) -> Result<Self, StagingError> {
        let layout = Self::new(root);
        make_dirs(&[layout.long_form_dir(), layout.mzml_dir()])?;
        Ok(layout)
    }

    /// Batch root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding unpacked run files
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    /// Directory holding long-form CSV intermediates
    pub fn long_form_dir(&self) -> PathBuf {
        self.root.join(LONG_FORM_DIR)
    }

    /// Directory holding mzML documents
    pub fn mzml_dir(&self) -> PathBuf {
        self.root.join(MZML_DIR)
    }

    /// Directory holding legacy-format documents
    pub fn legacy_dir(&self) -> PathBuf {
        self.root.join(LEGACY_DIR)
    }

    fn stage_dirs(&self) -> [PathBuf; 4] {
        [
            self.raw_dir(),
            self.long_form_dir(),
            self.mzml_dir(),
            self.legacy_dir(),
        ]
    }
}

/// A zip bundle of run files
pub struct RunArchive {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl RunArchive {
    /// Open a zip archive for extraction.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StagingError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| StagingError::Io {
            path: path.clone(),
            source,
        })?;
        let archive =
            ZipArchive::new(BufReader::new(file)).map_err(|source| StagingError::Archive {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, archive })
    }

    /// Number of entries in the archive, directories included
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Returns true if the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Number of entries carrying the run-file extension
    pub fn run_file_count(&self) -> usize {
        self.archive
            .file_names()
            .filter(|name| is_run_file(Path::new(name)))
            .count()
    }

    /// Unpack every entry into `dest`, advancing `progress` once per entry.
    ///
    /// Returns the number of files written.
    pub fn extract_into(
        &mut self,
        dest: &Path,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<usize, StagingError> {
        info!("Extracting {} into {}", self.path.display(), dest.display());
        let mut written = 0;

        for i in 0..self.archive.len() {
            let mut entry = self
                .archive
                .by_index(i)
                .map_err(|source| StagingError::Archive {
                    path: self.path.clone(),
                    source,
                })?;
            let name = entry.name().to_string();
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| StagingError::UnsafeEntry(name.clone()))?;
            let target = dest.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&target).map_err(|source| StagingError::Io {
                    path: target.clone(),
                    source,
                })?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|source| StagingError::Io {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
                let mut out = File::create(&target).map_err(|source| StagingError::Io {
                    path: target.clone(),
                    source,
                })?;
                io::copy(&mut entry, &mut out).map_err(|source| StagingError::Io {
                    path: target.clone(),
                    source,
                })?;
                written += 1;
            }

            progress.step(format!("Extracting: {}", name));
        }

        Ok(written)
    }
}

fn make_dirs(dirs: &[PathBuf]) -> Result<(), StagingError> {
    for dir in dirs {
        fs::create_dir_all(dir).map_err(|source| StagingError::Io {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullReporter;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_layout_creates_stage_dirs() {
        let dir = tempdir().unwrap();
        let layout = StagingLayout::create(dir.path()).unwrap();

        assert!(layout.raw_dir().is_dir());
        assert!(layout.long_form_dir().is_dir());
        assert!(layout.mzml_dir().is_dir());
        assert!(layout.legacy_dir().is_dir());
        assert_eq!(layout.raw_dir(), dir.path().join("1-msv"));
    }

    #[test]
    fn test_conversion_dirs_only() {
        let dir = tempdir().unwrap();
        let layout = StagingLayout::create_conversion_dirs(dir.path()).unwrap();

        assert!(layout.long_form_dir().is_dir());
        assert!(layout.mzml_dir().is_dir());
        assert!(!layout.raw_dir().exists());
        assert!(!layout.legacy_dir().exists());
    }

    #[test]
    fn test_is_run_file() {
        assert!(is_run_file(Path::new("a/b/2024-01-15_0930_MS_A1-01.msv")));
        assert!(is_run_file(Path::new("RUN.MSV")));
        assert!(!is_run_file(Path::new("run.mzML")));
        assert!(!is_run_file(Path::new("msv")));
    }

    #[test]
    fn test_extract_archive() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("batch.zip");
        write_archive(
            &zip_path,
            &[
                ("a.msv", "<DATA/>"),
                ("nested/b.msv", "<DATA/>"),
                ("notes.txt", "hello"),
            ],
        );

        let mut archive = RunArchive::open(&zip_path).unwrap();
        assert_eq!(archive.len(), 3);
        assert_eq!(archive.run_file_count(), 2);

        let dest = dir.path().join("out");
        let reporter = NullReporter;
        let mut progress = ProgressTracker::new(archive.len(), &reporter);
        let written = archive.extract_into(&dest, &mut progress).unwrap();

        assert_eq!(written, 3);
        assert_eq!(progress.percent(), 100);
        assert!(dest.join("nested/b.msv").is_file());
        assert_eq!(count_run_files(&dest), 2);
    }

    #[test]
    fn test_open_missing_archive_fails() {
        let dir = tempdir().unwrap();
        let result = RunArchive::open(dir.path().join("missing.zip"));
        assert!(matches!(result, Err(StagingError::Io { .. })));
    }
}
