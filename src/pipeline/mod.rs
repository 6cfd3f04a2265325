//! # Batch Driver
//!
//! Runs a whole archive of run files through every stage:
//!
//! 1. unpack the archive into `1-msv`
//! 2. rename run files into their canonical form
//! 3. reshape each run file into a long-form CSV in `3-mlt`
//! 4. write an indexed mzML document per run file into `5-mzmlv2`
//! 5. hand the mzML documents to the external converter, writing `6-mzxml`
//!
//! Setup problems and rename errors abort the batch. Everything after the
//! rename pass is per file: a failing run file is recorded in the
//! [`BatchReport`] and the rest of the batch carries on.
//!
//! Use [`BatchConverter::run`] to drive a batch on the current thread, or
//! [`spawn_batch`] to run it on a worker and receive [`BatchEvent`]s.

mod error;
mod report;
mod worker;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

pub use error::PipelineError;
pub use report::{BatchReport, FileFailure, Stage, StageReport};
pub use worker::{spawn_batch, BatchEvent, BatchHandle, ChannelReporter};

use crate::bridge::{FormatBridge, DEFAULT_FORMAT_FLAG, MZML_EXTENSION};
use crate::mzml::{MzMLWriter, WriterConfig};
use crate::progress::{ProgressReporter, ProgressTracker};
use crate::rename::{Renamer, DEFAULT_BACKUP_DIR, MAX_SEQUENCE};
use crate::staging::{count_run_files, is_run_file, RunArchive, StagingLayout};
use crate::table::{CleanedTable, CleaningConfig};

/// Progress steps taken by every run file after extraction: rename,
/// reshape, mzML and bridge.
const STEPS_PER_RUN_FILE: usize = 4;

/// Extension of long-form CSV intermediates
pub const LONG_FORM_EXTENSION: &str = "csv";

/// What to convert and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Zip archive of run files
    pub archive: PathBuf,
    /// Root of the staging directories
    pub root: PathBuf,
    /// Sequence index given to the first renamed file (at least 1)
    pub start_index: u32,
    /// External converter executable
    pub converter: PathBuf,
}

impl BatchRequest {
    /// Create a request that numbers renamed files from 1
    pub fn new(
        archive: impl Into<PathBuf>,
        root: impl Into<PathBuf>,
        converter: impl Into<PathBuf>,
    ) -> Self {
        Self {
            archive: archive.into(),
            root: root.into(),
            start_index: 1,
            converter: converter.into(),
        }
    }

    /// Set the first sequence index
    pub fn with_start_index(mut self, start_index: u32) -> Self {
        self.start_index = start_index;
        self
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if !(1..=MAX_SEQUENCE).contains(&self.start_index) {
            return Err(PipelineError::InvalidRequest(format!(
                "start index must be between 1 and {}, got {}",
                MAX_SEQUENCE, self.start_index
            )));
        }
        Ok(())
    }
}

/// Settings shared by every batch a converter runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Intensity scaling and rounding
    pub cleaning: CleaningConfig,
    /// mzML writer options
    pub writer: WriterConfig,
    /// Output format flag passed to the converter
    pub format_flag: String,
    /// Subdirectory the renamer never touches
    pub backup_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cleaning: CleaningConfig::default(),
            writer: WriterConfig::default(),
            format_flag: DEFAULT_FORMAT_FLAG.to_string(),
            backup_dir: DEFAULT_BACKUP_DIR.to_string(),
        }
    }
}

/// Reshape and mzML outcome for a directory of run files
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectoryConversion {
    /// Run files reshaped into long-form CSV
    pub reshape: StageReport,
    /// mzML documents written
    pub mzml: StageReport,
}

/// Drives batches through every stage
#[derive(Debug, Clone, Default)]
pub struct BatchConverter {
    config: PipelineConfig,
}

impl BatchConverter {
    /// Create a converter with the given settings
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Converter settings
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a complete batch, reporting progress to `reporter`.
    pub fn run(
        &self,
        request: &BatchRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<BatchReport, PipelineError> {
        request.validate()?;
        let started = Instant::now();
        let mut report = BatchReport::new(request.archive.clone(), request.root.clone());

        info!(
            "Starting batch: {} -> {}",
            request.archive.display(),
            request.root.display()
        );
        let layout = StagingLayout::create(&request.root)?;
        let mut archive = RunArchive::open(&request.archive)?;
        let mut progress = ProgressTracker::new(
            archive.len() + STEPS_PER_RUN_FILE * archive.run_file_count(),
            reporter,
        );

        report.extracted = archive.extract_into(&layout.raw_dir(), &mut progress)?;
        let run_files = count_run_files(&layout.raw_dir());
        progress.set_total(progress.processed() + STEPS_PER_RUN_FILE * run_files);
        info!("Extracted {} files ({} run files)", report.extracted, run_files);

        let renamed = Renamer::with_backup_dir(self.config.backup_dir.as_str()).rename_all(
            &layout.raw_dir(),
            request.start_index,
            &mut progress,
        )?;
        report.rename.succeeded = renamed.renamed.len();
        report.rename.skipped = renamed.skipped;

        let converted = self.convert_directory(
            &layout.raw_dir(),
            &layout.long_form_dir(),
            &layout.mzml_dir(),
            &mut progress,
        )?;
        report.reshape = converted.reshape;
        report.mzml = converted.mzml;

        let bridge = FormatBridge::new(&request.converter)
            .with_format_flag(self.config.format_flag.as_str());
        let documents = FormatBridge::inputs(&layout.mzml_dir())?.len();
        progress.set_total(progress.processed() + documents);
        let bridged = bridge.convert_directory(&layout.mzml_dir(), &layout.legacy_dir(), &mut progress)?;
        report.bridge.succeeded = bridged.converted.len();
        for failed in bridged.failed {
            report.bridge.fail(Stage::Bridge, failed.input, failed.reason);
        }
        report.missing_outputs = bridged.missing_outputs;

        report.elapsed_seconds = started.elapsed().as_secs_f64();
        info!(
            "Batch finished in {:.2}s with {} failures",
            report.elapsed_seconds,
            report.failure_count()
        );
        progress.finish("Batch complete");
        Ok(report)
    }

    /// Reshape every run file under `raw_dir` and write its mzML document.
    ///
    /// Outputs mirror the directory structure of `raw_dir`. Each run file
    /// takes two progress steps whether or not it succeeds.
    pub fn convert_directory(
        &self,
        raw_dir: &Path,
        long_form_dir: &Path,
        mzml_dir: &Path,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<DirectoryConversion, PipelineError> {
        let mut result = DirectoryConversion::default();
        let writer = MzMLWriter::new(self.config.writer);

        for path in run_files(raw_dir)? {
            let relative = path.strip_prefix(raw_dir).unwrap_or(&path).to_path_buf();
            let name = relative.display().to_string();

            let table = match self.reshape(&path, &long_form_dir.join(&relative)) {
                Ok(table) => {
                    result.reshape.succeeded += 1;
                    table
                }
                Err(reason) => {
                    warn!("Skipping {}: {}", name, reason);
                    result.reshape.fail(Stage::Reshape, &path, reason);
                    progress.step(format!("Failed: {}", name));
                    result.mzml.skipped += 1;
                    progress.step(format!("Skipped: {}", name));
                    continue;
                }
            };
            progress.step(format!("Reshaped: {}", name));

            let output = mzml_dir.join(&relative).with_extension(MZML_EXTENSION);
            match write_document(&writer, &table, &output) {
                Ok(()) => {
                    result.mzml.succeeded += 1;
                    progress.step(format!("Converted: {}", name));
                }
                Err(reason) => {
                    warn!("Failed to write {}: {}", output.display(), reason);
                    result.mzml.fail(Stage::Mzml, &path, reason);
                    progress.step(format!("Failed: {}", name));
                }
            }
        }

        info!(
            "Wrote {} mzML documents ({} reshape failures, {} write failures)",
            result.mzml.succeeded,
            result.reshape.failures.len(),
            result.mzml.failures.len()
        );
        Ok(result)
    }

    fn reshape(&self, path: &Path, long_form_stem: &Path) -> Result<CleanedTable, String> {
        let table =
            CleanedTable::from_run_file(path, &self.config.cleaning).map_err(|e| e.to_string())?;
        let output = long_form_stem.with_extension(LONG_FORM_EXTENSION);
        create_parent(&output)?;
        let file = File::create(&output).map_err(|e| format!("{}: {}", output.display(), e))?;
        table
            .write_long_form(BufWriter::new(file))
            .map_err(|e| format!("{}: {}", output.display(), e))?;
        debug!("Wrote long-form table {}", output.display());
        Ok(table)
    }
}

fn write_document(writer: &MzMLWriter, table: &CleanedTable, output: &Path) -> Result<(), String> {
    create_parent(output)?;
    writer.write_table(table, output).map_err(|e| e.to_string())?;
    Ok(())
}

fn create_parent(path: &Path) -> Result<(), String> {
    match path.parent() {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| format!("{}: {}", parent.display(), e))
        }
        None => Ok(()),
    }
}

/// Run files below `dir`, in sorted path order
fn run_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_run_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullReporter;
    use tempfile::tempdir;

    const RUN_FILE: &str = "<MSV><DATA>RT(minutes) - NOT USED BY IMPORT;RT(milliseconds);RI;50;51\n\
        0.025;1500;0;0.1;0.2\n\
        0.05;3000;0;0.3;0.4\n</DATA></MSV>";

    #[test]
    fn test_start_index_must_be_positive() {
        let request = BatchRequest::new("runs.zip", "root", "converter").with_start_index(0);
        let err = BatchConverter::default()
            .run(&request, &NullReporter)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }

    #[test]
    fn test_start_index_must_fit_prefix() {
        let request =
            BatchRequest::new("runs.zip", "root", "converter").with_start_index(MAX_SEQUENCE + 1);
        let err = BatchConverter::default()
            .run(&request, &NullReporter)
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest(_)));
    }

    #[test]
    fn test_missing_archive_is_fatal() {
        let dir = tempdir().unwrap();
        let request = BatchRequest::new(
            dir.path().join("missing.zip"),
            dir.path().join("root"),
            "converter",
        );
        let err = BatchConverter::default()
            .run(&request, &NullReporter)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Staging(_)));
    }

    #[test]
    fn test_convert_directory_collects_failures() {
        let dir = tempdir().unwrap();
        let layout = StagingLayout::create(dir.path()).unwrap();
        fs::write(layout.raw_dir().join("a.msv"), RUN_FILE).unwrap();
        fs::write(layout.raw_dir().join("b.msv"), "<MSV></MSV>").unwrap();
        fs::create_dir(layout.raw_dir().join("plate2")).unwrap();
        fs::write(layout.raw_dir().join("plate2").join("c.msv"), RUN_FILE).unwrap();

        let reporter = NullReporter;
        let mut progress = ProgressTracker::new(6, &reporter);
        let result = BatchConverter::default()
            .convert_directory(
                &layout.raw_dir(),
                &layout.long_form_dir(),
                &layout.mzml_dir(),
                &mut progress,
            )
            .unwrap();

        assert_eq!(progress.processed(), 6);
        assert_eq!(result.reshape.succeeded, 2);
        assert_eq!(result.reshape.failures.len(), 1);
        assert!(result.reshape.failures[0].file.ends_with("b.msv"));
        assert_eq!(result.mzml.succeeded, 2);
        assert_eq!(result.mzml.skipped, 1);

        assert!(layout.long_form_dir().join("a.csv").is_file());
        assert!(layout.mzml_dir().join("a.mzML").is_file());
        assert!(layout.mzml_dir().join("plate2").join("c.mzML").is_file());
        assert!(!layout.mzml_dir().join("b.mzML").exists());

        let csv = fs::read_to_string(layout.long_form_dir().join("a.csv")).unwrap();
        assert!(csv.starts_with("Retention Time,m/z,intensity"));
    }

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.format_flag, "mzXML");
        assert_eq!(config.backup_dir, "original_named_files");
        assert_eq!(config.cleaning, CleaningConfig::default());
    }
}
