//! Conversion to the legacy format through an external converter.
//!
//! The converter is invoked once per mzML document as
//! `<converter> <input> --outfile <output> --<flag>`, with the child's working
//! directory set to the output directory. The parent process never changes
//! its own working directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::progress::ProgressTracker;

/// Converter flag selecting the legacy output format
pub const DEFAULT_FORMAT_FLAG: &str = "mzXML";

/// Extension of the documents handed to the converter
pub const MZML_EXTENSION: &str = "mzML";

/// Errors that stop a bridge run before any file is converted
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The input directory could not be walked
    #[error("Cannot list converter inputs: {0}")]
    Walk(#[from] walkdir::Error),

    /// A path could not be resolved or created
    #[error("Bridge I/O error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// Why one document was not converted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConversionFailure {
    /// The converter could not be started
    Spawn(String),
    /// The converter exited unsuccessfully
    ExitStatus {
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Last non-empty line of the converter's output
        detail: String,
    },
}

impl std::fmt::Display for ConversionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionFailure::Spawn(msg) => write!(f, "could not start converter: {}", msg),
            ConversionFailure::ExitStatus { code: Some(code), detail } => {
                write!(f, "converter exited with code {}: {}", code, detail)
            }
            ConversionFailure::ExitStatus { code: None, detail } => {
                write!(f, "converter was terminated: {}", detail)
            }
        }
    }
}

/// A document the converter failed on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedConversion {
    /// Input document
    pub input: PathBuf,
    /// What went wrong
    pub reason: ConversionFailure,
}

/// Per-file outcome of a bridge run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeReport {
    /// Outputs produced
    pub converted: Vec<PathBuf>,
    /// Inputs the converter failed on
    pub failed: Vec<FailedConversion>,
    /// Outputs the converter reported success for but did not write
    pub missing_outputs: Vec<PathBuf>,
}

impl BridgeReport {
    /// Number of documents handed to the converter
    pub fn attempted(&self) -> usize {
        self.converted.len() + self.failed.len() + self.missing_outputs.len()
    }
}

/// External converter invocation settings
#[derive(Debug, Clone, PartialEq)]
pub struct FormatBridge {
    executable: PathBuf,
    format_flag: String,
}

impl FormatBridge {
    /// Use `executable` with the default `--mzXML` flag
    pub fn new<P: Into<PathBuf>>(executable: P) -> Self {
        Self {
            executable: executable.into(),
            format_flag: DEFAULT_FORMAT_FLAG.to_string(),
        }
    }

    /// Select another output format flag (without the leading dashes)
    pub fn with_format_flag(mut self, flag: impl Into<String>) -> Self {
        self.format_flag = flag.into();
        self
    }

    /// Converter executable
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Output format flag
    pub fn format_flag(&self) -> &str {
        &self.format_flag
    }

    /// Every mzML document under `input_dir`, sorted by path
    pub fn inputs(input_dir: &Path) -> Result<Vec<PathBuf>, BridgeError> {
        let mut inputs = Vec::new();
        for entry in WalkDir::new(input_dir).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && has_extension(entry.path(), MZML_EXTENSION) {
                inputs.push(entry.into_path());
            }
        }
        Ok(inputs)
    }

    /// Output path for `input`, mirroring its position below `input_dir`
    pub fn output_path(&self, input: &Path, input_dir: &Path, output_dir: &Path) -> PathBuf {
        let relative = input.strip_prefix(input_dir).unwrap_or(input);
        let parent = relative.parent().unwrap_or(Path::new(""));
        let stem = relative.file_stem().unwrap_or_default().to_string_lossy();
        output_dir
            .join(parent)
            .join(format!("{}.{}", stem, self.format_flag))
    }

    /// Convert every mzML document under `input_dir` into `output_dir`.
    ///
    /// Converter failures are collected per file; only problems with the
    /// directories themselves are returned as errors.
    pub fn convert_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<BridgeReport, BridgeError> {
        let input_dir = absolute(input_dir)?;
        let output_dir = absolute(output_dir)?;
        let executable = self.resolved_executable()?;
        info!(
            "Converting {} with {}",
            input_dir.display(),
            executable.display()
        );

        let mut report = BridgeReport::default();
        for input in Self::inputs(&input_dir)? {
            let output = self.output_path(&input, &input_dir, &output_dir);
            let name = file_name(&input);

            match self.convert_file(&executable, &input, &output)? {
                Ok(()) if output.exists() => {
                    progress.step(format!("Converted: {}", name));
                    report.converted.push(output);
                }
                Ok(()) => {
                    warn!("Converter reported success but wrote no {}", output.display());
                    progress.step(format!("Missing output: {}", name));
                    report.missing_outputs.push(output);
                }
                Err(reason) => {
                    warn!("Conversion of {} failed: {}", input.display(), reason);
                    progress.step(format!("Conversion failed: {}", name));
                    report.failed.push(FailedConversion { input, reason });
                }
            }
        }

        info!(
            "Converter finished: {} converted, {} failed, {} missing",
            report.converted.len(),
            report.failed.len(),
            report.missing_outputs.len()
        );
        Ok(report)
    }

    fn resolved_executable(&self) -> Result<PathBuf, BridgeError> {
        // Bare program names are left for PATH lookup
        if self.executable.components().count() > 1 {
            absolute(&self.executable)
        } else {
            Ok(self.executable.clone())
        }
    }

    fn convert_file(
        &self,
        executable: &Path,
        input: &Path,
        output: &Path,
    ) -> Result<Result<(), ConversionFailure>, BridgeError> {
        let working_dir = output.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(working_dir).map_err(|source| BridgeError::Io {
            path: working_dir.to_path_buf(),
            source,
        })?;

        debug!(
            "Running {} {} --outfile {} --{}",
            executable.display(),
            input.display(),
            output.display(),
            self.format_flag
        );
        let result = Command::new(executable)
            .arg(input)
            .arg("--outfile")
            .arg(output)
            .arg(format!("--{}", self.format_flag))
            .current_dir(working_dir)
            .output();

        let command_output = match result {
            Ok(output) => output,
            Err(e) => return Ok(Err(ConversionFailure::Spawn(e.to_string()))),
        };
        if command_output.status.success() {
            return Ok(Ok(()));
        }

        let stderr = String::from_utf8_lossy(&command_output.stderr);
        let stdout = String::from_utf8_lossy(&command_output.stdout);
        let detail = last_line(&stderr)
            .or_else(|| last_line(&stdout))
            .unwrap_or_default()
            .to_string();
        Ok(Err(ConversionFailure::ExitStatus {
            code: command_output.status.code(),
            detail,
        }))
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn absolute(path: &Path) -> Result<PathBuf, BridgeError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| BridgeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NullReporter, ProgressTracker};
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<mzML/>").unwrap();
    }

    #[test]
    fn test_inputs_are_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("b.mzML"));
        touch(&dir.path().join("a.mzML"));
        touch(&dir.path().join("nested/c.mzml"));
        touch(&dir.path().join("notes.txt"));

        let inputs = FormatBridge::inputs(dir.path()).unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.mzML"),
                PathBuf::from("b.mzML"),
                PathBuf::from("nested/c.mzml"),
            ]
        );
    }

    #[test]
    fn test_output_path_mirrors_tree() {
        let bridge = FormatBridge::new("msconvert");
        let output = bridge.output_path(
            Path::new("/in/sub/00001_run.mzML"),
            Path::new("/in"),
            Path::new("/out"),
        );
        assert_eq!(output, PathBuf::from("/out/sub/00001_run.mzXML"));
    }

    #[test]
    fn test_missing_executable_is_per_file_failure() {
        let dir = tempdir().unwrap();
        let input_dir = dir.path().join("in");
        touch(&input_dir.join("a.mzML"));
        touch(&input_dir.join("b.mzML"));

        let bridge = FormatBridge::new(dir.path().join("no-such-converter"));
        let reporter = NullReporter;
        let mut progress = ProgressTracker::new(2, &reporter);
        let report = bridge
            .convert_directory(&input_dir, &dir.path().join("out"), &mut progress)
            .unwrap();

        assert_eq!(report.failed.len(), 2);
        assert!(matches!(report.failed[0].reason, ConversionFailure::Spawn(_)));
        assert_eq!(report.attempted(), 2);
        assert_eq!(progress.percent(), 100);
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// Shell script standing in for the converter: fails on `bad.mzML`,
        /// exits cleanly without output for `ghost.mzML`.
        fn fake_converter(dir: &Path) -> PathBuf {
            let script = dir.join("fake-converter.sh");
            fs::write(
                &script,
                r#"#!/bin/sh
case "$1" in
  */bad.mzML) echo "cannot read $1" >&2; exit 3 ;;
  */ghost.mzML) exit 0 ;;
esac
[ "$2" = "--outfile" ] || exit 9
[ "$4" = "--mzXML" ] || exit 8
pwd > "$3"
"#,
            )
            .unwrap();
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
            script
        }

        #[test]
        fn test_convert_directory_collects_outcomes() {
            let dir = tempdir().unwrap();
            let input_dir = dir.path().join("in");
            let output_dir = dir.path().join("out");
            touch(&input_dir.join("a.mzML"));
            touch(&input_dir.join("bad.mzML"));
            touch(&input_dir.join("ghost.mzML"));
            touch(&input_dir.join("sub/c.mzML"));

            let cwd_before = std::env::current_dir().unwrap();
            let bridge = FormatBridge::new(fake_converter(dir.path()));
            let reporter = NullReporter;
            let mut progress = ProgressTracker::new(4, &reporter);
            let report = bridge
                .convert_directory(&input_dir, &output_dir, &mut progress)
                .unwrap();

            assert_eq!(report.converted.len(), 2);
            assert_eq!(report.failed.len(), 1);
            assert_eq!(report.missing_outputs, vec![output_dir.join("ghost.mzXML")]);
            match &report.failed[0].reason {
                ConversionFailure::ExitStatus { code, detail } => {
                    assert_eq!(*code, Some(3));
                    assert!(detail.starts_with("cannot read"));
                }
                other => panic!("unexpected failure: {other}"),
            }

            // The child runs inside the mirrored output directory
            let nested = fs::read_to_string(output_dir.join("sub/c.mzXML")).unwrap();
            let nested_dir = fs::canonicalize(output_dir.join("sub")).unwrap();
            assert_eq!(fs::canonicalize(nested.trim()).unwrap(), nested_dir);

            assert_eq!(std::env::current_dir().unwrap(), cwd_before);
            assert_eq!(progress.percent(), 100);
        }
    }
}
