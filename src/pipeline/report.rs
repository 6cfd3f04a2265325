use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

#[cfg(feature = "colorized_output")]
use console::style;

/// Batch stage a per-file failure was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Table extraction, cleaning and the long-form CSV
    Reshape,
    /// mzML writing and verification
    Mzml,
    /// External format conversion
    Bridge,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Reshape => "reshape",
            Stage::Mzml => "mzML",
            Stage::Bridge => "bridge",
        };
        f.write_str(name)
    }
}

/// A run file that did not make it through a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    /// Stage that failed
    pub stage: Stage,
    /// Input file of that stage
    pub file: PathBuf,
    /// Human-readable cause
    pub reason: String,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.file.display(), self.stage, self.reason)
    }
}

/// Counts and failures for one stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// Files the stage completed
    pub succeeded: usize,
    /// Files the stage left alone
    pub skipped: usize,
    /// Files the stage gave up on
    pub failures: Vec<FileFailure>,
}

impl StageReport {
    /// Files the stage tried to process
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    pub(crate) fn fail(&mut self, stage: Stage, file: impl Into<PathBuf>, reason: impl ToString) {
        self.failures.push(FileFailure {
            stage,
            file: file.into(),
            reason: reason.to_string(),
        });
    }
}

/// Outcome of a complete batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Input archive
    pub archive: PathBuf,
    /// Staging root
    pub root: PathBuf,
    /// Wall-clock start of the batch
    pub started_at: DateTime<Local>,
    /// Duration of the batch in seconds
    pub elapsed_seconds: f64,
    /// Files unpacked from the archive
    pub extracted: usize,
    /// Run files renamed (`succeeded`) or already canonical (`skipped`)
    pub rename: StageReport,
    /// Run files reshaped into long-form CSV
    pub reshape: StageReport,
    /// mzML documents written and verified
    pub mzml: StageReport,
    /// mzML documents converted by the external tool
    pub bridge: StageReport,
    /// Conversions that exited cleanly but left no output file
    pub missing_outputs: Vec<PathBuf>,
}

impl BatchReport {
    pub(crate) fn new(archive: PathBuf, root: PathBuf) -> Self {
        Self {
            archive,
            root,
            started_at: Local::now(),
            elapsed_seconds: 0.0,
            extracted: 0,
            rename: StageReport::default(),
            reshape: StageReport::default(),
            mzml: StageReport::default(),
            bridge: StageReport::default(),
            missing_outputs: Vec::new(),
        }
    }

    /// Every per-file failure, in stage order
    pub fn failures(&self) -> impl Iterator<Item = &FileFailure> {
        self.reshape
            .failures
            .iter()
            .chain(&self.mzml.failures)
            .chain(&self.bridge.failures)
    }

    /// Total number of per-file failures
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Check if any file failed a stage
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Check if any conversion left no output
    pub fn has_warnings(&self) -> bool {
        !self.missing_outputs.is_empty()
    }

    /// Serialize the report as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    fn stage_lines(&self) -> Vec<(&'static str, String, &StageReport)> {
        vec![
            (
                "Rename",
                format!(
                    "{} renamed, {} already canonical",
                    self.rename.succeeded, self.rename.skipped
                ),
                &self.rename,
            ),
            (
                "Reshape",
                format!(
                    "{} succeeded, {} failed",
                    self.reshape.succeeded,
                    self.reshape.failures.len()
                ),
                &self.reshape,
            ),
            (
                "mzML",
                format!(
                    "{} written, {} failed",
                    self.mzml.succeeded,
                    self.mzml.failures.len()
                ),
                &self.mzml,
            ),
            (
                "Bridge",
                format!(
                    "{} converted, {} failed, {} missing outputs",
                    self.bridge.succeeded,
                    self.bridge.failures.len(),
                    self.missing_outputs.len()
                ),
                &self.bridge,
            ),
        ]
    }

    /// Format the report with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            use console::Emoji;

            static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
            static WARN: Emoji<'_, '_> = Emoji("⚠", "[WARN]");
            static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");

            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Batch Conversion Report").bold().cyan()));
            output.push_str(&format!("{}\n", style("=======================").cyan()));
            output.push_str(&format!("{}: {}\n", style("Archive").bold(), self.archive.display()));
            output.push_str(&format!("{}: {}\n", style("Root").bold(), self.root.display()));
            output.push_str(&format!(
                "{}: {} ({:.2} s)\n\n",
                style("Started").bold(),
                self.started_at.format("%Y-%m-%d %H:%M:%S"),
                self.elapsed_seconds
            ));
            output.push_str(&format!("[{}] Extract: {} files\n", OK, self.extracted));

            for (name, counts, stage) in self.stage_lines() {
                let warn = name == "Bridge" && self.has_warnings();
                if !stage.failures.is_empty() {
                    output.push_str(&format!("[{}] {}: {}\n", FAIL, style(name).red(), counts));
                } else if warn {
                    output.push_str(&format!("[{}] {}: {}\n", WARN, style(name).yellow(), counts));
                } else {
                    output.push_str(&format!("[{}] {}: {}\n", OK, style(name).green(), counts));
                }
                for failure in &stage.failures {
                    output.push_str(&format!(
                        "      {} {}: {}\n",
                        style("-").red(),
                        failure.file.display(),
                        failure.reason
                    ));
                }
            }
            for missing in &self.missing_outputs {
                output.push_str(&format!(
                    "      {} no output: {}\n",
                    style("-").yellow(),
                    missing.display()
                ));
            }

            output.push('\n');
            if self.has_failures() {
                output.push_str(&format!(
                    "{}\n",
                    style(format!("Batch finished with {} failures", self.failure_count()))
                        .red()
                        .bold()
                ));
            } else if self.has_warnings() {
                output.push_str(&format!(
                    "{}\n",
                    style("Batch finished with warnings").yellow().bold()
                ));
            } else {
                output.push_str(&format!("{}\n", style("Batch finished").green().bold()));
            }
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Batch Conversion Report")?;
        writeln!(f, "=======================")?;
        writeln!(f, "Archive: {}", self.archive.display())?;
        writeln!(f, "Root: {}", self.root.display())?;
        writeln!(
            f,
            "Started: {} ({:.2} s)",
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.elapsed_seconds
        )?;
        writeln!(f)?;
        writeln!(f, "[✓] Extract: {} files", self.extracted)?;

        for (name, counts, stage) in self.stage_lines() {
            let symbol = if !stage.failures.is_empty() {
                "✗"
            } else if name == "Bridge" && self.has_warnings() {
                "⚠"
            } else {
                "✓"
            };
            writeln!(f, "[{}] {}: {}", symbol, name, counts)?;
            for failure in &stage.failures {
                writeln!(f, "      - {}: {}", failure.file.display(), failure.reason)?;
            }
        }
        for missing in &self.missing_outputs {
            writeln!(f, "      - no output: {}", missing.display())?;
        }

        writeln!(f)?;
        if self.has_failures() {
            writeln!(f, "Batch finished with {} failures", self.failure_count())?;
        } else if self.has_warnings() {
            writeln!(f, "Batch finished with warnings")?;
        } else {
            writeln!(f, "Batch finished")?;
        }
        Ok(())
    }
}
