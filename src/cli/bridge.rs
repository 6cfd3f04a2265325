use anyhow::{Context, Result};
use std::path::PathBuf;

use msv_convert::bridge::FormatBridge;
use msv_convert::progress::{LogReporter, ProgressTracker};

use super::{converter_executable, Config};

/// Run the external converter over a directory of mzML documents
pub fn run(
    input: PathBuf,
    output: PathBuf,
    converter: Option<PathBuf>,
    format_flag: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    if !input.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", input.display());
    }

    let file_config = Config::load(config.as_deref())?;
    let pipeline = file_config.pipeline_config();
    let executable = converter_executable(converter, &file_config)?;
    let bridge =
        FormatBridge::new(executable).with_format_flag(format_flag.unwrap_or(pipeline.format_flag));

    std::fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let reporter = LogReporter;
    let mut progress = ProgressTracker::new(FormatBridge::inputs(&input)?.len(), &reporter);
    let report = bridge
        .convert_directory(&input, &output, &mut progress)
        .context("Conversion failed")?;
    progress.finish("Conversion complete");

    println!(
        "Converted {} of {} documents to {}",
        report.converted.len(),
        report.attempted(),
        bridge.format_flag()
    );
    for missing in &report.missing_outputs {
        eprintln!("  no output: {}", missing.display());
    }
    for failed in &report.failed {
        eprintln!("  {}: {}", failed.input.display(), failed.reason);
    }

    if !report.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
