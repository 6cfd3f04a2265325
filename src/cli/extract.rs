use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use msv_convert::pipeline::BatchConverter;
use msv_convert::progress::{LogReporter, ProgressTracker};
use msv_convert::staging::{count_run_files, StagingLayout};

use super::ConversionArgs;

/// Reshape a directory of run files and write their mzML documents
pub fn run(input: PathBuf, output: PathBuf, conversion: ConversionArgs) -> Result<()> {
    if !input.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", input.display());
    }

    let (_, config) = conversion.resolve()?;
    let layout = StagingLayout::create_conversion_dirs(&output)
        .context("Failed to create output directories")?;
    info!(
        "Reshaping {} (multiplier {}, {} decimals, {:?} compression)",
        input.display(),
        config.cleaning.intensity_multiplier,
        config.cleaning.decimal_places,
        config.writer.compression
    );

    let reporter = LogReporter;
    let mut progress = ProgressTracker::new(2 * count_run_files(&input), &reporter);
    let result = BatchConverter::new(config)
        .convert_directory(
            &input,
            &layout.long_form_dir(),
            &layout.mzml_dir(),
            &mut progress,
        )
        .context("Conversion failed")?;
    progress.finish("Extraction complete");

    println!(
        "Reshaped {} run files, wrote {} mzML documents to {}",
        result.reshape.succeeded,
        result.mzml.succeeded,
        layout.mzml_dir().display()
    );

    let failures: Vec<_> = result
        .reshape
        .failures
        .iter()
        .chain(&result.mzml.failures)
        .collect();
    if !failures.is_empty() {
        for failure in failures {
            eprintln!("  {}", failure);
        }
        std::process::exit(1);
    }
    Ok(())
}
