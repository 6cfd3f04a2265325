use anyhow::{Context, Result};
use std::path::PathBuf;

use msv_convert::mzml::DocumentSummary;

/// Re-read an mzML file and print what it contains and how it verifies
pub fn run(file: PathBuf, expected_spectra: Option<usize>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {}", file.display());
    }

    let summary = DocumentSummary::open(&file).context("Failed to parse mzML file")?;

    println!("mzML File Information");
    println!("=====================");
    println!("File: {}", file.display());
    println!("Indexed: {}", summary.is_indexed());
    println!("Spectra: {}", summary.spectra.len());
    println!("Chromatograms: {}", summary.chromatograms.len());
    let times: Vec<f64> = summary
        .spectra
        .iter()
        .filter_map(|s| s.scan_start_time)
        .collect();
    if let (Some(first), Some(last)) = (times.first(), times.last()) {
        println!("Retention time: {:.3} - {:.3} s", first, last);
    }
    if let Some(checksum) = &summary.file_checksum {
        println!("SHA-1: {}", checksum);
    }
    println!();

    let report = summary.verify(file.display().to_string(), expected_spectra);
    println!("{}", report.format_colored());

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
