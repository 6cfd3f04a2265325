use anyhow::{Context, Result};
use std::path::PathBuf;

use msv_convert::progress::{LogReporter, ProgressTracker};
use msv_convert::rename::Renamer;
use msv_convert::staging::count_run_files;

use super::Config;

/// Rename the run files of a directory in place
pub fn run(
    dir: PathBuf,
    start_index: u32,
    backup_dir: Option<String>,
    config: Option<PathBuf>,
) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Directory does not exist: {}", dir.display());
    }

    let pipeline = Config::load(config.as_deref())?.pipeline_config();
    let renamer = Renamer::with_backup_dir(backup_dir.unwrap_or(pipeline.backup_dir));

    let reporter = LogReporter;
    let mut progress = ProgressTracker::new(count_run_files(&dir), &reporter);
    let summary = renamer
        .rename_all(&dir, start_index, &mut progress)
        .context("Rename failed")?;
    progress.finish("Rename complete");

    for renamed in &summary.renamed {
        println!("{} -> {}", renamed.from.display(), renamed.to.display());
    }
    println!(
        "Renamed {} files, {} already canonical; next index is {}",
        summary.renamed.len(),
        summary.skipped,
        summary.next_sequence
    );
    Ok(())
}
