use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;

use msv_convert::pipeline::{spawn_batch, BatchConverter, BatchRequest};

use super::{converter_executable, ConversionArgs};

/// Arguments of the `run` command
pub struct RunArgs {
    pub archive: PathBuf,
    pub root: PathBuf,
    pub start_index: u32,
    pub converter: Option<PathBuf>,
    pub format_flag: Option<String>,
    pub conversion: ConversionArgs,
    pub report: Option<PathBuf>,
    pub no_progress: bool,
}

/// Run a complete batch on a worker thread
pub fn run(args: RunArgs) -> Result<()> {
    if !args.archive.exists() {
        anyhow::bail!("Archive does not exist: {}", args.archive.display());
    }

    let (file_config, mut config) = args.conversion.resolve()?;
    if let Some(flag) = args.format_flag {
        config.format_flag = flag;
    }
    let converter = converter_executable(args.converter, &file_config)?;

    info!("msv-convert batch");
    info!("=================");
    info!("Archive:   {}", args.archive.display());
    info!("Root:      {}", args.root.display());
    info!("Converter: {} --{}", converter.display(), config.format_flag);
    info!("Start index: {}", args.start_index);

    let request = BatchRequest::new(&args.archive, &args.root, converter)
        .with_start_index(args.start_index);
    let handle = spawn_batch(BatchConverter::new(config), request)?;

    let progress = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")?
                .progress_chars("#>-"),
        );
        Some(pb)
    };

    let result = handle.wait_with(|percent, message| {
        if let Some(pb) = &progress {
            pb.set_position(u64::from(percent));
            pb.set_message(message.to_string());
        }
    });
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }
    let report = result.context("Batch failed")?;

    println!("{}", report.format_colored());

    if let Some(path) = args.report {
        let json = report.to_json().context("Failed to serialize batch report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        info!("Wrote batch report to {}", path.display());
    }

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
