use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use msv_convert::mzml::CompressionType;
use msv_convert::pipeline::PipelineConfig;

mod bridge;
mod config;
mod extract;
mod inspect;
mod rename;
mod run;

pub use config::Config;

/// msv-convert - Batch conversion of .msv run files to mzML and mzXML
#[derive(Parser)]
#[command(name = "msv-convert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Binary array compression.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompressionArg {
    /// Store arrays uncompressed
    None,
    /// zlib-compress arrays
    Zlib,
}

impl From<CompressionArg> for CompressionType {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => CompressionType::None,
            CompressionArg::Zlib => CompressionType::Zlib,
        }
    }
}

/// Table cleaning and mzML flags shared by the converting commands.
#[derive(Args, Debug)]
pub struct ConversionArgs {
    /// Load settings from a TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Factor every intensity is multiplied by (default: 1e16)
    #[arg(long)]
    intensity_multiplier: Option<f64>,

    /// Decimal places kept after scaling (default: 3)
    #[arg(long)]
    decimal_places: Option<u32>,

    /// Binary array compression (default: zlib)
    #[arg(long, value_enum)]
    compression: Option<CompressionArg>,

    /// Skip re-reading written mzML files
    #[arg(long)]
    no_verify: bool,
}

impl ConversionArgs {
    /// Load the config file (if any) and apply flag overrides.
    pub fn resolve(&self) -> Result<(Config, PipelineConfig)> {
        let file = Config::load(self.config.as_deref())?;
        let mut pipeline = file.pipeline_config();
        if let Some(multiplier) = self.intensity_multiplier {
            pipeline.cleaning.intensity_multiplier = multiplier;
        }
        if let Some(places) = self.decimal_places {
            pipeline.cleaning.decimal_places = places;
        }
        if let Some(compression) = self.compression {
            pipeline.writer.compression = compression.into();
        }
        if self.no_verify {
            pipeline.writer.verify = false;
        }
        Ok((file, pipeline))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a complete batch: unpack, rename, reshape, write mzML, convert
    Run {
        /// Zip archive of .msv run files
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Root directory for the staging subdirectories
        #[arg(value_name = "ROOT")]
        root: PathBuf,

        /// Sequence index of the first renamed file
        #[arg(short = 's', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=99_999))]
        start_index: u32,

        /// External converter executable (overrides the config file)
        #[arg(long, value_name = "EXE")]
        converter: Option<PathBuf>,

        /// Output format flag passed to the converter (default: mzXML)
        #[arg(long)]
        format_flag: Option<String>,

        #[command(flatten)]
        conversion: ConversionArgs,

        /// Write the batch report as JSON
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Rename run files in a directory into canonical form
    Rename {
        /// Directory of .msv run files
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Sequence index of the first renamed file
        #[arg(short = 's', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=99_999))]
        start_index: u32,

        /// Subdirectory to leave untouched
        #[arg(long)]
        backup_dir: Option<String>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Reshape run files into long-form CSV and indexed mzML
    Extract {
        /// Directory of .msv run files
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output root; CSV goes to 3-mlt and mzML to 5-mzmlv2 below it
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        #[command(flatten)]
        conversion: ConversionArgs,
    },

    /// Convert a directory of mzML documents with the external converter
    Bridge {
        /// Directory of mzML documents
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output directory
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// External converter executable (overrides the config file)
        #[arg(long, value_name = "EXE")]
        converter: Option<PathBuf>,

        /// Output format flag passed to the converter (default: mzXML)
        #[arg(long)]
        format_flag: Option<String>,

        /// Load settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Re-read an mzML file and print its verification report
    Inspect {
        /// mzML file path
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Expected number of spectra
        #[arg(long)]
        expected_spectra: Option<usize>,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            archive,
            root,
            start_index,
            converter,
            format_flag,
            conversion,
            report,
            no_progress,
        } => run::run(run::RunArgs {
            archive,
            root,
            start_index,
            converter,
            format_flag,
            conversion,
            report,
            no_progress,
        }),
        Commands::Rename {
            dir,
            start_index,
            backup_dir,
            config,
        } => rename::run(dir, start_index, backup_dir, config),
        Commands::Extract {
            input,
            output,
            conversion,
        } => extract::run(input, output, conversion),
        Commands::Bridge {
            input,
            output,
            converter,
            format_flag,
            config,
        } => bridge::run(input, output, converter, format_flag, config),
        Commands::Inspect {
            file,
            expected_spectra,
        } => inspect::run(file, expected_spectra),
    }
}

/// Converter from the command line, falling back to the config file.
fn converter_executable(flag: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    flag.or_else(|| config.converter.executable.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No converter executable given; pass --converter or set [converter] executable in the config file"
            )
        })
}
