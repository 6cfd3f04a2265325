//! # msv-convert
//!
//! Command-line front end for batch conversion of `.msv` run files.
//!
//! ## Usage
//!
//! ```bash
//! # Full batch: unpack, rename, reshape, write mzML, convert to mzXML
//! msv-convert run runs.zip /data/batch --converter /opt/pwiz/msconvert
//!
//! # Individual stages
//! msv-convert rename /data/batch/1-msv --start-index 42
//! msv-convert extract /data/batch/1-msv /data/batch
//! msv-convert bridge /data/batch/5-mzmlv2 /data/batch/6-mzxml --converter msconvert
//!
//! # Check a written document
//! msv-convert inspect /data/batch/5-mzmlv2/00001_2024_01_15__0930_MS_A1_01.mzML
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
