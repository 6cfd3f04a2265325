//! TOML configuration file support.
//!
//! Settings that rarely change between batches can live in a config file
//! instead of on the command line:
//!
//! ```toml
//! # msv-convert.toml
//! [conversion]
//! intensity_multiplier = 1e16
//! decimal_places = 3
//! compression = "zlib"
//!
//! [converter]
//! executable = "/opt/pwiz/msconvert"
//! format_flag = "mzXML"
//!
//! [layout]
//! backup_dir = "original_named_files"
//! ```
//!
//! Command-line flags win over file values, which win over built-in defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use msv_convert::mzml::CompressionType;
use msv_convert::pipeline::PipelineConfig;

/// Errors raised while loading a config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration structure for msv-convert.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Table cleaning and mzML settings.
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// External converter settings.
    #[serde(default)]
    pub converter: ConverterConfig,

    /// Staging layout settings.
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Configuration for table cleaning and mzML writing.
#[derive(Debug, Default, Deserialize)]
pub struct ConversionConfig {
    /// Factor every intensity is multiplied by.
    pub intensity_multiplier: Option<f64>,

    /// Decimal places kept after scaling.
    pub decimal_places: Option<u32>,

    /// Binary array compression ("zlib" or "none").
    pub compression: Option<CompressionType>,

    /// Re-read and verify every written mzML file.
    pub verify: Option<bool>,
}

/// Configuration for the external format converter.
#[derive(Debug, Default, Deserialize)]
pub struct ConverterConfig {
    /// Converter executable.
    pub executable: Option<PathBuf>,

    /// Output format flag, passed as `--<flag>`.
    pub format_flag: Option<String>,
}

/// Configuration for the staging directories.
#[derive(Debug, Default, Deserialize)]
pub struct LayoutConfig {
    /// Subdirectory the renamer leaves untouched.
    pub backup_dir: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_str(&content)
    }

    /// Load the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Merge file values over the pipeline defaults.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        if let Some(multiplier) = self.conversion.intensity_multiplier {
            config.cleaning.intensity_multiplier = multiplier;
        }
        if let Some(places) = self.conversion.decimal_places {
            config.cleaning.decimal_places = places;
        }
        if let Some(compression) = self.conversion.compression {
            config.writer.compression = compression;
        }
        if let Some(verify) = self.conversion.verify {
            config.writer.verify = verify;
        }
        if let Some(flag) = &self.converter.format_flag {
            config.format_flag = flag.clone();
        }
        if let Some(dir) = &self.layout.backup_dir {
            config.backup_dir = dir.clone();
        }
        config
    }
}
