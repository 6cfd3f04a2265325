//! # Reading Table Extraction and Reshaping
//!
//! Run files embed their readings as a `;`-delimited table inside a `DATA`
//! element. Rows are time points; after three time/index columns, every
//! column is one intensity channel whose header is its m/z value:
//!
//! ```text
//! RT(minutes) - NOT USED BY IMPORT;RI;RT(milliseconds);50;51;52
//! 0.025;0;1500;-5;0.0002;1.5e-12
//! ```
//!
//! [`RawTable`] holds the parsed readings, [`CleaningConfig`] turns them into a
//! [`CleanedTable`] (negatives clamped, intensities rescaled and rounded,
//! retention time in seconds), and [`CleanedTable::scans`] reshapes the wide
//! table into per-scan spectra through the long form.

mod error;
mod extract;
mod long;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use error::ExtractError;
pub use extract::{
    DATA_ELEMENT, RETENTION_INDEX_COLUMN, RT_MILLISECONDS_COLUMN, RT_MINUTES_COLUMN,
    TABLE_DELIMITER,
};
pub use long::{group_by_retention_time, LongRecord, ScanGroup, LONG_FORM_HEADER};

/// Default intensity scaling factor
pub const DEFAULT_INTENSITY_MULTIPLIER: f64 = 1e16;

/// Default number of decimal places kept after scaling
pub const DEFAULT_DECIMAL_PLACES: u32 = 3;

/// One intensity channel of the reading table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Column header as written by the instrument
    pub label: String,
    /// Mass-to-charge value parsed from the header
    pub mz: f64,
}

/// Readings as parsed from a run file, before cleaning
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Run file the table came from
    pub source: PathBuf,
    /// Intensity channels in column order
    pub channels: Vec<Channel>,
    /// Retention time of each row in milliseconds
    pub retention_times_ms: Vec<f64>,
    /// Intensity values, one row per time point, one column per channel
    pub rows: Vec<Vec<f64>>,
}

/// Readings after cleaning, ready to be written as spectra
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    /// Run file the table came from
    pub source: PathBuf,
    /// Intensity channels in column order
    pub channels: Vec<Channel>,
    /// Retention time of each row in seconds
    pub retention_times: Vec<f64>,
    /// Cleaned intensity values, one row per time point
    pub rows: Vec<Vec<f64>>,
}

/// Intensity scaling and rounding applied to every channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Factor every intensity is multiplied by
    pub intensity_multiplier: f64,
    /// Decimal places kept after scaling (ties round to even)
    pub decimal_places: u32,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            intensity_multiplier: DEFAULT_INTENSITY_MULTIPLIER,
            decimal_places: DEFAULT_DECIMAL_PLACES,
        }
    }
}

impl CleaningConfig {
    /// `round(max(x, 0) * multiplier, decimals)`
    pub fn clean_intensity(&self, value: f64) -> f64 {
        round_to(value.max(0.0) * self.intensity_multiplier, self.decimal_places)
    }

    /// Clean a raw table. Retention times are converted from milliseconds to
    /// seconds; intensities go through [`clean_intensity`](Self::clean_intensity).
    pub fn apply(&self, raw: RawTable) -> CleanedTable {
        let retention_times = raw
            .retention_times_ms
            .iter()
            .map(|ms| ms / 1000.0)
            .collect();
        let rows = raw
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(|x| self.clean_intensity(x)).collect())
            .collect();

        CleanedTable {
            source: raw.source,
            channels: raw.channels,
            retention_times,
            rows,
        }
    }
}

/// Round half to even at the given number of decimals
fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round_ties_even() / scale
}

impl RawTable {
    /// Number of time points
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl CleanedTable {
    /// Read and clean a run file in one step.
    pub fn from_run_file<P: AsRef<Path>>(
        path: P,
        config: &CleaningConfig,
    ) -> Result<Self, ExtractError> {
        Ok(config.apply(RawTable::from_run_file(path)?))
    }

    /// Number of time points
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// m/z value of every channel, in column order
    pub fn mz_values(&self) -> Vec<f64> {
        self.channels.iter().map(|c| c.mz).collect()
    }

    /// Sum of all channel intensities for each row, in row order
    pub fn total_ion_current(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.iter().sum()).collect()
    }
}
