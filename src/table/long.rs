use std::io::Write;

use serde::{Deserialize, Serialize};

use super::CleanedTable;

/// Column names of the long-form CSV intermediate
pub const LONG_FORM_HEADER: [&str; 3] = ["Retention Time", "m/z", "intensity"];

/// One `(retention time, m/z, intensity)` triple of the unpivoted table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LongRecord {
    /// Retention time in seconds
    #[serde(rename = "Retention Time")]
    pub retention_time: f64,
    /// Channel m/z
    #[serde(rename = "m/z")]
    pub mz: f64,
    /// Cleaned intensity
    pub intensity: f64,
}

/// All long-form records sharing one retention time
#[derive(Debug, Clone, PartialEq)]
pub struct ScanGroup {
    /// Retention time in seconds
    pub retention_time: f64,
    /// m/z values in channel order
    pub mz: Vec<f64>,
    /// Intensities in channel order
    pub intensity: Vec<f64>,
}

impl ScanGroup {
    /// Sum of intensities in this scan
    pub fn total_ion_current(&self) -> f64 {
        self.intensity.iter().sum()
    }
}

impl CleanedTable {
    /// Unpivot the intensity columns.
    ///
    /// Records come out channel by channel, each channel in row order.
    pub fn melt(&self) -> Vec<LongRecord> {
        let mut records = Vec::with_capacity(self.rows.len() * self.channels.len());
        for (column, channel) in self.channels.iter().enumerate() {
            for (row, &retention_time) in self.rows.iter().zip(&self.retention_times) {
                records.push(LongRecord {
                    retention_time,
                    mz: channel.mz,
                    intensity: row[column],
                });
            }
        }
        records
    }

    /// Per-scan spectra in ascending retention time
    pub fn scans(&self) -> Vec<ScanGroup> {
        group_by_retention_time(&self.melt())
    }

    /// Write the long form as CSV with a header row.
    pub fn write_long_form<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(LONG_FORM_HEADER)?;
        for record in self.melt() {
            csv_writer.serialize(record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Group records by retention time, ascending.
///
/// Within a group, records keep their input order.
pub fn group_by_retention_time(records: &[LongRecord]) -> Vec<ScanGroup> {
    let mut sorted: Vec<&LongRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.retention_time.total_cmp(&b.retention_time));

    let mut groups: Vec<ScanGroup> = Vec::new();
    for record in sorted {
        match groups.last_mut() {
            Some(group) if group.retention_time == record.retention_time => {
                group.mz.push(record.mz);
                group.intensity.push(record.intensity);
            }
            _ => groups.push(ScanGroup {
                retention_time: record.retention_time,
                mz: vec![record.mz],
                intensity: vec![record.intensity],
            }),
        }
    }
    groups
}
