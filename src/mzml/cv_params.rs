//! Controlled Vocabulary (CV) parameters as read back from mzML
//!
//! The writer builds parameters from [`crate::controlled_vocabulary`]; the
//! reader keeps whatever the document says in [`CvParam`] and matches on the
//! accessions listed in [`MS_CV_ACCESSIONS`].

use serde::{Deserialize, Serialize};

/// A controlled vocabulary parameter parsed from mzML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvParam {
    /// CV reference (e.g., "MS" for PSI-MS)
    pub cv_ref: String,

    /// Accession number (e.g., "MS:1000511")
    pub accession: String,

    /// Human-readable name
    pub name: String,

    /// Optional value
    pub value: Option<String>,

    /// Unit CV reference
    pub unit_cv_ref: Option<String>,

    /// Unit accession
    pub unit_accession: Option<String>,

    /// Unit name
    pub unit_name: Option<String>,
}

impl CvParam {
    /// Get the value as f64 if possible
    pub fn value_as_f64(&self) -> Option<f64> {
        self.value.as_ref()?.parse().ok()
    }
}

/// MS CV accessions the reader looks for
#[allow(non_snake_case)]
pub mod MS_CV_ACCESSIONS {
    /// Scan start time (retention time)
    pub const SCAN_START_TIME: &str = "MS:1000016";

    /// Total ion current
    pub const TOTAL_ION_CURRENT: &str = "MS:1000285";

    /// MS level
    pub const MS_LEVEL: &str = "MS:1000511";

    /// m/z array
    pub const MZ_ARRAY: &str = "MS:1000514";

    /// Intensity array
    pub const INTENSITY_ARRAY: &str = "MS:1000515";

    /// Time array
    pub const TIME_ARRAY: &str = "MS:1000595";

    /// Total ion current chromatogram
    pub const TIC_CHROMATOGRAM: &str = "MS:1000235";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_as_f64() {
        let param = CvParam {
            accession: MS_CV_ACCESSIONS::SCAN_START_TIME.to_string(),
            value: Some("1.5".to_string()),
            ..Default::default()
        };
        assert_eq!(param.value_as_f64(), Some(1.5));

        let flag = CvParam::default();
        assert_eq!(flag.value_as_f64(), None);
    }
}
