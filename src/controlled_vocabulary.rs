//! # HUPO-PSI Mass Spectrometry Controlled Vocabulary
//!
//! Type-safe access to the PSI-MS and Unit Ontology terms that appear in the
//! mzML documents this crate writes. Every `cvParam` the writer emits is built
//! from one of these constructors, so the accession, name and unit of a term
//! are spelled out exactly once.
//!
//! ## Reference
//! - OBO file: https://raw.githubusercontent.com/HUPO-PSI/psi-ms-CV/master/psi-ms.obo
//! - Documentation: https://github.com/HUPO-PSI/psi-ms-CV

use serde::{Deserialize, Serialize};
use std::fmt;

/// A controlled vocabulary term with its accession and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CvTerm {
    /// CV accession (e.g., "MS:1000511")
    pub accession: String,
    /// Human-readable name
    pub name: String,
    /// Optional value associated with the term
    pub value: Option<String>,
    /// Optional unit accession for the value
    pub unit_accession: Option<String>,
    /// Optional unit name
    pub unit_name: Option<String>,
}

impl CvTerm {
    /// Create a new CV term with accession and name
    pub fn new(accession: &str, name: &str) -> Self {
        Self {
            accession: accession.to_string(),
            name: name.to_string(),
            value: None,
            unit_accession: None,
            unit_name: None,
        }
    }

    /// Add a value to the CV term
    pub fn with_value(mut self, value: impl ToString) -> Self {
        self.value = Some(value.to_string());
        self
    }

    /// Add a unit to the CV term value
    pub fn with_unit(mut self, unit: CvTerm) -> Self {
        self.unit_accession = Some(unit.accession);
        self.unit_name = Some(unit.name);
        self
    }

    /// CV prefix of the accession ("MS", "UO")
    pub fn cv_ref(&self) -> &str {
        cv_prefix(&self.accession)
    }

    /// CV prefix of the unit accession, if the term has a unit
    pub fn unit_cv_ref(&self) -> Option<&str> {
        self.unit_accession.as_deref().map(cv_prefix)
    }
}

fn cv_prefix(accession: &str) -> &str {
    accession
        .split_once(':')
        .map_or(accession, |(prefix, _)| prefix)
}

impl fmt::Display for CvTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "[{}: {}={}]", self.accession, self.name, v),
            None => write!(f, "[{}: {}]", self.accession, self.name),
        }
    }
}

/// A controlled vocabulary declared in the document's `cvList`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vocabulary {
    /// Identifier referenced by `cvRef`
    pub id: &'static str,
    /// Full name
    pub full_name: &'static str,
    /// Release the terms were taken from
    pub version: &'static str,
    /// Location of the ontology file
    pub uri: &'static str,
}

/// PSI-MS ontology
pub const PSI_MS: Vocabulary = Vocabulary {
    id: "MS",
    full_name: "Proteomics Standards Initiative Mass Spectrometry Ontology",
    version: "4.1.0",
    uri: "https://raw.githubusercontent.com/HUPO-PSI/psi-ms-CV/master/psi-ms.obo",
};

/// Unit Ontology
pub const UNIT_ONTOLOGY: Vocabulary = Vocabulary {
    id: "UO",
    full_name: "Unit Ontology",
    version: "09:04:2014",
    uri: "https://raw.githubusercontent.com/bio-ontology-research-group/unit-ontology/master/unit.obo",
};

/// Common MS CV terms
pub mod ms_terms {
    use super::{unit_terms, CvTerm};

    // =========================================================================
    // File content and spectrum type
    // =========================================================================

    /// MS:1000579 - MS1 spectrum
    pub fn ms1_spectrum() -> CvTerm {
        CvTerm::new("MS:1000579", "MS1 spectrum")
    }

    /// MS:1000511 - ms level
    pub fn ms_level(level: u8) -> CvTerm {
        CvTerm::new("MS:1000511", "ms level").with_value(level)
    }

    /// MS:1000127 - centroid spectrum
    pub fn centroid_spectrum() -> CvTerm {
        CvTerm::new("MS:1000127", "centroid spectrum")
    }

    /// MS:1000285 - total ion current
    pub fn total_ion_current(tic: f64) -> CvTerm {
        CvTerm::new("MS:1000285", "total ion current").with_value(tic)
    }

    /// MS:1000795 - no combination
    pub fn no_combination() -> CvTerm {
        CvTerm::new("MS:1000795", "no combination")
    }

    /// MS:1000016 - scan start time
    pub fn scan_start_time(time_seconds: f64) -> CvTerm {
        CvTerm::new("MS:1000016", "scan start time")
            .with_value(time_seconds)
            .with_unit(unit_terms::second())
    }

    /// MS:1000235 - total ion current chromatogram
    pub fn tic_chromatogram() -> CvTerm {
        CvTerm::new("MS:1000235", "total ion current chromatogram")
    }

    // =========================================================================
    // Binary data arrays
    // =========================================================================

    /// MS:1000514 - m/z array
    pub fn mz_array() -> CvTerm {
        CvTerm::new("MS:1000514", "m/z array").with_unit(mz_unit())
    }

    /// MS:1000515 - intensity array
    pub fn intensity_array() -> CvTerm {
        CvTerm::new("MS:1000515", "intensity array").with_unit(number_of_detector_counts())
    }

    /// MS:1000595 - time array
    pub fn time_array() -> CvTerm {
        CvTerm::new("MS:1000595", "time array").with_unit(unit_terms::second())
    }

    /// MS:1000040 - m/z
    pub fn mz_unit() -> CvTerm {
        CvTerm::new("MS:1000040", "m/z")
    }

    /// MS:1000131 - number of detector counts
    pub fn number_of_detector_counts() -> CvTerm {
        CvTerm::new("MS:1000131", "number of detector counts")
    }

    /// MS:1000523 - 64-bit float
    pub fn float64() -> CvTerm {
        CvTerm::new("MS:1000523", "64-bit float")
    }

    /// MS:1000574 - zlib compression
    pub fn zlib_compression() -> CvTerm {
        CvTerm::new("MS:1000574", "zlib compression")
    }

    /// MS:1000576 - no compression
    pub fn no_compression() -> CvTerm {
        CvTerm::new("MS:1000576", "no compression")
    }

    // =========================================================================
    // Source file, software and instrument
    // =========================================================================

    /// MS:1000776 - scan number only nativeID format
    pub fn scan_number_native_id() -> CvTerm {
        CvTerm::new("MS:1000776", "scan number only nativeID format")
    }

    /// MS:1000560 - mass spectrometer file format
    pub fn mass_spectrometer_file_format() -> CvTerm {
        CvTerm::new("MS:1000560", "mass spectrometer file format")
    }

    /// MS:1000799 - custom unreleased software tool
    pub fn custom_software(name: &str) -> CvTerm {
        CvTerm::new("MS:1000799", "custom unreleased software tool").with_value(name)
    }

    /// MS:1000483 - Thermo Fisher Scientific instrument model
    pub fn thermo_instrument() -> CvTerm {
        CvTerm::new("MS:1000483", "Thermo Fisher Scientific instrument model")
    }

    /// MS:1000073 - electrospray ionization
    pub fn electrospray_ionization() -> CvTerm {
        CvTerm::new("MS:1000073", "electrospray ionization")
    }

    /// MS:1000084 - time-of-flight
    pub fn tof() -> CvTerm {
        CvTerm::new("MS:1000084", "time-of-flight")
    }

    /// MS:1000253 - electron multiplier
    pub fn electron_multiplier() -> CvTerm {
        CvTerm::new("MS:1000253", "electron multiplier")
    }

    // =========================================================================
    // Data processing
    // =========================================================================

    /// MS:1000544 - Conversion to mzML
    pub fn conversion_to_mzml() -> CvTerm {
        CvTerm::new("MS:1000544", "Conversion to mzML")
    }
}

/// Unit Ontology terms
pub mod unit_terms {
    use super::CvTerm;

    /// UO:0000010 - second
    pub fn second() -> CvTerm {
        CvTerm::new("UO:0000010", "second")
    }
}
