//! In-memory model of one mzML document
//!
//! A [`SpectralDocument`] is everything the writer needs to emit: fixed file
//! metadata, one MS1 spectrum per distinct retention time and a single total
//! ion current chromatogram. Scan start time belongs to the [`Spectrum`] and is
//! serialized on its `<scan>` element.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::controlled_vocabulary::{ms_terms, CvTerm};
use crate::rename::CanonicalName;
use crate::table::CleanedTable;

/// Identifier of the single instrument configuration
pub const INSTRUMENT_CONFIGURATION_ID: &str = "IC1";
/// Identifier of the single data processing entry
pub const DATA_PROCESSING_ID: &str = "DP1";
/// Identifier of the originating run file
pub const SOURCE_FILE_ID: &str = "RAW1";
/// Identifier of this software in `softwareList`
pub const SOFTWARE_ID: &str = "msv_convert";
/// Identifier of the run
pub const RUN_ID: &str = "run1";
/// Identifier of the total ion current chromatogram
pub const TIC_CHROMATOGRAM_ID: &str = "TIC";

/// Run file the document was converted from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// File name
    pub name: String,
    /// `file://` URI of the containing directory
    pub location: String,
}

impl SourceFile {
    /// Describe a run file by its path
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let directory = parent.canonicalize().unwrap_or_else(|_| parent.to_path_buf());
        let mut location = directory.to_string_lossy().replace('\\', "/");
        if !location.starts_with('/') {
            location.insert(0, '/');
        }
        Some(Self {
            name,
            location: format!("file://{}", location),
        })
    }
}

/// Software entry written to `softwareList`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Software {
    /// Software id
    pub id: String,
    /// Software version
    pub version: String,
}

impl Default for Software {
    fn default() -> Self {
        Self {
            id: SOFTWARE_ID.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Software {
    /// CV term identifying the software
    pub fn cv_term(&self) -> CvTerm {
        ms_terms::custom_software(env!("CARGO_PKG_NAME"))
    }
}

/// Kind of an instrument component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Ion source
    Source,
    /// Mass analyzer
    Analyzer,
    /// Detector
    Detector,
}

impl ComponentKind {
    /// Element name in `componentList`
    pub fn element_name(&self) -> &'static str {
        match self {
            ComponentKind::Source => "source",
            ComponentKind::Analyzer => "analyzer",
            ComponentKind::Detector => "detector",
        }
    }
}

/// One entry of an instrument's `componentList`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentComponent {
    /// Component kind
    pub kind: ComponentKind,
    /// Position in the ion path, starting at 1
    pub order: u32,
    /// Describing term
    pub term: CvTerm,
}

/// Instrument configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentConfiguration {
    /// Configuration id referenced by scans
    pub id: String,
    /// Instrument model term
    pub model: CvTerm,
    /// Components in ion-path order
    pub components: Vec<InstrumentComponent>,
}

impl Default for InstrumentConfiguration {
    fn default() -> Self {
        Self {
            id: INSTRUMENT_CONFIGURATION_ID.to_string(),
            model: ms_terms::thermo_instrument(),
            components: vec![
                InstrumentComponent {
                    kind: ComponentKind::Source,
                    order: 1,
                    term: ms_terms::electrospray_ionization(),
                },
                InstrumentComponent {
                    kind: ComponentKind::Analyzer,
                    order: 2,
                    term: ms_terms::tof(),
                },
                InstrumentComponent {
                    kind: ComponentKind::Detector,
                    order: 3,
                    term: ms_terms::electron_multiplier(),
                },
            ],
        }
    }
}

/// Processing history of the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProcessing {
    /// Data processing id
    pub id: String,
    /// Processing steps, each carried out by [`Software`]
    pub methods: Vec<CvTerm>,
}

impl Default for DataProcessing {
    fn default() -> Self {
        Self {
            id: DATA_PROCESSING_ID.to_string(),
            methods: vec![
                ms_terms::conversion_to_mzml(),
                ms_terms::centroid_spectrum(),
            ],
        }
    }
}

/// One MS1 spectrum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// 0-based position in the spectrum list
    pub index: usize,
    /// Native id, `scan=<index + 1>`
    pub id: String,
    /// Scan start time in seconds
    pub scan_start_time: f64,
    /// m/z values
    pub mz: Vec<f64>,
    /// Intensities, one per m/z value
    pub intensity: Vec<f64>,
}

impl Spectrum {
    /// Build the spectrum at `index`
    pub fn new(index: usize, scan_start_time: f64, mz: Vec<f64>, intensity: Vec<f64>) -> Self {
        Self {
            index,
            id: format!("scan={}", index + 1),
            scan_start_time,
            mz,
            intensity,
        }
    }

    /// Number of peaks
    pub fn len(&self) -> usize {
        self.mz.len()
    }

    /// Returns true if the spectrum has no peaks
    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// Sum of all intensities
    pub fn total_ion_current(&self) -> f64 {
        self.intensity.iter().sum()
    }
}

/// Chromatogram written to `chromatogramList`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromatogram {
    /// Chromatogram id
    pub id: String,
    /// Time points in seconds
    pub time: Vec<f64>,
    /// Intensity at each time point
    pub intensity: Vec<f64>,
}

/// Everything written to one mzML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralDocument {
    /// Run file the data came from
    pub source_file: Option<SourceFile>,
    /// Converting software
    pub software: Software,
    /// Instrument description
    pub instrument: InstrumentConfiguration,
    /// Processing history
    pub data_processing: DataProcessing,
    /// Acquisition start, when known
    pub start_time_stamp: Option<NaiveDateTime>,
    /// Spectra in ascending retention time
    pub spectra: Vec<Spectrum>,
    /// Total ion current chromatogram
    pub chromatogram: Chromatogram,
}

impl SpectralDocument {
    /// Build the document for a cleaned reading table.
    ///
    /// Rows sharing a retention time become one spectrum. The chromatogram
    /// keeps one point per table row, in table order.
    pub fn from_table(table: &CleanedTable) -> Self {
        let spectra = table
            .scans()
            .into_iter()
            .enumerate()
            .map(|(index, scan)| Spectrum::new(index, scan.retention_time, scan.mz, scan.intensity))
            .collect();

        let start_time_stamp = table
            .source
            .file_name()
            .and_then(|name| CanonicalName::parse_canonical(&name.to_string_lossy()))
            .and_then(|(_, name)| name.acquisition_time());

        Self {
            source_file: SourceFile::from_path(&table.source),
            software: Software::default(),
            instrument: InstrumentConfiguration::default(),
            data_processing: DataProcessing::default(),
            start_time_stamp,
            spectra,
            chromatogram: Chromatogram {
                id: TIC_CHROMATOGRAM_ID.to_string(),
                time: table.retention_times.clone(),
                intensity: table.total_ion_current(),
            },
        }
    }

    /// Number of spectra
    pub fn spectrum_count(&self) -> usize {
        self.spectra.len()
    }
}
