//! # msv-convert - Batch Conversion of .msv Run Files
//!
//! `msv_convert` turns a zip archive of instrument `.msv` exports into
//! open mass spectrometry formats. Each `.msv` file is an XML envelope
//! around a semicolon-delimited table: one row per retention time and one
//! intensity column per m/z channel.
//!
//! ## Pipeline
//!
//! - **Staging**: the archive is unpacked under a caller-chosen root with one
//!   subdirectory per stage (`1-msv`, `3-mlt`, `5-mzmlv2`, `6-mzxml`).
//!
//! - **Renaming**: run files get a sortable `NNNNN_YYYY_MM_DD__HHMM_...` name
//!   with a sequence index; names that are already canonical are left alone.
//!
//! - **Reshaping**: the embedded table is extracted, intensities are scaled
//!   and rounded, and the table is melted into a long-form CSV.
//!
//! - **mzML**: each run file becomes an indexed mzML 1.1 document with one MS1
//!   spectrum per retention time and a total ion current chromatogram. The
//!   written file is read back and verified.
//!
//! - **Bridge**: an external converter turns the mzML documents into a legacy
//!   format such as mzXML.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use msv_convert::pipeline::{BatchConverter, BatchRequest, PipelineConfig};
//! use msv_convert::progress::LogReporter;
//!
//! let request = BatchRequest::new("runs.zip", "/data/batch", "/opt/pwiz/msconvert");
//! let report = BatchConverter::new(PipelineConfig::default()).run(&request, &LogReporter)?;
//! println!("{}", report);
//! # Ok::<(), msv_convert::pipeline::PipelineError>(())
//! ```
//!
//! ## Single Files
//!
//! ```rust,no_run
//! use msv_convert::mzml::MzMLWriter;
//! use msv_convert::table::{CleanedTable, CleaningConfig};
//!
//! let table = CleanedTable::from_run_file("run.msv", &CleaningConfig::default())?;
//! let summary = MzMLWriter::default().write_table(&table, "run.mzML".as_ref())?;
//! println!("Wrote {} spectra", summary.spectra);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Documentation lints
#![warn(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod bridge;
pub mod controlled_vocabulary;
pub mod mzml;
pub mod pipeline;
pub mod progress;
pub mod rename;
pub mod staging;
pub mod table;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::bridge::{BridgeError, BridgeReport, FormatBridge};
    pub use crate::controlled_vocabulary::{ms_terms, unit_terms, CvTerm};
    pub use crate::mzml::{
        verify_file, CompressionType, DocumentSummary, MzMLError, MzMLWriter, SpectralDocument,
        VerificationReport, WriterConfig,
    };
    pub use crate::pipeline::{
        spawn_batch, BatchConverter, BatchEvent, BatchReport, BatchRequest, PipelineConfig,
        PipelineError,
    };
    pub use crate::progress::{LogReporter, NullReporter, ProgressReporter, ProgressTracker};
    pub use crate::rename::{CanonicalName, RenameError, RenameSummary, Renamer};
    pub use crate::staging::{RunArchive, StagingError, StagingLayout};
    pub use crate::table::{CleanedTable, CleaningConfig, ExtractError, RawTable};
}
