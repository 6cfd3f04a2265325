//! # mzML Document Writer
//!
//! Turns a cleaned reading table into an indexed mzML 1.1 document and checks
//! the written file by reading it back.
//!
//! ## Written Structure
//!
//! ```text
//! indexedmzML (xmlns, xmlns:xsi, xsi:schemaLocation)
//! ├── mzML (xmlns, xmlns:xsi, xsi:schemaLocation, version)
//! │   ├── cvList (MS, UO)
//! │   ├── fileDescription
//! │   │   ├── fileContent (MS1 spectrum)
//! │   │   └── sourceFileList
//! │   ├── softwareList
//! │   ├── instrumentConfigurationList
//! │   ├── dataProcessingList
//! │   └── run
//! │       ├── spectrumList
//! │       │   └── spectrum (one per retention time)
//! │       │       ├── cvParam (ms level, centroid, total ion current)
//! │       │       ├── scanList
//! │       │       │   └── scan
//! │       │       │       └── cvParam (scan start time)
//! │       │       └── binaryDataArrayList (m/z, intensity)
//! │       └── chromatogramList
//! │           └── chromatogram "TIC" (time, intensity)
//! ├── indexList
//! ├── indexListOffset
//! └── fileChecksum (SHA-1)
//! ```

mod binary;
mod cv_params;
mod document;
mod error;
mod reader;
mod report;
mod verify;
mod writer;


pub use binary::{
    BinaryDecodeError, BinaryDecoder, BinaryEncoder, BinaryEncoding, CompressionType,
};
pub use cv_params::{CvParam, MS_CV_ACCESSIONS};
pub use document::{
    Chromatogram, ComponentKind, DataProcessing, InstrumentComponent, InstrumentConfiguration,
    Software, SourceFile, SpectralDocument, Spectrum, TIC_CHROMATOGRAM_ID,
};
pub use error::MzMLError;
pub use reader::{ChromatogramSummary, DocumentSummary, IndexEntry, RootElement, SpectrumSummary};
pub use report::{CheckStatus, VerificationCheck, VerificationReport};
pub use verify::{
    INDEXED_SCHEMA_LOCATION, MZML_NAMESPACE, MZML_SCHEMA_LOCATION, MZML_VERSION, XSI_NAMESPACE,
};
pub use writer::{verify_file, MzMLWriter, WriteSummary, WriterConfig};
