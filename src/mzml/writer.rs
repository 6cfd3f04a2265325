//! Indexed mzML serialization
//!
//! Documents are serialized into memory, persisted through a temporary file in
//! the output directory and then re-read for verification. The serializer
//! records the byte offset of every `<spectrum>` and `<chromatogram>` as it
//! goes, so the trailing `indexList` never needs a second pass.

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};

use super::binary::{BinaryEncoder, CompressionType};
use super::document::{Chromatogram, SpectralDocument, Spectrum, SOURCE_FILE_ID};
use super::reader::{sha1_hex, DocumentSummary};
use super::report::VerificationReport;
use super::verify::{
    INDEXED_SCHEMA_LOCATION, MZML_NAMESPACE, MZML_SCHEMA_LOCATION, MZML_VERSION, XSI_NAMESPACE,
};
use super::MzMLError;
use crate::controlled_vocabulary::{ms_terms, CvTerm, Vocabulary, PSI_MS, UNIT_ONTOLOGY};
use crate::table::CleanedTable;

/// Writer options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Compression of binary data arrays
    pub compression: CompressionType,
    /// Re-read every written file and fail on structural problems
    pub verify: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: CompressionType::Zlib,
            verify: true,
        }
    }
}

/// Outcome of writing one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteSummary {
    /// Written file
    pub path: PathBuf,
    /// Number of spectra
    pub spectra: usize,
    /// Number of chromatograms
    pub chromatograms: usize,
    /// File size in bytes
    pub bytes: usize,
    /// SHA-1 stored in `fileChecksum`
    pub checksum: String,
}

/// Writes [`SpectralDocument`]s as indexed mzML
#[derive(Debug, Clone, Default)]
pub struct MzMLWriter {
    config: WriterConfig,
}

impl MzMLWriter {
    /// Create a writer with the given options
    pub fn new(config: WriterConfig) -> Self {
        Self { config }
    }

    /// Writer options
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Build the document for `table` and write it to `output`.
    pub fn write_table(
        &self,
        table: &CleanedTable,
        output: &Path,
    ) -> Result<WriteSummary, MzMLError> {
        let document = SpectralDocument::from_table(table);
        self.write_document(&document, output)
    }

    /// Write a document to `output`, replacing it atomically.
    pub fn write_document(
        &self,
        document: &SpectralDocument,
        output: &Path,
    ) -> Result<WriteSummary, MzMLError> {
        let serialized = self.serialize(document)?;
        persist(&serialized.bytes, output)?;
        debug!(
            "Wrote {} ({} spectra, {} bytes)",
            output.display(),
            document.spectra.len(),
            serialized.bytes.len()
        );

        if self.config.verify {
            let report = verify_file(output, Some(document.spectra.len()))?;
            if report.has_failures() {
                return Err(MzMLError::InvalidStructure(format!(
                    "{}: {}",
                    output.display(),
                    report.failure_messages().join("; ")
                )));
            }
        }

        info!("Converted {}", output.display());
        Ok(WriteSummary {
            path: output.to_path_buf(),
            spectra: document.spectra.len(),
            chromatograms: 1,
            bytes: serialized.bytes.len(),
            checksum: serialized.checksum,
        })
    }

    /// Serialize a document into indexed mzML bytes
    pub fn to_bytes(&self, document: &SpectralDocument) -> Result<Vec<u8>, MzMLError> {
        Ok(self.serialize(document)?.bytes)
    }

    fn serialize(&self, document: &SpectralDocument) -> Result<Serialized, MzMLError> {
        let mut serializer = Serializer::new(BinaryEncoder::new(self.config.compression));
        serializer.document(document)?;
        Ok(serializer.finish())
    }
}

/// Re-read a written file and run every verification check
pub fn verify_file(
    path: &Path,
    expected_spectra: Option<usize>,
) -> Result<VerificationReport, MzMLError> {
    let summary = DocumentSummary::open(path)?;
    Ok(summary.verify(path.display().to_string(), expected_spectra))
}

fn persist(bytes: &[u8], output: &Path) -> Result<(), MzMLError> {
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(output).map_err(|e| MzMLError::Persist {
        path: output.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

struct Serialized {
    bytes: Vec<u8>,
    checksum: String,
}

struct Serializer {
    writer: Writer<Vec<u8>>,
    encoder: BinaryEncoder,
    spectrum_offsets: Vec<(String, u64)>,
    chromatogram_offsets: Vec<(String, u64)>,
    checksum: String,
}

impl Serializer {
    fn new(encoder: BinaryEncoder) -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
            encoder,
            spectrum_offsets: Vec::new(),
            chromatogram_offsets: Vec::new(),
            checksum: String::new(),
        }
    }

    fn finish(self) -> Serialized {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        Serialized {
            bytes,
            checksum: self.checksum,
        }
    }

    fn position(&self) -> usize {
        self.writer.get_ref().len()
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MzMLError> {
        let mut element = BytesStart::new(name);
        element.extend_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    /// Start an element and return the offset of its `<`
    fn start_at(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<u64, MzMLError> {
        let before = self.position();
        self.start(name, attributes)?;
        let indent = self.writer.get_ref()[before..]
            .iter()
            .position(|&b| b == b'<')
            .unwrap_or(0);
        Ok((before + indent) as u64)
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MzMLError> {
        let mut element = BytesStart::new(name);
        element.extend_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), MzMLError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<(), MzMLError> {
        self.start(name, attributes)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn cv_param(&mut self, term: &CvTerm) -> Result<(), MzMLError> {
        let mut attributes = vec![
            ("cvRef", term.cv_ref()),
            ("accession", term.accession.as_str()),
            ("name", term.name.as_str()),
            ("value", term.value.as_deref().unwrap_or("")),
        ];
        if let (Some(unit_ref), Some(accession), Some(name)) = (
            term.unit_cv_ref(),
            term.unit_accession.as_deref(),
            term.unit_name.as_deref(),
        ) {
            attributes.push(("unitCvRef", unit_ref));
            attributes.push(("unitAccession", accession));
            attributes.push(("unitName", name));
        }
        self.empty("cvParam", &attributes)
    }

    fn document(&mut self, document: &SpectralDocument) -> Result<(), MzMLError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.start(
            "indexedmzML",
            &[
                ("xmlns", MZML_NAMESPACE),
                ("xmlns:xsi", XSI_NAMESPACE),
                ("xsi:schemaLocation", INDEXED_SCHEMA_LOCATION),
            ],
        )?;

        let mzml_id = document
            .source_file
            .as_ref()
            .and_then(|source| Path::new(source.name.as_str()).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned());
        let mut mzml_attributes = vec![
            ("xmlns", MZML_NAMESPACE),
            ("xmlns:xsi", XSI_NAMESPACE),
            ("xsi:schemaLocation", MZML_SCHEMA_LOCATION),
        ];
        if let Some(id) = mzml_id.as_deref() {
            mzml_attributes.push(("id", id));
        }
        mzml_attributes.push(("version", MZML_VERSION));
        self.start("mzML", &mzml_attributes)?;

        self.cv_list(&[PSI_MS, UNIT_ONTOLOGY])?;
        self.file_description(document)?;
        self.software_list(document)?;
        self.instrument_configuration_list(document)?;
        self.data_processing_list(document)?;
        self.run(document)?;
        self.end("mzML")?;

        self.index_list()?;
        self.end("indexedmzML")
    }

    fn cv_list(&mut self, vocabularies: &[Vocabulary]) -> Result<(), MzMLError> {
        self.start("cvList", &[("count", vocabularies.len().to_string().as_str())])?;
        for cv in vocabularies {
            self.empty(
                "cv",
                &[
                    ("id", cv.id),
                    ("fullName", cv.full_name),
                    ("version", cv.version),
                    ("URI", cv.uri),
                ],
            )?;
        }
        self.end("cvList")
    }

    fn file_description(&mut self, document: &SpectralDocument) -> Result<(), MzMLError> {
        self.start("fileDescription", &[])?;
        self.start("fileContent", &[])?;
        self.cv_param(&ms_terms::ms1_spectrum())?;
        self.end("fileContent")?;

        if let Some(source) = &document.source_file {
            self.start("sourceFileList", &[("count", "1")])?;
            self.start(
                "sourceFile",
                &[
                    ("id", SOURCE_FILE_ID),
                    ("name", source.name.as_str()),
                    ("location", source.location.as_str()),
                ],
            )?;
            self.cv_param(&ms_terms::scan_number_native_id())?;
            self.cv_param(&ms_terms::mass_spectrometer_file_format())?;
            self.end("sourceFile")?;
            self.end("sourceFileList")?;
        }
        self.end("fileDescription")
    }

    fn software_list(&mut self, document: &SpectralDocument) -> Result<(), MzMLError> {
        let software = &document.software;
        self.start("softwareList", &[("count", "1")])?;
        self.start(
            "software",
            &[("id", software.id.as_str()), ("version", software.version.as_str())],
        )?;
        self.cv_param(&software.cv_term())?;
        self.end("software")?;
        self.end("softwareList")
    }

    fn instrument_configuration_list(
        &mut self,
        document: &SpectralDocument,
    ) -> Result<(), MzMLError> {
        let instrument = &document.instrument;
        self.start("instrumentConfigurationList", &[("count", "1")])?;
        self.start("instrumentConfiguration", &[("id", instrument.id.as_str())])?;
        self.cv_param(&instrument.model)?;

        self.start(
            "componentList",
            &[("count", instrument.components.len().to_string().as_str())],
        )?;
        for component in &instrument.components {
            let name = component.kind.element_name();
            self.start(name, &[("order", component.order.to_string().as_str())])?;
            self.cv_param(&component.term)?;
            self.end(name)?;
        }
        self.end("componentList")?;

        self.empty("softwareRef", &[("ref", document.software.id.as_str())])?;
        self.end("instrumentConfiguration")?;
        self.end("instrumentConfigurationList")
    }

    fn data_processing_list(&mut self, document: &SpectralDocument) -> Result<(), MzMLError> {
        let processing = &document.data_processing;
        self.start("dataProcessingList", &[("count", "1")])?;
        self.start("dataProcessing", &[("id", processing.id.as_str())])?;
        for (order, method) in processing.methods.iter().enumerate() {
            self.start(
                "processingMethod",
                &[
                    ("order", order.to_string().as_str()),
                    ("softwareRef", document.software.id.as_str()),
                ],
            )?;
            self.cv_param(method)?;
            self.end("processingMethod")?;
        }
        self.end("dataProcessing")?;
        self.end("dataProcessingList")
    }

    fn run(&mut self, document: &SpectralDocument) -> Result<(), MzMLError> {
        let start_time_stamp = document
            .start_time_stamp
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string());
        let mut attributes = vec![
            ("id", super::document::RUN_ID),
            ("defaultInstrumentConfigurationRef", document.instrument.id.as_str()),
        ];
        if document.source_file.is_some() {
            attributes.push(("defaultSourceFileRef", SOURCE_FILE_ID));
        }
        if let Some(stamp) = start_time_stamp.as_deref() {
            attributes.push(("startTimeStamp", stamp));
        }
        self.start("run", &attributes)?;

        let processing_id = document.data_processing.id.as_str();
        self.start(
            "spectrumList",
            &[
                ("count", document.spectra.len().to_string().as_str()),
                ("defaultDataProcessingRef", processing_id),
            ],
        )?;
        for spectrum in &document.spectra {
            self.spectrum(spectrum, &document.instrument.id)?;
        }
        self.end("spectrumList")?;

        self.start(
            "chromatogramList",
            &[("count", "1"), ("defaultDataProcessingRef", processing_id)],
        )?;
        self.chromatogram(&document.chromatogram, 0)?;
        self.end("chromatogramList")?;

        self.end("run")
    }

    fn spectrum(&mut self, spectrum: &Spectrum, instrument_id: &str) -> Result<(), MzMLError> {
        let offset = self.start_at(
            "spectrum",
            &[
                ("index", spectrum.index.to_string().as_str()),
                ("id", spectrum.id.as_str()),
                ("defaultArrayLength", spectrum.len().to_string().as_str()),
            ],
        )?;
        self.spectrum_offsets.push((spectrum.id.clone(), offset));

        self.cv_param(&ms_terms::ms_level(1))?;
        self.cv_param(&ms_terms::ms1_spectrum())?;
        self.cv_param(&ms_terms::centroid_spectrum())?;
        self.cv_param(&ms_terms::total_ion_current(spectrum.total_ion_current()))?;

        self.start("scanList", &[("count", "1")])?;
        self.cv_param(&ms_terms::no_combination())?;
        self.start("scan", &[("instrumentConfigurationRef", instrument_id)])?;
        self.cv_param(&ms_terms::scan_start_time(spectrum.scan_start_time))?;
        self.end("scan")?;
        self.end("scanList")?;

        self.start("binaryDataArrayList", &[("count", "2")])?;
        self.binary_array(&spectrum.mz, ms_terms::mz_array())?;
        self.binary_array(&spectrum.intensity, ms_terms::intensity_array())?;
        self.end("binaryDataArrayList")?;

        self.end("spectrum")
    }

    fn chromatogram(&mut self, chromatogram: &Chromatogram, index: usize) -> Result<(), MzMLError> {
        let offset = self.start_at(
            "chromatogram",
            &[
                ("index", index.to_string().as_str()),
                ("id", chromatogram.id.as_str()),
                ("defaultArrayLength", chromatogram.time.len().to_string().as_str()),
            ],
        )?;
        self.chromatogram_offsets.push((chromatogram.id.clone(), offset));

        self.cv_param(&ms_terms::tic_chromatogram())?;
        self.start("binaryDataArrayList", &[("count", "2")])?;
        self.binary_array(&chromatogram.time, ms_terms::time_array())?;
        self.binary_array(&chromatogram.intensity, ms_terms::intensity_array())?;
        self.end("binaryDataArrayList")?;

        self.end("chromatogram")
    }

    fn binary_array(&mut self, values: &[f64], array_type: CvTerm) -> Result<(), MzMLError> {
        let encoded = self.encoder.encode(values)?;
        self.start(
            "binaryDataArray",
            &[("encodedLength", encoded.len().to_string().as_str())],
        )?;
        let compression = self.encoder.compression().cv_term();
        self.cv_param(&ms_terms::float64())?;
        self.cv_param(&compression)?;
        self.cv_param(&array_type)?;
        self.text_element("binary", &[], &encoded)?;
        self.end("binaryDataArray")
    }

    fn index_list(&mut self) -> Result<(), MzMLError> {
        let index_list_offset = self.start_at("indexList", &[("count", "2")])?;

        let spectrum_offsets = std::mem::take(&mut self.spectrum_offsets);
        let chromatogram_offsets = std::mem::take(&mut self.chromatogram_offsets);
        for (name, offsets) in [
            ("spectrum", spectrum_offsets),
            ("chromatogram", chromatogram_offsets),
        ] {
            self.start("index", &[("name", name)])?;
            for (id, offset) in offsets {
                self.text_element("offset", &[("idRef", id.as_str())], offset.to_string().as_str())?;
            }
            self.end("index")?;
        }
        self.end("indexList")?;

        self.text_element("indexListOffset", &[], index_list_offset.to_string().as_str())?;

        self.start("fileChecksum", &[])?;
        self.checksum = sha1_hex(self.writer.get_ref());
        let checksum = self.checksum.clone();
        self.writer
            .write_event(Event::Text(BytesText::new(&checksum)))?;
        self.end("fileChecksum")
    }
}
