//! Re-reading written mzML documents
//!
//! [`DocumentSummary`] pulls a whole document through quick-xml once and keeps
//! what verification needs: root attributes, every spectrum and chromatogram
//! with decoded arrays, where scan start times were found, the offset index
//! and the file checksum.

use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sha1::{Digest, Sha1};

use super::binary::BinaryDecoder;
use super::cv_params::{CvParam, MS_CV_ACCESSIONS};
use super::MzMLError;

const FILE_CHECKSUM_OPEN: &[u8] = b"<fileChecksum>";

/// Get an attribute value from a start tag
pub(crate) fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, MzMLError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = std::str::from_utf8(&attr.value)?.to_string();
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Parse a cvParam element
pub(crate) fn parse_cv_param(e: &BytesStart) -> Result<CvParam, MzMLError> {
    Ok(CvParam {
        cv_ref: get_attribute(e, "cvRef")?.unwrap_or_default(),
        accession: get_attribute(e, "accession")?.unwrap_or_default(),
        name: get_attribute(e, "name")?.unwrap_or_default(),
        value: get_attribute(e, "value")?,
        unit_cv_ref: get_attribute(e, "unitCvRef")?,
        unit_accession: get_attribute(e, "unitAccession")?,
        unit_name: get_attribute(e, "unitName")?,
    })
}

/// Name and attributes of a root element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RootElement {
    /// Qualified element name
    pub name: String,
    /// Attributes by qualified name
    pub attributes: BTreeMap<String, String>,
}

impl RootElement {
    fn from_start(e: &BytesStart) -> Result<Self, MzMLError> {
        let mut attributes = BTreeMap::new();
        for attr in e.attributes() {
            let attr = attr?;
            attributes.insert(
                std::str::from_utf8(attr.key.as_ref())?.to_string(),
                std::str::from_utf8(&attr.value)?.to_string(),
            );
        }
        Ok(Self {
            name: std::str::from_utf8(e.name().as_ref())?.to_string(),
            attributes,
        })
    }

    /// Value of the attribute `key`
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// A spectrum as read back from the document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectrumSummary {
    /// `index` attribute
    pub index: Option<usize>,
    /// `id` attribute
    pub id: String,
    /// `defaultArrayLength` attribute
    pub default_array_length: usize,
    /// MS level
    pub ms_level: Option<u8>,
    /// Scan start time in seconds, from the `<scan>` element
    pub scan_start_time: Option<f64>,
    /// Total ion current
    pub total_ion_current: Option<f64>,
    /// Decoded m/z array
    pub mz: Vec<f64>,
    /// Decoded intensity array
    pub intensity: Vec<f64>,
}

/// A chromatogram as read back from the document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromatogramSummary {
    /// `id` attribute
    pub id: String,
    /// `defaultArrayLength` attribute
    pub default_array_length: usize,
    /// Whether the chromatogram is typed as a total ion current chromatogram
    pub is_total_ion_current: bool,
    /// Decoded time array
    pub time: Vec<f64>,
    /// Decoded intensity array
    pub intensity: Vec<f64>,
}

/// One `<offset>` entry of the index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Referenced element id
    pub id: String,
    /// Byte offset of the element
    pub offset: u64,
}

/// Everything verification looks at in a document
#[derive(Debug, Clone, Default)]
pub struct DocumentSummary {
    /// `<indexedmzML>` wrapper, if present
    pub indexed_root: Option<RootElement>,
    /// `<mzML>` element
    pub mzml_root: Option<RootElement>,
    /// Spectra in document order
    pub spectra: Vec<SpectrumSummary>,
    /// Chromatograms in document order
    pub chromatograms: Vec<ChromatogramSummary>,
    /// Scan start times attached directly to `<spectrum>`
    pub spectrum_level_scan_times: usize,
    /// Scan start times attached to `<scan>`
    pub scan_level_scan_times: usize,
    /// Spectrum offsets from the index
    pub spectrum_index: Vec<IndexEntry>,
    /// Chromatogram offsets from the index
    pub chromatogram_index: Vec<IndexEntry>,
    /// `indexListOffset` value
    pub index_list_offset: Option<u64>,
    /// Ids whose index offset does not point at their element
    pub misplaced_offsets: Vec<String>,
    /// Whether `indexListOffset` points at `<indexList`
    pub index_list_offset_valid: bool,
    /// Stored `fileChecksum`
    pub file_checksum: Option<String>,
    /// SHA-1 of the bytes up to and including `<fileChecksum>`
    pub computed_checksum: Option<String>,
}

impl DocumentSummary {
    /// Read and summarize an mzML file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MzMLError> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Summarize an mzML document held in memory
    pub fn from_bytes(data: &[u8]) -> Result<Self, MzMLError> {
        let mut reader = Reader::from_reader(data);
        reader.config_mut().trim_text(true);

        let mut parser = Parser::default();
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    parser.open(e)?;
                    parser.stack.push(e.local_name().as_ref().to_vec());
                }
                Event::Empty(ref e) => {
                    parser.open(e)?;
                    parser.close(e.local_name().as_ref())?;
                }
                Event::Text(ref t) => {
                    let text = t.unescape()?;
                    parser.text(&text);
                }
                Event::End(ref e) => {
                    parser.stack.pop();
                    parser.close(e.local_name().as_ref())?;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !parser.stack.is_empty() {
            return Err(MzMLError::InvalidStructure(
                "document ends inside an open element".to_string(),
            ));
        }

        let mut summary = parser.summary;
        summary.check_offsets(data);
        summary.computed_checksum = checksum_prefix(data);
        Ok(summary)
    }

    fn check_offsets(&mut self, data: &[u8]) {
        let spectra = self.spectrum_index.iter().map(|e| (e, &b"<spectrum"[..]));
        let chromatograms = self
            .chromatogram_index
            .iter()
            .map(|e| (e, &b"<chromatogram"[..]));
        self.misplaced_offsets = spectra
            .chain(chromatograms)
            .filter(|(entry, tag)| !element_at(data, entry.offset, tag, Some(&entry.id)))
            .map(|(entry, _)| entry.id.clone())
            .collect();

        self.index_list_offset_valid = self
            .index_list_offset
            .is_some_and(|offset| element_at(data, offset, b"<indexList", None));
    }

    /// Whether the document carries an offset index
    pub fn is_indexed(&self) -> bool {
        self.index_list_offset.is_some()
    }
}

/// True if an element with the given tag (and id) starts at `offset`
fn element_at(data: &[u8], offset: u64, tag: &[u8], id: Option<&str>) -> bool {
    let Some(rest) = usize::try_from(offset).ok().and_then(|o| data.get(o..)) else {
        return false;
    };
    if !rest.starts_with(tag) {
        return false;
    }
    let Some(id) = id else {
        return true;
    };
    let end = rest.iter().position(|&b| b == b'>').unwrap_or(rest.len());
    let needle = format!("id=\"{}\"", id);
    rest[..end]
        .windows(needle.len())
        .any(|w| w == needle.as_bytes())
}

/// Lowercase hex SHA-1 of everything through the last `<fileChecksum>` tag
pub(crate) fn checksum_prefix(data: &[u8]) -> Option<String> {
    let position = data
        .windows(FILE_CHECKSUM_OPEN.len())
        .rposition(|w| w == FILE_CHECKSUM_OPEN)?;
    Some(sha1_hex(&data[..position + FILE_CHECKSUM_OPEN.len()]))
}

pub(crate) fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Default)]
struct ArrayContext {
    accessions: Vec<String>,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Owner {
    Spectrum,
    Chromatogram,
}

#[derive(Default)]
struct Parser {
    summary: DocumentSummary,
    stack: Vec<Vec<u8>>,
    array: Option<ArrayContext>,
    index_name: Option<String>,
    offset_id: Option<String>,
}

impl Parser {
    fn parent(&self) -> Vec<u8> {
        self.stack.last().cloned().unwrap_or_default()
    }

    fn owner(&self) -> Option<Owner> {
        self.stack.iter().rev().find_map(|name| match name.as_slice() {
            b"spectrum" => Some(Owner::Spectrum),
            b"chromatogram" => Some(Owner::Chromatogram),
            _ => None,
        })
    }

    fn open(&mut self, e: &BytesStart) -> Result<(), MzMLError> {
        match e.local_name().as_ref() {
            b"indexedmzML" => self.summary.indexed_root = Some(RootElement::from_start(e)?),
            b"mzML" => self.summary.mzml_root = Some(RootElement::from_start(e)?),
            b"spectrum" => self.summary.spectra.push(SpectrumSummary {
                index: get_attribute(e, "index")?.and_then(|s| s.parse().ok()),
                id: get_attribute(e, "id")?.unwrap_or_default(),
                default_array_length: array_length(e)?,
                ..Default::default()
            }),
            b"chromatogram" => self.summary.chromatograms.push(ChromatogramSummary {
                id: get_attribute(e, "id")?.unwrap_or_default(),
                default_array_length: array_length(e)?,
                ..Default::default()
            }),
            b"binaryDataArray" => self.array = Some(ArrayContext::default()),
            b"cvParam" => {
                let param = parse_cv_param(e)?;
                self.cv_param(param);
            }
            b"index" => self.index_name = get_attribute(e, "name")?,
            b"offset" => self.offset_id = get_attribute(e, "idRef")?,
            _ => {}
        }
        Ok(())
    }

    fn cv_param(&mut self, param: CvParam) {
        match self.parent().as_slice() {
            b"binaryDataArray" => {
                if let Some(array) = self.array.as_mut() {
                    array.accessions.push(param.accession);
                }
            }
            b"spectrum" => {
                let Some(spectrum) = self.summary.spectra.last_mut() else {
                    return;
                };
                match param.accession.as_str() {
                    MS_CV_ACCESSIONS::SCAN_START_TIME => {
                        self.summary.spectrum_level_scan_times += 1;
                    }
                    MS_CV_ACCESSIONS::TOTAL_ION_CURRENT => {
                        spectrum.total_ion_current = param.value_as_f64();
                    }
                    MS_CV_ACCESSIONS::MS_LEVEL => {
                        spectrum.ms_level = param.value.as_deref().and_then(|v| v.parse().ok());
                    }
                    _ => {}
                }
            }
            b"scan" if param.accession == MS_CV_ACCESSIONS::SCAN_START_TIME => {
                self.summary.scan_level_scan_times += 1;
                if let Some(spectrum) = self.summary.spectra.last_mut() {
                    spectrum.scan_start_time = param.value_as_f64();
                }
            }
            b"chromatogram" if param.accession == MS_CV_ACCESSIONS::TIC_CHROMATOGRAM => {
                if let Some(chromatogram) = self.summary.chromatograms.last_mut() {
                    chromatogram.is_total_ion_current = true;
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        match self.parent().as_slice() {
            b"binary" => {
                if let Some(array) = self.array.as_mut() {
                    array.text.push_str(text);
                }
            }
            b"offset" => {
                let entry = IndexEntry {
                    id: self.offset_id.take().unwrap_or_default(),
                    offset: text.trim().parse().unwrap_or(u64::MAX),
                };
                match self.index_name.as_deref() {
                    Some("spectrum") => self.summary.spectrum_index.push(entry),
                    Some("chromatogram") => self.summary.chromatogram_index.push(entry),
                    _ => {}
                }
            }
            b"indexListOffset" => self.summary.index_list_offset = text.trim().parse().ok(),
            b"fileChecksum" => self.summary.file_checksum = Some(text.trim().to_string()),
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) -> Result<(), MzMLError> {
        match name {
            b"binaryDataArray" => {
                let Some(array) = self.array.take() else {
                    return Ok(());
                };
                self.finish_array(array)?;
            }
            b"index" => self.index_name = None,
            _ => {}
        }
        Ok(())
    }

    fn finish_array(&mut self, array: ArrayContext) -> Result<(), MzMLError> {
        let has = |accession: &str| array.accessions.iter().any(|a| a == accession);
        let accessions = array.accessions.iter().map(String::as_str);

        match self.owner() {
            Some(Owner::Spectrum) => {
                let Some(spectrum) = self.summary.spectra.last_mut() else {
                    return Ok(());
                };
                let values = BinaryDecoder::decode_with_accessions(
                    &array.text,
                    accessions,
                    Some(spectrum.default_array_length),
                )?;
                if has(MS_CV_ACCESSIONS::MZ_ARRAY) {
                    spectrum.mz = values;
                } else if has(MS_CV_ACCESSIONS::INTENSITY_ARRAY) {
                    spectrum.intensity = values;
                }
            }
            Some(Owner::Chromatogram) => {
                let Some(chromatogram) = self.summary.chromatograms.last_mut() else {
                    return Ok(());
                };
                let values = BinaryDecoder::decode_with_accessions(
                    &array.text,
                    accessions,
                    Some(chromatogram.default_array_length),
                )?;
                if has(MS_CV_ACCESSIONS::TIME_ARRAY) {
                    chromatogram.time = values;
                } else if has(MS_CV_ACCESSIONS::INTENSITY_ARRAY) {
                    chromatogram.intensity = values;
                }
            }
            None => {}
        }
        Ok(())
    }
}

fn array_length(e: &BytesStart) -> Result<usize, MzMLError> {
    Ok(get_attribute(e, "defaultArrayLength")?
        .and_then(|s| s.parse().ok())
        .unwrap_or(0))
}
