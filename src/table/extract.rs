use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{Channel, ExtractError, RawTable};

/// Element whose text carries the delimited table
pub const DATA_ELEMENT: &[u8] = b"DATA";

/// Retention time in minutes, dropped
pub const RT_MINUTES_COLUMN: &str = "RT(minutes) - NOT USED BY IMPORT";
/// Retention index, dropped
pub const RETENTION_INDEX_COLUMN: &str = "RI";
/// Retention time in milliseconds, kept as the time axis
pub const RT_MILLISECONDS_COLUMN: &str = "RT(milliseconds)";

/// Field delimiter of the embedded table
pub const TABLE_DELIMITER: u8 = b';';

impl RawTable {
    /// Read the embedded table of a run file.
    pub fn from_run_file<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ExtractError::Io {
            file: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Read the embedded table from any XML source; `source` names it in errors.
    pub fn from_reader<R: BufRead>(reader: R, source: &Path) -> Result<Self, ExtractError> {
        let text = read_data_text(reader)
            .map_err(|e| ExtractError::Xml {
                file: source.to_path_buf(),
                source: e,
            })?
            .ok_or_else(|| ExtractError::MissingData {
                file: source.to_path_buf(),
            })?;
        Self::from_delimited(text.trim(), source)
    }

    /// Parse the `;`-delimited table text.
    pub fn from_delimited(text: &str, source: &Path) -> Result<Self, ExtractError> {
        let file = source.to_path_buf();
        let csv_error = |e: csv::Error| ExtractError::Csv {
            file: file.clone(),
            source: e,
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(TABLE_DELIMITER)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(str::to_string)
            .collect();

        let find = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| ExtractError::MissingColumn {
                    file: file.clone(),
                    column: column.to_string(),
                })
        };
        let rt_index = find(RT_MILLISECONDS_COLUMN)?;
        let minutes_index = find(RT_MINUTES_COLUMN)?;
        let ri_index = find(RETENTION_INDEX_COLUMN)?;

        // Trailing delimiters leave an unnamed empty column behind
        let mut channel_indices = Vec::new();
        let mut channels = Vec::new();
        for (i, label) in headers.iter().enumerate() {
            if i == rt_index || i == minutes_index || i == ri_index || label.is_empty() {
                continue;
            }
            let mz = label
                .parse::<f64>()
                .map_err(|_| ExtractError::InvalidChannel {
                    file: file.clone(),
                    label: label.clone(),
                })?;
            channel_indices.push(i);
            channels.push(Channel {
                label: label.clone(),
                mz,
            });
        }

        let mut retention_times_ms = Vec::new();
        let mut rows = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record.map_err(csv_error)?;
            let cell = |index: usize| -> Result<f64, ExtractError> {
                let value = record.get(index).unwrap_or_default();
                value.parse().map_err(|_| ExtractError::InvalidNumber {
                    file: file.clone(),
                    row: row + 1,
                    column: headers[index].clone(),
                    value: value.to_string(),
                })
            };

            retention_times_ms.push(cell(rt_index)?);
            rows.push(
                channel_indices
                    .iter()
                    .map(|&i| cell(i))
                    .collect::<Result<Vec<_>, _>>()?,
            );
        }

        if rows.is_empty() {
            return Err(ExtractError::EmptyTable { file });
        }

        Ok(RawTable {
            source: source.to_path_buf(),
            channels,
            retention_times_ms,
            rows,
        })
    }
}

/// Text of the last `DATA` element in the document, if any.
fn read_data_text<R: BufRead>(reader: R) -> Result<Option<String>, quick_xml::Error> {
    let mut xml = Reader::from_reader(reader);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut last: Option<String> = None;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) if e.local_name().as_ref() == DATA_ELEMENT => {
                current = Some(String::new());
            }
            Event::Empty(ref e) if e.local_name().as_ref() == DATA_ELEMENT => {
                last = Some(String::new());
            }
            Event::Text(ref t) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(ref t) => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&t.decode()?);
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == DATA_ELEMENT => {
                last = current.take();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(last)
}
