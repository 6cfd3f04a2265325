use std::path::PathBuf;

/// Errors raised while extracting the reading table from a run file.
///
/// Every variant names the run file it came from so the batch driver can
/// collect failures without losing track of their origin.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The run file could not be opened or read
    #[error("{file}: I/O error: {source}")]
    Io {
        /// Run file
        file: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The run file is not well-formed XML
    #[error("{file}: XML parsing error: {source}")]
    Xml {
        /// Run file
        file: PathBuf,
        /// Underlying error
        #[source]
        source: quick_xml::Error,
    },

    /// No `DATA` element carries the embedded table
    #[error("{file}: no embedded DATA table found")]
    MissingData {
        /// Run file
        file: PathBuf,
    },

    /// The embedded table is not valid delimited text
    #[error("{file}: malformed table: {source}")]
    Csv {
        /// Run file
        file: PathBuf,
        /// Underlying error
        #[source]
        source: csv::Error,
    },

    /// A required column is missing from the table header
    #[error("{file}: missing required column {column:?}")]
    MissingColumn {
        /// Run file
        file: PathBuf,
        /// Column name
        column: String,
    },

    /// An intensity column header is not an m/z value
    #[error("{file}: channel header {label:?} is not a numeric m/z")]
    InvalidChannel {
        /// Run file
        file: PathBuf,
        /// Column header
        label: String,
    },

    /// A cell does not hold a number
    #[error("{file}: row {row}, column {column:?}: cannot parse {value:?} as a number")]
    InvalidNumber {
        /// Run file
        file: PathBuf,
        /// 1-based data row
        row: usize,
        /// Column header
        column: String,
        /// Cell content
        value: String,
    },

    /// The table has a header but no data rows
    #[error("{file}: table has no rows")]
    EmptyTable {
        /// Run file
        file: PathBuf,
    },
}
