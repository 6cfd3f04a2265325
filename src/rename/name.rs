use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::RenameError;
use crate::staging::RUN_FILE_EXTENSION;

/// Tokens needed before a name can be mapped to its canonical form
pub const MIN_NAME_TOKENS: usize = 5;

/// Width of the zero-padded sequence prefix
pub const SEQUENCE_WIDTH: usize = 5;

/// Largest sequence index that fits in the prefix
pub const MAX_SEQUENCE: u32 = 99_999;

/// The parsed parts of a run file name.
///
/// Instrument exports look like `2024-01-15_0930_MS_A1-01.msv`; the canonical
/// form prefixes a sequence index and normalizes every delimiter:
/// `00007_2024_01_15__0930_MS_A1_01.msv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalName {
    /// Acquisition year
    pub year: String,
    /// Acquisition month
    pub month: String,
    /// Acquisition day
    pub day: String,
    /// Acquisition time of day (`HHMM` or `HHMMSS`)
    pub time: String,
    /// Acquisition type code
    pub acquisition_type: String,
    /// First trailing code (channel or column identifier)
    pub code1: String,
    /// Second trailing code, extension removed
    pub code2: String,
}

impl CanonicalName {
    /// Parse an instrument-style file name.
    ///
    /// The name is split on `-`, `--` and `_`. The first five tokens are the
    /// year, month, day, time and type; the last two are the trailing codes.
    pub fn parse(file_name: &str) -> Result<Self, RenameError> {
        let tokens = tokenize(file_name);
        if tokens.len() < MIN_NAME_TOKENS {
            return Err(RenameError::MalformedName {
                file: file_name.to_string(),
                expected: MIN_NAME_TOKENS,
                found: tokens.len(),
            });
        }

        let n = tokens.len();
        Ok(Self {
            year: tokens[0].to_string(),
            month: tokens[1].to_string(),
            day: tokens[2].to_string(),
            time: tokens[3].to_string(),
            acquisition_type: tokens[4].to_string(),
            code1: tokens[n - 2].to_string(),
            code2: strip_extension(tokens[n - 1]).to_string(),
        })
    }

    /// Parse a name that is already canonical, returning its sequence index.
    pub fn parse_canonical(file_name: &str) -> Option<(u32, Self)> {
        if !is_canonical(file_name) {
            return None;
        }
        let sequence = file_name[..SEQUENCE_WIDTH].parse().ok()?;
        let rest = strip_extension(&file_name[SEQUENCE_WIDTH + 1..]);
        let tokens: Vec<&str> = rest.split('_').collect();
        match tokens.as_slice() {
            [year, month, day, "", time, acquisition_type, code1, code2] => Some((
                sequence,
                Self {
                    year: year.to_string(),
                    month: month.to_string(),
                    day: day.to_string(),
                    time: time.to_string(),
                    acquisition_type: acquisition_type.to_string(),
                    code1: code1.to_string(),
                    code2: code2.to_string(),
                },
            )),
            _ => None,
        }
    }

    /// Canonical file name for the given sequence index
    pub fn file_name(&self, sequence: u32) -> String {
        format!(
            "{:0width$}_{}.{}",
            sequence,
            self,
            RUN_FILE_EXTENSION,
            width = SEQUENCE_WIDTH
        )
    }

    /// Acquisition date and time, when the name tokens are numeric
    pub fn acquisition_time(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(
            self.year.parse().ok()?,
            self.month.parse().ok()?,
            self.day.parse().ok()?,
        )?;

        let digits = |range: std::ops::Range<usize>| -> Option<u32> {
            self.time.get(range)?.parse().ok()
        };
        let time = match self.time.len() {
            4 => NaiveTime::from_hms_opt(digits(0..2)?, digits(2..4)?, 0)?,
            6 => NaiveTime::from_hms_opt(digits(0..2)?, digits(2..4)?, digits(4..6)?)?,
            _ => return None,
        };

        Some(NaiveDateTime::new(date, time))
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}__{}_{}_{}_{}",
            self.year,
            self.month,
            self.day,
            self.time,
            self.acquisition_type,
            self.code1,
            self.code2
        )
    }
}

/// Returns true if the name already starts with a five-digit sequence and `_`.
pub fn is_canonical(file_name: &str) -> bool {
    let bytes = file_name.as_bytes();
    bytes.len() > SEQUENCE_WIDTH
        && bytes[..SEQUENCE_WIDTH].iter().all(u8::is_ascii_digit)
        && bytes[SEQUENCE_WIDTH] == b'_'
}

/// Split on `_`, `-` and `--`; a double dash counts as a single delimiter.
pub(crate) fn tokenize(name: &str) -> Vec<&str> {
    let bytes = name.as_bytes();
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                tokens.push(&name[start..i]);
                i += 1;
                start = i;
            }
            b'-' => {
                tokens.push(&name[start..i]);
                i += if bytes.get(i + 1) == Some(&b'-') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    tokens.push(&name[start..]);
    tokens
}

fn strip_extension(token: &str) -> &str {
    let suffix_len = RUN_FILE_EXTENSION.len() + 1;
    if token.len() < suffix_len {
        return token;
    }
    let split = token.len() - suffix_len;
    match token.get(split..) {
        Some(suffix)
            if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(RUN_FILE_EXTENSION) =>
        {
            &token[..split]
        }
        _ => token,
    }
}
