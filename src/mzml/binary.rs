//! Binary data arrays for mzML
//!
//! mzML stores numerical arrays (m/z, intensity, time) as Base64-encoded
//! binary data, optionally compressed with zlib. Encoding runs the pipeline
//! forwards and decoding runs it backwards:
//!
//! 1. Lay out the values as little-endian floats
//! 2. Compress if requested (zlib)
//! 3. Base64 encode the bytes

use std::io::{Read, Write};

use base64::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};

use crate::controlled_vocabulary::{ms_terms, CvTerm};

/// Compression applied to binary data arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    /// No compression (raw binary)
    None,
    /// zlib compression
    #[default]
    Zlib,
}

impl CompressionType {
    /// Determine compression type from CV accession
    pub fn from_cv_accession(accession: &str) -> Option<Self> {
        match accession {
            "MS:1000574" => Some(CompressionType::Zlib),
            "MS:1000576" => Some(CompressionType::None),
            _ => None,
        }
    }

    /// CV term announcing this compression in a `binaryDataArray`
    pub fn cv_term(&self) -> CvTerm {
        match self {
            CompressionType::None => ms_terms::no_compression(),
            CompressionType::Zlib => ms_terms::zlib_compression(),
        }
    }
}

/// Binary encoding precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryEncoding {
    /// 32-bit floating point (CV: MS:1000521)
    Float32,
    /// 64-bit floating point (CV: MS:1000523)
    #[default]
    Float64,
}

impl BinaryEncoding {
    /// Determine encoding from CV accession
    pub fn from_cv_accession(accession: &str) -> Option<Self> {
        match accession {
            "MS:1000521" => Some(BinaryEncoding::Float32),
            "MS:1000523" => Some(BinaryEncoding::Float64),
            _ => None,
        }
    }

    /// Get the byte size per value
    pub fn byte_size(&self) -> usize {
        match self {
            BinaryEncoding::Float32 => 4,
            BinaryEncoding::Float64 => 8,
        }
    }
}

/// Errors that can occur during binary decoding
#[derive(Debug, thiserror::Error)]
pub enum BinaryDecodeError {
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Decompression error: {0}")]
    DecompressionError(#[from] std::io::Error),

    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Encoder for mzML binary data arrays. Values are always written as 64-bit floats.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryEncoder {
    compression: CompressionType,
}

impl BinaryEncoder {
    /// Create an encoder using the given compression
    pub fn new(compression: CompressionType) -> Self {
        Self { compression }
    }

    /// Compression this encoder applies
    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    /// Encode values into the text content of a `<binary>` element
    pub fn encode(&self, values: &[f64]) -> std::io::Result<String> {
        let mut bytes = Vec::with_capacity(values.len() * BinaryEncoding::Float64.byte_size());
        for &value in values {
            bytes.write_f64::<LittleEndian>(value)?;
        }

        let payload = match self.compression {
            CompressionType::None => bytes,
            CompressionType::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&bytes)?;
                encoder.finish()?
            }
        };

        Ok(BASE64_STANDARD.encode(payload))
    }
}

/// Decoder for mzML binary data arrays
pub struct BinaryDecoder;

impl BinaryDecoder {
    /// Decode a Base64-encoded binary array from mzML
    ///
    /// # Arguments
    /// * `base64_data` - The Base64-encoded string from the `<binary>` element
    /// * `encoding` - The numerical precision (32 or 64 bit)
    /// * `compression` - The compression type (none or zlib)
    /// * `expected_length` - Expected number of values (from defaultArrayLength)
    pub fn decode(
        base64_data: &str,
        encoding: BinaryEncoding,
        compression: CompressionType,
        expected_length: Option<usize>,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        let trimmed = base64_data.trim();
        let values = if trimmed.is_empty() {
            Vec::new()
        } else {
            let decoded_bytes = BASE64_STANDARD.decode(trimmed)?;

            let uncompressed = match compression {
                CompressionType::None => decoded_bytes,
                CompressionType::Zlib => {
                    let mut decoder = ZlibDecoder::new(&decoded_bytes[..]);
                    let mut uncompressed = Vec::new();
                    decoder.read_to_end(&mut uncompressed)?;
                    uncompressed
                }
            };

            Self::bytes_to_floats(&uncompressed, encoding)?
        };

        if let Some(expected) = expected_length {
            if values.len() != expected {
                return Err(BinaryDecodeError::InvalidLength {
                    expected,
                    actual: values.len(),
                });
            }
        }

        Ok(values)
    }

    /// Convert raw bytes to f64 values based on encoding
    fn bytes_to_floats(
        bytes: &[u8],
        encoding: BinaryEncoding,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        let byte_size = encoding.byte_size();

        if bytes.len() % byte_size != 0 {
            return Err(BinaryDecodeError::InvalidLength {
                expected: bytes.len() / byte_size * byte_size,
                actual: bytes.len(),
            });
        }

        let count = bytes.len() / byte_size;
        let mut values = Vec::with_capacity(count);
        let mut cursor = std::io::Cursor::new(bytes);

        match encoding {
            BinaryEncoding::Float32 => {
                for _ in 0..count {
                    values.push(cursor.read_f32::<LittleEndian>()? as f64);
                }
            }
            BinaryEncoding::Float64 => {
                for _ in 0..count {
                    values.push(cursor.read_f64::<LittleEndian>()?);
                }
            }
        }

        Ok(values)
    }

    /// Decode with the encoding and compression taken from the array's CV accessions
    pub fn decode_with_accessions<'a>(
        base64_data: &str,
        accessions: impl IntoIterator<Item = &'a str>,
        expected_length: Option<usize>,
    ) -> Result<Vec<f64>, BinaryDecodeError> {
        let mut encoding = BinaryEncoding::Float64;
        let mut compression = CompressionType::None;

        for accession in accessions {
            if let Some(enc) = BinaryEncoding::from_cv_accession(accession) {
                encoding = enc;
            }
            if let Some(comp) = CompressionType::from_cv_accession(accession) {
                compression = comp;
            }
        }

        Self::decode(base64_data, encoding, compression, expected_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_float64_uncompressed() {
        // 100.0 = 0x4059000000000000, 200.0 = 0x4069000000000000
        let bytes: [u8; 16] = [
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x59, 0x40, // 100.0
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x69, 0x40, // 200.0
        ];
        let base64_data = BASE64_STANDARD.encode(bytes);

        let result = BinaryDecoder::decode(
            &base64_data,
            BinaryEncoding::Float64,
            CompressionType::None,
            Some(2),
        )
        .unwrap();

        assert_eq!(result, vec![100.0, 200.0]);
    }

    #[test]
    fn test_decode_float32_uncompressed() {
        let bytes: [u8; 8] = [
            0x00, 0x00, 0xc8, 0x42, // 100.0
            0x00, 0x00, 0x48, 0x43, // 200.0
        ];
        let base64_data = BASE64_STANDARD.encode(bytes);

        let result = BinaryDecoder::decode(
            &base64_data,
            BinaryEncoding::Float32,
            CompressionType::None,
            Some(2),
        )
        .unwrap();

        assert!((result[0] - 100.0).abs() < 1e-5);
        assert!((result[1] - 200.0).abs() < 1e-5);
    }

    #[test]
    fn test_encode_uncompressed_matches_raw_layout() {
        let encoded = BinaryEncoder::new(CompressionType::None)
            .encode(&[100.0, 200.0])
            .unwrap();
        assert_eq!(encoded, "AAAAAAAAWUAAAAAAAABpQA==");
    }

    #[test]
    fn test_zlib_encoded_array_decodes() {
        let values = vec![50.0, 51.0, 2_000_000_000_000.0, 0.0];
        let encoded = BinaryEncoder::new(CompressionType::Zlib)
            .encode(&values)
            .unwrap();

        let decoded =
            BinaryDecoder::decode_with_accessions(&encoded, ["MS:1000523", "MS:1000574"], Some(4))
                .unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_empty_array() {
        let encoded = BinaryEncoder::default().encode(&[]).unwrap();
        let decoded =
            BinaryDecoder::decode(&encoded, BinaryEncoding::Float64, CompressionType::Zlib, Some(0))
                .unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_length_mismatch() {
        let encoded = BinaryEncoder::new(CompressionType::None)
            .encode(&[1.0, 2.0])
            .unwrap();
        let err = BinaryDecoder::decode(
            &encoded,
            BinaryEncoding::Float64,
            CompressionType::None,
            Some(3),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BinaryDecodeError::InvalidLength { expected: 3, actual: 2 }
        ));
    }
}
