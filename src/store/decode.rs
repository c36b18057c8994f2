//! Decoding of compressed occurrence batches and signature blobs.
//!
//! A chunk's `occurrences` column holds a zstd-compressed SCIP `Document`
//! message whose only populated field is `occurrences`. A symbol's
//! `signature` column holds an uncompressed SCIP `Document` whose `text` is
//! the rendered signature.

use protobuf::Message;
use scip::types::{Document, Occurrence, SymbolRole};

use super::error::DecodeError;

pub const ROLE_DEFINITION: i32 = SymbolRole::Definition as i32;
pub const ROLE_IMPORT: i32 = SymbolRole::Import as i32;
pub const ROLE_WRITE_ACCESS: i32 = SymbolRole::WriteAccess as i32;

/// A decoded 0-based source range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl Range {
    /// Parse SCIP's `[line, col, end_col]` or `[line, col, end_line, end_col]` encoding.
    pub fn from_scip(range: &[i32]) -> Result<Self, DecodeError> {
        let invalid = || DecodeError::InvalidRange(range.to_vec());
        let to_u32 = |v: i32| u32::try_from(v).map_err(|_| invalid());

        match *range {
            [line, col, end_col] => Ok(Self {
                start_line: to_u32(line)?,
                start_col: to_u32(col)?,
                end_line: to_u32(line)?,
                end_col: to_u32(end_col)?,
            }),
            [line, col, end_line, end_col] => Ok(Self {
                start_line: to_u32(line)?,
                start_col: to_u32(col)?,
                end_line: to_u32(end_line)?,
                end_col: to_u32(end_col)?,
            }),
            _ => Err(invalid()),
        }
    }
}

pub fn is_definition(roles: i32) -> bool {
    roles & ROLE_DEFINITION != 0
}

/// Label for a non-definition occurrence.
pub fn role_label(roles: i32) -> &'static str {
    if roles & ROLE_WRITE_ACCESS != 0 {
        "write"
    } else if roles & ROLE_IMPORT != 0 {
        "import"
    } else {
        "reference"
    }
}

/// Decode a chunk's compressed occurrence batch.
pub fn decode_occurrences(blob: &[u8]) -> Result<Vec<Occurrence>, DecodeError> {
    let raw = zstd::stream::decode_all(blob)?;
    let batch = Document::parse_from_bytes(&raw)?;
    Ok(batch.occurrences)
}

/// Decode a stored signature into its text. An empty blob has no signature.
pub fn decode_signature(blob: &[u8]) -> Result<String, DecodeError> {
    if blob.is_empty() {
        return Ok(String::new());
    }
    let document = Document::parse_from_bytes(blob)?;
    Ok(document.text)
}

#[cfg(test)]
pub(crate) fn encode_occurrences(occurrences: &[Occurrence]) -> Vec<u8> {
    let mut batch = Document::new();
    batch.occurrences = occurrences.to_vec();
    let raw = batch.write_to_bytes().unwrap();
    zstd::stream::encode_all(raw.as_slice(), 0).unwrap()
}

#[cfg(test)]
pub(crate) fn encode_signature(text: &str) -> Vec<u8> {
    let mut document = Document::new();
    document.text = text.to_string();
    document.language = "go".to_string();
    document.write_to_bytes().unwrap()
}
