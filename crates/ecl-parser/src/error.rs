//! Error types for keyword file parsing.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for keyword file operations.
pub type EclResult<T> = Result<T, EclError>;

/// Errors raised while reading or writing keyword files.
#[derive(Error, Debug)]
pub enum EclError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file could not be opened
    #[error("Failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stream ended inside a record
    #[error("Truncated record at byte {offset}: expected {expected} bytes, found {found}")]
    Truncated {
        offset: u64,
        expected: usize,
        found: usize,
    },

    /// Record markers or header fields are inconsistent
    #[error("Invalid record at byte {offset}: {reason}")]
    InvalidRecord { offset: u64, reason: String },

    /// Unrecognized 4-character type tag
    #[error("Unknown data type tag: {0:?}")]
    UnknownType(String),

    /// Keyword longer than eight characters
    #[error("Invalid keyword {0:?}: keywords are at most 8 characters")]
    InvalidKeyword(String),

    /// `read_array` called without a pending header
    #[error("No pending record to read")]
    NoPendingRecord,

    /// Requested keyword is absent from the file
    #[error("Keyword {0} not found")]
    KeywordNotFound(String),

    /// Malformed GRDECL text
    #[error("GRDECL syntax error on line {line}: {reason}")]
    Grdecl { line: usize, reason: String },
}

impl EclError {
    pub(crate) fn invalid(offset: u64, reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            offset,
            reason: reason.into(),
        }
    }
}
