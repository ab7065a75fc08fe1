//! Error types for ensemble storage.

use ens_common::{EnsError, RealizationState};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by storage backends and ensemble accessors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a specific path
    #[error("I/O error on {path:?}: {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not found: {0:?}")]
    NotFound(PathBuf),

    /// Write target's parent directory does not exist
    #[error("Parent directory of {0:?} does not exist")]
    MissingParent(PathBuf),

    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("{0:?} is a directory")]
    IsADirectory(PathBuf),

    /// An ensemble index is already present at this location
    #[error("Ensemble index already exists at {0:?}")]
    IndexExists(PathBuf),

    /// Field data is written once per realization
    #[error("Data for {key} in realization {iens} already exists")]
    AlreadyExists { key: String, iens: usize },

    #[error("Realization {iens} is out of range for ensemble of size {size}")]
    RealizationOutOfRange { iens: usize, size: usize },

    #[error("Invalid parameter key {0:?}")]
    InvalidKey(String),

    #[error("Illegal state transition for realization {iens}: {from} -> {to}")]
    IllegalTransition {
        iens: usize,
        from: RealizationState,
        to: RealizationState,
    },

    #[error("Ensemble {0} not found")]
    EnsembleNotFound(Uuid),

    /// Field blob or state map content is malformed
    #[error("Codec error: {0}")]
    Codec(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] EnsError),
}

impl StorageError {
    /// Attach `path` to an I/O error, mapping missing files to `NotFound`.
    pub(crate) fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            _ => Self::PathIo { path, source },
        }
    }
}
