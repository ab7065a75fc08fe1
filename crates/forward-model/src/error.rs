//! Error types for forward-model callbacks and their configuration.

use field_loader::FieldError;
use storage::StorageError;
use thiserror::Error;

/// Result type for forward-model operations.
pub type Result<T> = std::result::Result<T, ForwardModelError>;

#[derive(Error, Debug)]
pub enum ForwardModelError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Two parameters share a key
    #[error("Duplicate parameter key {0:?}")]
    DuplicateKey(String),

    /// FIELD parameters need a grid to place their values on
    #[error("Parameter {0:?} is a FIELD but no grid file is configured")]
    MissingGridFile(String),

    #[error("Invalid parameter {key:?}: {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("Invalid runpath format {format:?}: {reason}")]
    InvalidRunpath { format: String, reason: String },
}
