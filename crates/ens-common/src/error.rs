//! Error types for shared value types.

use thiserror::Error;

/// Result type alias using EnsError.
pub type EnsResult<T> = Result<T, EnsError>;

/// Errors raised while constructing shared value types.
#[derive(Debug, Error)]
pub enum EnsError {
    #[error("Invalid grid shape: {0}")]
    InvalidShape(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Unknown realization state code: {0}")]
    UnknownState(u8),
}
