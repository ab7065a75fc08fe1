//! Error types for grid masks and field loading.

use ecl_parser::EclError;
use ens_common::{EnsError, GridShape};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for field operations.
pub type FieldResult<T> = Result<T, FieldError>;

/// Errors raised while reading grids, masks and parameter fields.
#[derive(Error, Debug)]
pub enum FieldError {
    /// Keyword file or GRDECL parsing failed
    #[error(transparent)]
    Ecl(#[from] EclError),

    /// Shape or mask construction failed
    #[error(transparent)]
    Common(#[from] EnsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither the grid file nor the caller provided dimensions
    #[error("Could not determine grid dimensions for {0:?}: no GRIDHEAD or DIMENS record and no shape given")]
    MissingShape(PathBuf),

    /// A record in the grid file has unexpected content
    #[error("Invalid grid {path:?}: {reason}")]
    InvalidGrid { path: PathBuf, reason: String },

    /// A COORDS record addresses a cell outside the grid
    #[error("Cell ({i}, {j}, {k}) is outside grid {shape}")]
    CoordinateOutOfBounds {
        i: i64,
        j: i64,
        k: i64,
        shape: GridShape,
    },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: GridShape, actual: GridShape },

    /// Value count matches neither all cells nor active cells
    #[error("Field {field} has {found} values; grid has {cells} cells of which {active} are active")]
    FieldSize {
        field: String,
        found: usize,
        cells: usize,
        active: usize,
    },

    /// Field keyword holds character or message data
    #[error("Field {0} does not hold numeric data")]
    NotNumeric(String),

    #[error("Unknown transform {name:?}, available transforms: {available}")]
    UnknownTransform { name: String, available: String },

    #[error("Cannot determine field file format of {0:?}: expected a .grdecl or .roff extension")]
    UnknownFileFormat(PathBuf),

    #[error("{0} files are not supported")]
    UnsupportedFormat(&'static str),

    #[error("Invalid truncation: {0}")]
    InvalidTruncation(String),
}
