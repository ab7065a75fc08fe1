//! Common types shared across the ensemble ingestion crates.

pub mod error;
pub mod grid;
pub mod realization;

pub use error::{EnsError, EnsResult};
pub use grid::{fortran_values, ActiveMask, GridShape, InactiveMask};
pub use realization::RealizationState;
