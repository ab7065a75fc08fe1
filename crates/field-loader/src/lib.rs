//! Grid masks and parameter field loading.
//!
//! Grid files are binary keyword streams (`EGRID`/`GRID`). The active-cell
//! mask comes from `ACTNUM` or, failing that, the activity flag of `COORDS`
//! records. Field files are GRDECL text or binary keyword files; values are
//! placed onto the grid and inactive cells are set to NaN.

pub mod config;
pub mod error;
pub mod export;
pub mod mask;
pub mod masked;
pub mod transform;

pub use config::{FieldConfig, FieldFileFormat};
pub use error::{FieldError, FieldResult};
pub use export::{export_field, export_with_config};
pub use mask::{read_active_mask, read_inactive_mask, GridMask, GridMaskReader, MaskCacheStats};
pub use masked::{mask_data, read_field, read_masked_field, GridDescriptor, MaskedArray};
pub use transform::{transform, FieldTransform, Truncation};
