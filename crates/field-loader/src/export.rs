//! Writing fields back out for simulator consumption.

use ecl_parser::{write_grdecl_keyword, EclArray, EclWriter};
use ens_common::{fortran_values, GridShape};
use ndarray::Array3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::config::{FieldConfig, FieldFileFormat};
use crate::error::{FieldError, FieldResult};
use crate::transform::FieldTransform;

/// Write every cell of `array` under `key`. NaN cells are written as 0.0.
pub fn export_field(
    path: &Path,
    key: &str,
    array: &Array3<f32>,
    format: FieldFileFormat,
    output_transform: FieldTransform,
) -> FieldResult<()> {
    let values: Vec<f32> = fortran_values(array)
        .into_iter()
        .map(|v| if v.is_nan() { 0.0 } else { output_transform.apply_value(v) })
        .collect();

    match format {
        FieldFileFormat::Grdecl => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_grdecl_keyword(&mut writer, key, &values)?;
            writer.flush()?;
        }
        FieldFileFormat::EclKw => {
            let mut writer = EclWriter::create(path)?;
            writer.write_record(key, &EclArray::Real(values))?;
            writer.finish()?;
        }
        FieldFileFormat::Roff => return Err(FieldError::UnsupportedFormat("ROFF")),
    }

    debug!(path = %path.display(), key, %format, "Exported field");
    Ok(())
}

/// Export using the key, format and output transform of `config`.
pub fn export_with_config(config: &FieldConfig, path: &Path, array: &Array3<f32>) -> FieldResult<()> {
    let actual = GridShape::of(array);
    if actual != config.shape() {
        return Err(FieldError::ShapeMismatch {
            expected: config.shape(),
            actual,
        });
    }
    export_field(
        path,
        config.key(),
        array,
        config.export_format(),
        config.output_transform(),
    )
}
