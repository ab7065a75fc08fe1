//! Reading parameter fields and masking out inactive cells.

use ecl_parser::{read_grdecl_keyword_bounded, read_keyword};
use ens_common::{fortran_values, ActiveMask, GridShape, InactiveMask};
use ndarray::Array3;
use std::path::Path;
use tracing::debug;

use crate::config::FieldFileFormat;
use crate::error::{FieldError, FieldResult};
use crate::mask::{read_active_mask, read_inactive_mask, GridMaskReader};

/// Minimal grid description needed to place field values.
#[derive(Debug, Clone, Copy)]
pub struct GridDescriptor<'a> {
    pub shape: GridShape,
    pub active: &'a ActiveMask,
}

/// Read `field_name` from `data_file` onto the grid. Inactive cells are NaN.
///
/// Files may hold a value for every cell or one per active cell; the latter
/// are placed into active cells in column-major order.
pub fn read_field(
    data_file: &Path,
    field_name: &str,
    grid: &GridDescriptor<'_>,
) -> FieldResult<Array3<f32>> {
    let format = FieldFileFormat::detect(data_file);
    let values = match format {
        FieldFileFormat::Grdecl => {
            read_grdecl_keyword_bounded(data_file, field_name, grid.shape.len())?
        }
        FieldFileFormat::Roff => return Err(FieldError::UnsupportedFormat("ROFF")),
        FieldFileFormat::EclKw => read_keyword(data_file, field_name)?
            .to_f32_vec()
            .ok_or_else(|| FieldError::NotNumeric(field_name.to_string()))?,
    };
    debug!(
        file = %data_file.display(),
        field = field_name,
        %format,
        values = values.len(),
        "Read field values"
    );
    place_values(values, field_name, grid)
}

fn place_values(
    values: Vec<f32>,
    field_name: &str,
    grid: &GridDescriptor<'_>,
) -> FieldResult<Array3<f32>> {
    let flags = grid.active.fortran_flags();
    let cells = grid.shape.len();
    let active = flags.iter().filter(|&&a| a).count();

    let cell_values: Vec<f32> = if values.len() == cells {
        values
            .into_iter()
            .zip(&flags)
            .map(|(v, &a)| if a { v } else { f32::NAN })
            .collect()
    } else if values.len() == active {
        let mut compressed = values.into_iter();
        flags
            .iter()
            .map(|&a| {
                if a {
                    compressed.next().unwrap_or(f32::NAN)
                } else {
                    f32::NAN
                }
            })
            .collect()
    } else {
        return Err(FieldError::FieldSize {
            field: field_name.to_string(),
            found: values.len(),
            cells,
            active,
        });
    };

    Ok(grid.shape.array_from_fortran(cell_values)?)
}

/// Read a field and mask it with the grid's inactive cells.
pub fn read_masked_field(
    data_file: &Path,
    field_name: &str,
    grid_file: &Path,
    shape: Option<GridShape>,
) -> FieldResult<Array3<f32>> {
    let (active, shape) = read_active_mask(grid_file, shape)?;
    let grid = GridDescriptor {
        shape,
        active: &active,
    };
    read_field(data_file, field_name, &grid)
}

impl GridMaskReader {
    /// Same as [`read_masked_field`], reusing cached grid masks.
    pub fn read_masked_field(
        &self,
        data_file: &Path,
        field_name: &str,
        grid_file: &Path,
        shape: Option<GridShape>,
    ) -> FieldResult<Array3<f32>> {
        let mask = self.get(grid_file, shape)?;
        let grid = GridDescriptor {
            shape: mask.shape,
            active: &mask.active,
        };
        read_field(data_file, field_name, &grid)
    }
}

/// Field values paired with the cells to ignore.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray {
    data: Array3<f32>,
    mask: InactiveMask,
    fill_value: f32,
}

impl MaskedArray {
    pub fn new(data: Array3<f32>, mask: InactiveMask) -> FieldResult<Self> {
        let (expected, actual) = (mask.shape(), GridShape::of(&data));
        if expected != actual {
            return Err(FieldError::ShapeMismatch { expected, actual });
        }
        Ok(Self {
            data,
            mask,
            fill_value: f32::NAN,
        })
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn mask(&self) -> &InactiveMask {
        &self.mask
    }

    pub fn fill_value(&self) -> f32 {
        self.fill_value
    }

    /// Data with masked cells replaced by the fill value.
    pub fn filled(&self) -> Array3<f32> {
        let mut out = self.data.clone();
        out.zip_mut_with(self.mask.as_array(), |v, &masked| {
            if masked {
                *v = self.fill_value;
            }
        });
        out
    }

    /// Unmasked values in column-major order.
    pub fn compressed(&self) -> Vec<f32> {
        fortran_values(&self.data)
            .into_iter()
            .zip(fortran_values(self.mask.as_array()))
            .filter_map(|(v, masked)| (!masked).then_some(v))
            .collect()
    }

    pub fn into_parts(self) -> (Array3<f32>, InactiveMask) {
        (self.data, self.mask)
    }
}

/// Mask an in-memory array with a grid's inactive cells.
pub fn mask_data(
    data: Array3<f32>,
    grid_file: &Path,
    shape: Option<GridShape>,
) -> FieldResult<MaskedArray> {
    let (inactive, _) = read_inactive_mask(grid_file, shape)?;
    MaskedArray::new(data, inactive)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(shape: GridShape) -> ActiveMask {
        let flags = (0..shape.len()).map(|n| n % 2 == 0).collect();
        ActiveMask::from_fortran_flags(shape, flags).unwrap()
    }

    #[test]
    fn test_all_cells_present() {
        let shape = GridShape::new(2, 2, 1).unwrap();
        let active = checkerboard(shape);
        let grid = GridDescriptor {
            shape,
            active: &active,
        };

        let array = place_values(vec![1.0, 2.0, 3.0, 4.0], "PORO", &grid).unwrap();
        assert_eq!(array[[0, 0, 0]], 1.0);
        assert!(array[[1, 0, 0]].is_nan());
        assert_eq!(array[[0, 1, 0]], 3.0);
        assert!(array[[1, 1, 0]].is_nan());
    }

    #[test]
    fn test_active_cells_only() {
        let shape = GridShape::new(2, 2, 1).unwrap();
        let active = checkerboard(shape);
        let grid = GridDescriptor {
            shape,
            active: &active,
        };

        let array = place_values(vec![7.0, 8.0], "PORO", &grid).unwrap();
        assert_eq!(array[[0, 0, 0]], 7.0);
        assert_eq!(array[[0, 1, 0]], 8.0);
        assert!(array[[1, 0, 0]].is_nan());
    }

    #[test]
    fn test_wrong_value_count() {
        let shape = GridShape::new(2, 2, 1).unwrap();
        let active = checkerboard(shape);
        let grid = GridDescriptor {
            shape,
            active: &active,
        };

        let result = place_values(vec![1.0, 2.0, 3.0], "PORO", &grid);
        assert!(matches!(
            result,
            Err(FieldError::FieldSize {
                found: 3,
                cells: 4,
                active: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_masked_array_fill() {
        let shape = GridShape::new(2, 1, 1).unwrap();
        let inactive = InactiveMask::from_fortran_flags(shape, vec![false, true]).unwrap();
        let data = shape.array_from_fortran(vec![1.5, 2.5]).unwrap();

        let masked = MaskedArray::new(data, inactive).unwrap();
        let filled = masked.filled();
        assert_eq!(filled[[0, 0, 0]], 1.5);
        assert!(filled[[1, 0, 0]].is_nan());
        assert_eq!(masked.compressed(), vec![1.5]);
        assert_eq!(masked.data()[[1, 0, 0]], 2.5);
    }

    #[test]
    fn test_masked_array_shape_mismatch() {
        let inactive = InactiveMask::none(GridShape::new(2, 1, 1).unwrap());
        let data = Array3::zeros((1, 1, 1));
        assert!(matches!(
            MaskedArray::new(data, inactive),
            Err(FieldError::ShapeMismatch { .. })
        ));
    }
}
