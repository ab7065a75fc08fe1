//! Synthetic grid and field files.
//!
//! Test helpers panic on I/O failure; a broken fixture should fail the
//! test that uses it.

use ecl_parser::{write_grdecl_keyword, EclArray, EclWriter};
use ens_common::{fortran_values, GridShape};
use ndarray::Array3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Common grid dimensions.
pub mod shapes {
    use ens_common::GridShape;

    /// 4 x 3 x 2, small enough to reason about by hand.
    pub const SMALL: GridShape = GridShape { nx: 4, ny: 3, nz: 2 };

    /// A single column of cells.
    pub const COLUMN: GridShape = GridShape { nx: 1, ny: 1, nz: 5 };

    /// Larger than one keyword data block (1000 values).
    pub const MULTI_BLOCK: GridShape = GridShape { nx: 20, ny: 10, nz: 8 };
}

/// How the builder records the grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRecord {
    Gridhead,
    Dimens,
    /// Both, with DIMENS first and carrying the given (wrong) shape.
    DimensThenGridhead(GridShape),
    None,
}

/// How the builder records cell activity.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityRecord {
    Actnum(Vec<bool>),
    /// One COORDS record per cell, flag 0 for inactive cells.
    Coords(Vec<bool>),
    None,
}

/// Writes grid files as binary keyword streams.
///
/// ```ignore
/// let grid = GridFileBuilder::new(shapes::SMALL)
///     .actnum(checkerboard_actnum(shapes::SMALL))
///     .write(dir.path().join("CASE.EGRID"));
/// ```
#[derive(Debug, Clone)]
pub struct GridFileBuilder {
    shape: GridShape,
    shape_record: ShapeRecord,
    activity: ActivityRecord,
}

impl GridFileBuilder {
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            shape_record: ShapeRecord::Gridhead,
            activity: ActivityRecord::None,
        }
    }

    pub fn shape_record(mut self, record: ShapeRecord) -> Self {
        self.shape_record = record;
        self
    }

    /// Active flags in column-major order.
    pub fn actnum(mut self, flags: Vec<bool>) -> Self {
        self.activity = ActivityRecord::Actnum(flags);
        self
    }

    /// Active flags in column-major order, written as COORDS records.
    pub fn coords(mut self, flags: Vec<bool>) -> Self {
        self.activity = ActivityRecord::Coords(flags);
        self
    }

    pub fn write(&self, path: impl AsRef<Path>) -> std::path::PathBuf {
        let path = path.as_ref();
        let mut writer = EclWriter::create(path).expect("create grid file");
        let mut put = |keyword: &str, array: EclArray| {
            writer
                .write_record(keyword, &array)
                .expect("write grid record");
        };
        let GridShape { nx, ny, nz } = self.shape;
        let (nx, ny, nz) = (nx as i32, ny as i32, nz as i32);

        put("FILEHEAD", EclArray::Int(vec![3, 2007, 0, 0, 0, 0, 1]));
        match self.shape_record {
            ShapeRecord::Gridhead => put("GRIDHEAD", EclArray::Int(vec![1, nx, ny, nz])),
            ShapeRecord::Dimens => put("DIMENS", EclArray::Int(vec![nx, ny, nz])),
            ShapeRecord::DimensThenGridhead(wrong) => {
                put(
                    "DIMENS",
                    EclArray::Int(vec![wrong.nx as i32, wrong.ny as i32, wrong.nz as i32]),
                );
                put("GRIDHEAD", EclArray::Int(vec![1, nx, ny, nz]));
            }
            ShapeRecord::None => {}
        }
        put(
            "COORD",
            EclArray::Real(vec![0.0; ((nx + 1) * (ny + 1) * 6) as usize]),
        );

        match &self.activity {
            ActivityRecord::Actnum(flags) => put(
                "ACTNUM",
                EclArray::Int(flags.iter().map(|&a| a as i32).collect()),
            ),
            ActivityRecord::Coords(flags) => {
                for (n, &active) in flags.iter().enumerate() {
                    let (i, j, k) = self.shape.unflatten(n);
                    put(
                        "COORDS",
                        EclArray::Int(vec![
                            i as i32 + 1,
                            j as i32 + 1,
                            k as i32 + 1,
                            n as i32 + 1,
                            active as i32,
                            0,
                            0,
                        ]),
                    );
                }
            }
            ActivityRecord::None => {}
        }
        put("ENDGRID", EclArray::Message);

        writer.finish().expect("flush grid file");
        path.to_path_buf()
    }
}

/// Write one GRDECL keyword holding `values` as given.
pub fn write_grdecl_values(path: impl AsRef<Path>, keyword: &str, values: &[f32]) {
    let mut out = BufWriter::new(File::create(path).expect("create GRDECL file"));
    writeln!(out, "-- generated test field").expect("write GRDECL file");
    write_grdecl_keyword(&mut out, keyword, values).expect("write GRDECL file");
    out.flush().expect("flush GRDECL file");
}

/// Write every cell of `array` to a GRDECL file in column-major order.
pub fn write_grdecl_field(path: impl AsRef<Path>, keyword: &str, array: &Array3<f32>) {
    write_grdecl_values(path, keyword, &fortran_values(array));
}

/// Write `values` as a REAL record in a binary keyword file.
pub fn write_binary_values(path: impl AsRef<Path>, keyword: &str, values: &[f32]) {
    let mut writer = EclWriter::create(path).expect("create keyword file");
    writer
        .write_record(keyword, &EclArray::Real(values.to_vec()))
        .expect("write keyword record");
    writer.finish().expect("flush keyword file");
}
