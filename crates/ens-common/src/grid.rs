//! Grid shapes and cell masks for corner-point simulation grids.
//!
//! Flat cell arrays in grid and field files are stored in column-major
//! (Fortran) order: the flat index of cell `(i, j, k)` is
//! `i + nx * (j + ny * k)`.
//!
//! Two mask polarities exist and are kept apart by type:
//! - [`ActiveMask`]: `true` marks a cell that takes part in the simulation.
//! - [`InactiveMask`]: `true` marks a cell that must be masked out.

use ndarray::{Array3, ShapeBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EnsError, EnsResult};

/// Cell-count dimensions of a 3-D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl GridShape {
    /// Largest cell count accepted. Shapes read from file headers are
    /// untrusted and size every mask and field allocation.
    pub const MAX_CELLS: usize = 1 << 28;

    /// Create a shape, rejecting zero-sized dimensions and cell counts
    /// above [`GridShape::MAX_CELLS`].
    pub fn new(nx: usize, ny: usize, nz: usize) -> EnsResult<Self> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(EnsError::InvalidShape(format!(
                "dimensions must be positive, got ({}, {}, {})",
                nx, ny, nz
            )));
        }
        let cells = nx.checked_mul(ny).and_then(|n| n.checked_mul(nz));
        match cells {
            Some(cells) if cells <= Self::MAX_CELLS => Ok(Self { nx, ny, nz }),
            _ => Err(EnsError::InvalidShape(format!(
                "{}x{}x{} exceeds {} cells",
                nx,
                ny,
                nz,
                Self::MAX_CELLS
            ))),
        }
    }

    /// Create a shape from signed values as read from a grid header.
    pub fn from_signed(nx: i64, ny: i64, nz: i64) -> EnsResult<Self> {
        let conv = |v: i64| {
            usize::try_from(v).map_err(|_| {
                EnsError::InvalidShape(format!(
                    "dimensions must be positive, got ({}, {}, {})",
                    nx, ny, nz
                ))
            })
        };
        Self::new(conv(nx)?, conv(ny)?, conv(nz)?)
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// A validated shape always has cells; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape as an ndarray dimension tuple.
    pub fn dim(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    /// Column-major flat index of a cell.
    pub fn flat_index(&self, i: usize, j: usize, k: usize) -> usize {
        i + self.nx * (j + self.ny * k)
    }

    /// Inverse of [`GridShape::flat_index`].
    pub fn unflatten(&self, index: usize) -> (usize, usize, usize) {
        let i = index % self.nx;
        let j = (index / self.nx) % self.ny;
        let k = index / (self.nx * self.ny);
        (i, j, k)
    }

    /// Whether `(i, j, k)` lies inside the grid.
    pub fn contains(&self, i: usize, j: usize, k: usize) -> bool {
        i < self.nx && j < self.ny && k < self.nz
    }

    /// Build a 3-D array from values in column-major order.
    pub fn array_from_fortran<T>(&self, values: Vec<T>) -> EnsResult<Array3<T>> {
        let len = values.len();
        Array3::from_shape_vec(self.dim().f(), values).map_err(|_| EnsError::ShapeMismatch {
            expected: format!("{} values for {}", self.len(), self),
            actual: format!("{} values", len),
        })
    }

    /// Shape of an existing 3-D array.
    pub fn of<T>(array: &Array3<T>) -> Self {
        let (nx, ny, nz) = array.dim();
        Self { nx, ny, nz }
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.nx, self.ny, self.nz)
    }
}

/// Flatten any 3-D array in column-major order.
pub fn fortran_values<T: Clone>(array: &Array3<T>) -> Vec<T> {
    // Iterating the transposed view visits axis 0 fastest.
    array.t().iter().cloned().collect()
}

/// Cell mask where `true` means the cell is active.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveMask(Array3<bool>);

impl ActiveMask {
    /// Every cell active.
    pub fn all_active(shape: GridShape) -> Self {
        Self(Array3::from_elem(shape.dim(), true))
    }

    pub fn from_array(array: Array3<bool>) -> Self {
        Self(array)
    }

    /// Build from per-cell flags in column-major order.
    pub fn from_fortran_flags(shape: GridShape, flags: Vec<bool>) -> EnsResult<Self> {
        shape.array_from_fortran(flags).map(Self)
    }

    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.0)
    }

    pub fn is_active(&self, i: usize, j: usize, k: usize) -> bool {
        self.0[[i, j, k]]
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, active: bool) {
        self.0[[i, j, k]] = active;
    }

    /// Number of active cells.
    pub fn active_count(&self) -> usize {
        self.0.iter().filter(|&&a| a).count()
    }

    /// Per-cell flags in column-major order.
    pub fn fortran_flags(&self) -> Vec<bool> {
        fortran_values(&self.0)
    }

    pub fn as_array(&self) -> &Array3<bool> {
        &self.0
    }

    /// The same cells, seen as "which cells to mask out".
    pub fn to_inactive(&self) -> InactiveMask {
        InactiveMask(self.0.mapv(|active| !active))
    }
}

/// Cell mask where `true` means the cell is masked out.
#[derive(Debug, Clone, PartialEq)]
pub struct InactiveMask(Array3<bool>);

impl InactiveMask {
    /// Nothing masked.
    pub fn none(shape: GridShape) -> Self {
        Self(Array3::from_elem(shape.dim(), false))
    }

    pub fn from_array(array: Array3<bool>) -> Self {
        Self(array)
    }

    /// Build from per-cell flags in column-major order.
    pub fn from_fortran_flags(shape: GridShape, flags: Vec<bool>) -> EnsResult<Self> {
        shape.array_from_fortran(flags).map(Self)
    }

    pub fn shape(&self) -> GridShape {
        GridShape::of(&self.0)
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, masked: bool) {
        self.0[[i, j, k]] = masked;
    }

    pub fn is_masked(&self, i: usize, j: usize, k: usize) -> bool {
        self.0[[i, j, k]]
    }

    /// Number of masked cells.
    pub fn masked_count(&self) -> usize {
        self.0.iter().filter(|&&m| m).count()
    }

    pub fn as_array(&self) -> &Array3<bool> {
        &self.0
    }

    pub fn to_active(&self) -> ActiveMask {
        ActiveMask(self.0.mapv(|masked| !masked))
    }
}
