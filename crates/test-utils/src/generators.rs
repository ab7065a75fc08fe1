//! Generators for predictable field values and cell masks.

use ens_common::GridShape;
use ndarray::Array3;

/// Field whose value at `(i, j, k)` is its column-major flat index.
///
/// ```
/// use ens_common::GridShape;
/// use test_utils::sequential_field;
///
/// let shape = GridShape::new(2, 3, 1).unwrap();
/// let field = sequential_field(shape);
/// assert_eq!(field[[1, 0, 0]], 1.0);
/// assert_eq!(field[[0, 1, 0]], 2.0);
/// ```
pub fn sequential_field(shape: GridShape) -> Array3<f32> {
    Array3::from_shape_fn(shape.dim(), |(i, j, k)| shape.flat_index(i, j, k) as f32)
}

/// Porosity-like values between 0.05 and 0.35, increasing with depth.
pub fn porosity_field(shape: GridShape) -> Array3<f32> {
    Array3::from_shape_fn(shape.dim(), |(i, j, k)| {
        let lateral = ((i + j) % 5) as f32 * 0.01;
        let depth = k as f32 / shape.nz.max(1) as f32;
        0.05 + 0.25 * depth + lateral
    })
}

/// Active flags in column-major order with every other cell inactive.
pub fn checkerboard_actnum(shape: GridShape) -> Vec<bool> {
    (0..shape.len()).map(|n| n % 2 == 0).collect()
}

/// Active flags with the whole layer `k` inactive.
pub fn inactive_layer_actnum(shape: GridShape, layer: usize) -> Vec<bool> {
    (0..shape.len())
        .map(|n| shape.unflatten(n).2 != layer)
        .collect()
}

/// Values of `field` at the active cells, column-major.
pub fn active_values(field: &Array3<f32>, flags: &[bool]) -> Vec<f32> {
    ens_common::fortran_values(field)
        .into_iter()
        .zip(flags)
        .filter_map(|(v, &a)| a.then_some(v))
        .collect()
}
