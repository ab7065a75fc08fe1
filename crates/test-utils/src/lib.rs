//! Shared test utilities for the ensemble workspace.
//!
//! - Synthetic grid and field files ([`GridFileBuilder`], field writers)
//! - Value and mask generators
//! - Temporary directory helpers
//!
//! Add to a crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro for approximate floating-point equality assertions.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Compare two field arrays cell by cell. NaN equals NaN.
///
/// ```ignore
/// use test_utils::assert_fields_eq;
///
/// assert_fields_eq!(&loaded, &expected);
/// ```
#[macro_export]
macro_rules! assert_fields_eq {
    ($left:expr, $right:expr) => {{
        let left: &::ndarray::Array3<f32> = $left;
        let right: &::ndarray::Array3<f32> = $right;
        assert_eq!(left.dim(), right.dim(), "field shapes differ");
        for ((idx, l), r) in left.indexed_iter().zip(right.iter()) {
            let same = (l.is_nan() && r.is_nan()) || l == r;
            if !same {
                panic!(
                    "assertion failed: fields differ at {:?}\n  left: `{:?}`,\n right: `{:?}`",
                    idx, l, r
                );
            }
        }
    }};
}
