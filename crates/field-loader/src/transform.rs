//! Element-wise transforms applied to parameter fields.

use ndarray::Array3;
use std::fmt;
use std::str::FromStr;

use crate::error::{FieldError, FieldResult};

/// Named element-wise functions. Names parse case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldTransform {
    #[default]
    Identity,
    /// Natural logarithm; also accepted as `LOG`.
    Ln,
    /// `ln(x + 1e-6)`
    Ln0,
    Log10,
    Exp,
    /// `e^x - 1e-6`
    Exp0,
    Pow10,
    /// `max(10^x, 0.001)`
    TruncPow10,
}

const LN0_SHIFT: f32 = 0.000_001;
const TRUNC_POW10_FLOOR: f32 = 0.001;

impl FieldTransform {
    /// Every accepted name, in the order they are reported.
    pub const NAMES: [&'static str; 9] = [
        "NONE",
        "LN",
        "LOG",
        "LN0",
        "LOG10",
        "EXP",
        "EXP0",
        "POW10",
        "TRUNC_POW10",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "NONE",
            Self::Ln => "LN",
            Self::Ln0 => "LN0",
            Self::Log10 => "LOG10",
            Self::Exp => "EXP",
            Self::Exp0 => "EXP0",
            Self::Pow10 => "POW10",
            Self::TruncPow10 => "TRUNC_POW10",
        }
    }

    /// Parse an optional name; no name means identity.
    pub fn parse_optional(name: Option<&str>) -> FieldResult<Self> {
        name.map_or(Ok(Self::Identity), |n| n.parse())
    }

    pub fn apply_value(&self, x: f32) -> f32 {
        match self {
            Self::Identity => x,
            Self::Ln => x.ln(),
            Self::Ln0 => (x + LN0_SHIFT).ln(),
            Self::Log10 => x.log10(),
            Self::Exp => x.exp(),
            Self::Exp0 => x.exp() - LN0_SHIFT,
            Self::Pow10 => 10f32.powf(x),
            Self::TruncPow10 => 10f32.powf(x).max(TRUNC_POW10_FLOOR),
        }
    }

    /// Apply in place. NaN cells stay NaN.
    pub fn apply(&self, array: &mut Array3<f32>) {
        if *self == Self::Identity {
            return;
        }
        array.mapv_inplace(|x| if x.is_nan() { x } else { self.apply_value(x) });
    }
}

impl FromStr for FieldTransform {
    type Err = FieldError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::Identity),
            "LN" | "LOG" => Ok(Self::Ln),
            "LN0" => Ok(Self::Ln0),
            "LOG10" => Ok(Self::Log10),
            "EXP" => Ok(Self::Exp),
            "EXP0" => Ok(Self::Exp0),
            "POW10" => Ok(Self::Pow10),
            "TRUNC_POW10" => Ok(Self::TruncPow10),
            _ => Err(FieldError::UnknownTransform {
                name: name.to_string(),
                available: Self::NAMES.join(", "),
            }),
        }
    }
}

impl fmt::Display for FieldTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Return `raw` with `transform` applied to every cell.
pub fn transform(mut raw: Array3<f32>, transform: FieldTransform) -> Array3<f32> {
    transform.apply(&mut raw);
    raw
}

/// Optional clamping applied after the init transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Truncation {
    pub min: Option<f32>,
    pub max: Option<f32>,
}

impl Truncation {
    pub fn new(min: Option<f32>, max: Option<f32>) -> FieldResult<Self> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(FieldError::InvalidTruncation(format!(
                    "min {} is greater than max {}",
                    lo, hi
                )));
            }
        }
        Ok(Self { min, max })
    }

    pub fn is_none(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    pub fn apply_value(&self, mut x: f32) -> f32 {
        // f32::max/min would replace NaN with the bound.
        if x.is_nan() {
            return x;
        }
        if let Some(lo) = self.min {
            x = x.max(lo);
        }
        if let Some(hi) = self.max {
            x = x.min(hi);
        }
        x
    }

    pub fn apply(&self, array: &mut Array3<f32>) {
        if self.is_none() {
            return;
        }
        array.mapv_inplace(|x| self.apply_value(x));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!("ln".parse::<FieldTransform>().unwrap(), FieldTransform::Ln);
        assert_eq!("Log".parse::<FieldTransform>().unwrap(), FieldTransform::Ln);
        assert_eq!(
            "trunc_pow10".parse::<FieldTransform>().unwrap(),
            FieldTransform::TruncPow10
        );
        assert_eq!(
            FieldTransform::parse_optional(None).unwrap(),
            FieldTransform::Identity
        );
    }

    #[test]
    fn test_unknown_name_lists_available() {
        let err = "SQRT".parse::<FieldTransform>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("SQRT"));
        assert!(message.contains("TRUNC_POW10"));
        assert!(message.contains("LOG10"));
    }

    #[test]
    fn test_transform_values() {
        use FieldTransform::*;
        assert_approx_eq!(Ln.apply_value(std::f32::consts::E), 1.0, 1e-5);
        assert_approx_eq!(Ln0.apply_value(0.0), (1e-6f32).ln(), 1e-4);
        assert_approx_eq!(Log10.apply_value(100.0), 2.0, 1e-5);
        assert_approx_eq!(Exp.apply_value(0.0), 1.0, 1e-6);
        assert_approx_eq!(Exp0.apply_value(0.0), 1.0 - 1e-6, 1e-6);
        assert_approx_eq!(Pow10.apply_value(2.0), 100.0, 1e-3);
        assert_approx_eq!(TruncPow10.apply_value(-5.0), 0.001, 1e-6);
        assert_approx_eq!(TruncPow10.apply_value(1.0), 10.0, 1e-4);
        assert_eq!(Identity.apply_value(-3.5), -3.5);
    }

    #[test]
    fn test_nan_passes_through() {
        let mut array = Array3::from_elem((2, 1, 1), f32::NAN);
        array[[0, 0, 0]] = 1.0;
        FieldTransform::Pow10.apply(&mut array);
        assert_approx_eq!(array[[0, 0, 0]], 10.0, 1e-4);
        assert!(array[[1, 0, 0]].is_nan());
    }

    #[test]
    fn test_truncation() {
        assert!(Truncation::new(Some(2.0), Some(1.0)).is_err());

        let trunc = Truncation::new(Some(0.0), Some(1.0)).unwrap();
        assert_eq!(trunc.apply_value(-1.0), 0.0);
        assert_eq!(trunc.apply_value(0.5), 0.5);
        assert_eq!(trunc.apply_value(3.0), 1.0);
        assert!(trunc.apply_value(f32::NAN).is_nan());
        assert!(Truncation::default().is_none());
    }
}
