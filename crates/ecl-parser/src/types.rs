//! Record headers, data types and decoded arrays.

use crate::error::{EclError, EclResult};

/// Element type of a record payload (the 4-character type tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EclType {
    /// `INTE`: 32-bit signed integer
    Inte,
    /// `REAL`: 32-bit float
    Real,
    /// `DOUB`: 64-bit float
    Doub,
    /// `LOGI`: 32-bit logical, non-zero is true
    Logi,
    /// `CHAR`: 8-byte string
    Char,
    /// `C0nn`: nn-byte string
    Str(usize),
    /// `MESS`: no payload
    Mess,
}

impl EclType {
    /// Parse a type tag such as `b"INTE"` or `b"C042"`.
    pub fn from_tag(tag: &[u8]) -> EclResult<Self> {
        match tag {
            b"INTE" => Ok(Self::Inte),
            b"REAL" => Ok(Self::Real),
            b"DOUB" => Ok(Self::Doub),
            b"LOGI" => Ok(Self::Logi),
            b"CHAR" => Ok(Self::Char),
            b"MESS" => Ok(Self::Mess),
            [b'C', rest @ ..] if rest.len() == 3 && rest.iter().all(u8::is_ascii_digit) => {
                let width = std::str::from_utf8(rest)
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .filter(|w| *w > 0)
                    .ok_or_else(|| EclError::UnknownType(String::from_utf8_lossy(tag).into()))?;
                Ok(Self::Str(width))
            }
            _ => Err(EclError::UnknownType(
                String::from_utf8_lossy(tag).into_owned(),
            )),
        }
    }

    /// The 4-character tag written in record headers.
    pub fn tag(&self) -> String {
        match self {
            Self::Inte => "INTE".to_string(),
            Self::Real => "REAL".to_string(),
            Self::Doub => "DOUB".to_string(),
            Self::Logi => "LOGI".to_string(),
            Self::Char => "CHAR".to_string(),
            Self::Str(width) => format!("C{:03}", width),
            Self::Mess => "MESS".to_string(),
        }
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        match self {
            Self::Inte | Self::Real | Self::Logi => 4,
            Self::Doub | Self::Char => 8,
            Self::Str(width) => *width,
            Self::Mess => 0,
        }
    }

    /// Number of elements written per data block.
    pub fn block_size(&self) -> usize {
        match self {
            Self::Char | Self::Str(_) => 105,
            _ => 1000,
        }
    }
}

/// Header of one keyword record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// Keyword with trailing padding removed
    pub keyword: String,
    /// Number of elements in the payload
    pub count: usize,
    pub ecl_type: EclType,
}

impl RecordHeader {
    /// Total payload size in bytes, excluding block markers.
    pub fn payload_bytes(&self) -> usize {
        self.count * self.ecl_type.element_size()
    }
}

/// Decoded record payload.
#[derive(Debug, Clone, PartialEq)]
pub enum EclArray {
    Int(Vec<i32>),
    Real(Vec<f32>),
    Double(Vec<f64>),
    Logical(Vec<bool>),
    Char(Vec<String>),
    Str { width: usize, values: Vec<String> },
    Message,
}

impl EclArray {
    pub fn ecl_type(&self) -> EclType {
        match self {
            Self::Int(_) => EclType::Inte,
            Self::Real(_) => EclType::Real,
            Self::Double(_) => EclType::Doub,
            Self::Logical(_) => EclType::Logi,
            Self::Char(_) => EclType::Char,
            Self::Str { width, .. } => EclType::Str(*width),
            Self::Message => EclType::Mess,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Real(v) => v.len(),
            Self::Double(v) => v.len(),
            Self::Logical(v) => v.len(),
            Self::Char(v) => v.len(),
            Self::Str { values, .. } => values.len(),
            Self::Message => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Integer element at `index`, coercing logicals and whole numbers.
    pub fn int_at(&self, index: usize) -> Option<i64> {
        match self {
            Self::Int(v) => v.get(index).map(|&x| x as i64),
            Self::Logical(v) => v.get(index).map(|&b| b as i64),
            Self::Real(v) => v.get(index).map(|&x| x as i64),
            Self::Double(v) => v.get(index).map(|&x| x as i64),
            _ => None,
        }
    }

    /// Numeric payload as `f32`, or `None` for string/message records.
    pub fn to_f32_vec(&self) -> Option<Vec<f32>> {
        match self {
            Self::Real(v) => Some(v.clone()),
            Self::Double(v) => Some(v.iter().map(|&x| x as f32).collect()),
            Self::Int(v) => Some(v.iter().map(|&x| x as f32).collect()),
            _ => None,
        }
    }

    /// Payload as per-element flags (non-zero is `true`).
    pub fn to_flags(&self) -> Option<Vec<bool>> {
        match self {
            Self::Int(v) => Some(v.iter().map(|&x| x != 0).collect()),
            Self::Logical(v) => Some(v.clone()),
            Self::Real(v) => Some(v.iter().map(|&x| x != 0.0).collect()),
            Self::Double(v) => Some(v.iter().map(|&x| x != 0.0).collect()),
            _ => None,
        }
    }
}

/// A fully decoded record.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRecord {
    pub keyword: String,
    pub array: EclArray,
}
