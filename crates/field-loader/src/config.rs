//! Field parameter configuration.

use ens_common::GridShape;
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{FieldError, FieldResult};
use crate::transform::{FieldTransform, Truncation};

/// On-disk encodings of a field file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldFileFormat {
    Grdecl,
    Roff,
    /// Binary keyword file, any extension other than the two above.
    EclKw,
}

impl FieldFileFormat {
    /// Export format named by a file extension (case-insensitive).
    ///
    /// Only `grdecl` and `roff` name a format; anything else is an error.
    pub fn from_path(path: &Path) -> FieldResult<Self> {
        match extension(path).as_deref() {
            Some("grdecl") => Ok(Self::Grdecl),
            Some("roff") => Ok(Self::Roff),
            _ => Err(FieldError::UnknownFileFormat(path.to_path_buf())),
        }
    }

    /// Format to read a field file with. Unrecognized extensions are read
    /// as binary keyword files.
    pub fn detect(path: &Path) -> Self {
        Self::from_path(path).unwrap_or(Self::EclKw)
    }
}

impl fmt::Display for FieldFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Grdecl => "GRDECL",
            Self::Roff => "ROFF",
            Self::EclKw => "binary keyword",
        })
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Configuration of one FIELD parameter. Immutable once built; every
/// builder step validates its input.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    key: String,
    shape: GridShape,
    init_file_fmt: String,
    output_file: PathBuf,
    export_format: FieldFileFormat,
    init_transform: FieldTransform,
    output_transform: FieldTransform,
    truncation: Truncation,
}

impl FieldConfig {
    /// The export format is taken from the extension of `output_file`.
    pub fn new(
        key: impl Into<String>,
        shape: GridShape,
        init_file_fmt: impl Into<String>,
        output_file: impl Into<PathBuf>,
    ) -> FieldResult<Self> {
        let output_file = output_file.into();
        let export_format = FieldFileFormat::from_path(&output_file)?;
        Ok(Self {
            key: key.into(),
            shape,
            init_file_fmt: init_file_fmt.into(),
            output_file,
            export_format,
            init_transform: FieldTransform::Identity,
            output_transform: FieldTransform::Identity,
            truncation: Truncation::default(),
        })
    }

    pub fn with_init_transform(mut self, name: &str) -> FieldResult<Self> {
        self.init_transform = name.parse()?;
        Ok(self)
    }

    pub fn with_output_transform(mut self, name: &str) -> FieldResult<Self> {
        self.output_transform = name.parse()?;
        Ok(self)
    }

    pub fn with_truncation(mut self, min: Option<f32>, max: Option<f32>) -> FieldResult<Self> {
        self.truncation = Truncation::new(min, max)?;
        Ok(self)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// File name pattern; `%d` is replaced by the realization index.
    pub fn init_file_fmt(&self) -> &str {
        &self.init_file_fmt
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    pub fn export_format(&self) -> FieldFileFormat {
        self.export_format
    }

    pub fn init_transform(&self) -> FieldTransform {
        self.init_transform
    }

    pub fn output_transform(&self) -> FieldTransform {
        self.output_transform
    }

    pub fn truncation(&self) -> Truncation {
        self.truncation
    }

    /// Init transform followed by truncation.
    pub fn apply_init(&self, array: &mut Array3<f32>) {
        self.init_transform.apply(array);
        self.truncation.apply(array);
    }
}
