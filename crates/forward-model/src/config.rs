//! Parameter and ensemble configuration consumed by the callbacks.

use ens_common::GridShape;
use field_loader::FieldConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use storage::validate_key;

use crate::error::{ForwardModelError, Result};

/// A surface parameter, stored as the raw bytes of its file.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    key: String,
    init_file_fmt: String,
    base_surface: PathBuf,
}

impl SurfaceConfig {
    pub fn new(
        key: impl Into<String>,
        init_file_fmt: impl Into<String>,
        base_surface: impl Into<PathBuf>,
    ) -> Self {
        Self {
            key: key.into(),
            init_file_fmt: init_file_fmt.into(),
            base_surface: base_surface.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn init_file_fmt(&self) -> &str {
        &self.init_file_fmt
    }

    /// Surface whose geometry is used when writing the parameter out.
    pub fn base_surface(&self) -> &Path {
        &self.base_surface
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    Field(FieldConfig),
    Surface(SurfaceConfig),
}

/// One configured parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterNode {
    kind: ParameterKind,
    forward_init: bool,
}

impl ParameterNode {
    pub fn field(config: FieldConfig, forward_init: bool) -> Self {
        Self {
            kind: ParameterKind::Field(config),
            forward_init,
        }
    }

    pub fn surface(config: SurfaceConfig, forward_init: bool) -> Self {
        Self {
            kind: ParameterKind::Surface(config),
            forward_init,
        }
    }

    pub fn key(&self) -> &str {
        match &self.kind {
            ParameterKind::Field(c) => c.key(),
            ParameterKind::Surface(c) => c.key(),
        }
    }

    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    /// Whether the forward model produces the initial value of this
    /// parameter instead of it being sampled up front.
    pub fn forward_init(&self) -> bool {
        self.forward_init
    }

    pub fn init_file_fmt(&self) -> &str {
        match &self.kind {
            ParameterKind::Field(c) => c.init_file_fmt(),
            ParameterKind::Surface(c) => c.init_file_fmt(),
        }
    }

    /// "FIELD" or "SURFACE".
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ParameterKind::Field(_) => "FIELD",
            ParameterKind::Surface(_) => "SURFACE",
        }
    }
}

/// All parameters of an ensemble plus the grid their fields live on.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleConfig {
    grid_file: Option<PathBuf>,
    parameters: Vec<ParameterNode>,
}

impl EnsembleConfig {
    /// Fails on keys storage cannot hold, duplicate keys, and FIELD
    /// parameters without a grid file.
    pub fn new(grid_file: Option<PathBuf>, parameters: Vec<ParameterNode>) -> Result<Self> {
        let mut seen = HashSet::new();
        for node in &parameters {
            validate_key(node.key()).map_err(|e| ForwardModelError::InvalidParameter {
                key: node.key().to_string(),
                reason: e.to_string(),
            })?;
            if !seen.insert(node.key()) {
                return Err(ForwardModelError::DuplicateKey(node.key().to_string()));
            }
            if matches!(node.kind(), ParameterKind::Field(_)) && grid_file.is_none() {
                return Err(ForwardModelError::MissingGridFile(node.key().to_string()));
            }
        }
        Ok(Self {
            grid_file,
            parameters,
        })
    }

    pub fn grid_file(&self) -> Option<&Path> {
        self.grid_file.as_deref()
    }

    pub fn parameters(&self) -> &[ParameterNode] {
        &self.parameters
    }

    pub fn parameter(&self, key: &str) -> Option<&ParameterNode> {
        self.parameters.iter().find(|p| p.key() == key)
    }

    pub fn have_forward_init(&self) -> bool {
        self.parameters.iter().any(|p| p.forward_init())
    }

    /// Forward-initialized parameters in declaration order.
    pub fn forward_init_nodes(&self) -> impl Iterator<Item = &ParameterNode> {
        self.parameters.iter().filter(|p| p.forward_init())
    }

    pub fn init_file_fmt(&self, key: &str) -> Option<&str> {
        self.parameter(key).map(|p| p.init_file_fmt())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Field,
    Surface,
}

/// Parameter as written in a configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterSpec {
    pub key: String,
    pub kind: ParameterType,
    /// Init file name relative to the run path; `%d` is the realization.
    pub init_files: String,
    #[serde(default)]
    pub forward_init: bool,
    /// Field dimensions; defaults to the grid's.
    #[serde(default)]
    pub dimensions: Option<[usize; 3]>,
    #[serde(default)]
    pub init_transform: Option<String>,
    #[serde(default)]
    pub output_transform: Option<String>,
    #[serde(default)]
    pub min: Option<f32>,
    #[serde(default)]
    pub max: Option<f32>,
    /// Export file for fields; defaults to `{key}.grdecl`.
    #[serde(default)]
    pub output_file: Option<PathBuf>,
    #[serde(default)]
    pub base_surface: Option<PathBuf>,
}

impl ParameterSpec {
    /// Validate and build the parameter. `grid_shape` is used for fields
    /// that do not list their own dimensions.
    pub fn into_node(self, grid_shape: Option<GridShape>) -> Result<ParameterNode> {
        let invalid = |key: &str, reason: &str| ForwardModelError::InvalidParameter {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        match self.kind {
            ParameterType::Surface => {
                let base_surface = self
                    .base_surface
                    .ok_or_else(|| invalid(&self.key, "surface parameters need base_surface"))?;
                Ok(ParameterNode::surface(
                    SurfaceConfig::new(self.key, self.init_files, base_surface),
                    self.forward_init,
                ))
            }
            ParameterType::Field => {
                let shape = match self.dimensions {
                    Some([nx, ny, nz]) => GridShape::new(nx, ny, nz)
                        .map_err(|e| invalid(&self.key, &e.to_string()))?,
                    None => grid_shape
                        .ok_or_else(|| invalid(&self.key, "no dimensions and no grid shape"))?,
                };
                let output_file = self
                    .output_file
                    .unwrap_or_else(|| PathBuf::from(format!("{}.grdecl", self.key)));

                let mut config = FieldConfig::new(&self.key, shape, self.init_files, output_file)?
                    .with_truncation(self.min, self.max)?;
                if let Some(name) = &self.init_transform {
                    config = config.with_init_transform(name)?;
                }
                if let Some(name) = &self.output_transform {
                    config = config.with_output_transform(name)?;
                }
                Ok(ParameterNode::field(config, self.forward_init))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use field_loader::{FieldError, FieldTransform};

    fn poro() -> ParameterNode {
        let config = FieldConfig::new(
            "PORO",
            GridShape::new(2, 2, 1).unwrap(),
            "poro_%d.grdecl",
            "poro.grdecl",
        )
        .unwrap();
        ParameterNode::field(config, true)
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let result = EnsembleConfig::new(Some("GRID.EGRID".into()), vec![poro(), poro()]);
        assert!(matches!(result, Err(ForwardModelError::DuplicateKey(k)) if k == "PORO"));
    }

    #[test]
    fn test_keys_must_be_storable() {
        for key in ["a/b", "..", ""] {
            let node =
                ParameterNode::surface(SurfaceConfig::new(key, "top.irap", "base.irap"), true);
            let result = EnsembleConfig::new(None, vec![node]);
            assert!(
                matches!(&result, Err(ForwardModelError::InvalidParameter { key: k, .. }) if k == key),
                "{key}: {result:?}"
            );
        }
    }

    #[test]
    fn test_field_needs_grid() {
        let result = EnsembleConfig::new(None, vec![poro()]);
        assert!(matches!(result, Err(ForwardModelError::MissingGridFile(_))));

        let surface_only = EnsembleConfig::new(
            None,
            vec![ParameterNode::surface(
                SurfaceConfig::new("TOP", "top_%d.irap", "base.irap"),
                true,
            )],
        );
        assert!(surface_only.is_ok());
    }

    #[test]
    fn test_forward_init_nodes_in_order() {
        let top = ParameterNode::surface(SurfaceConfig::new("TOP", "top.irap", "base.irap"), false);
        let bot = ParameterNode::surface(SurfaceConfig::new("BOT", "bot.irap", "base.irap"), true);
        let config = EnsembleConfig::new(Some("G.EGRID".into()), vec![top, poro(), bot]).unwrap();

        assert!(config.have_forward_init());
        let keys: Vec<_> = config.forward_init_nodes().map(|n| n.key()).collect();
        assert_eq!(keys, vec!["PORO", "BOT"]);
        assert_eq!(config.init_file_fmt("PORO"), Some("poro_%d.grdecl"));
        assert_eq!(config.init_file_fmt("NOPE"), None);
    }

    #[test]
    fn test_parameter_from_yaml() {
        let yaml = r#"
key: PERMX
kind: field
init_files: permx_%d.grdecl
forward_init: true
init_transform: log
min: 0.0
"#;
        let spec: ParameterSpec = serde_yaml::from_str(yaml).unwrap();
        let node = spec.into_node(Some(GridShape::new(4, 3, 2).unwrap())).unwrap();

        let ParameterKind::Field(field) = node.kind() else {
            panic!("expected a field");
        };
        assert_eq!(field.shape(), GridShape::new(4, 3, 2).unwrap());
        assert_eq!(field.init_transform(), FieldTransform::Ln);
        assert_eq!(field.truncation().min, Some(0.0));
        assert_eq!(field.output_file(), Path::new("PERMX.grdecl"));
    }

    #[test]
    fn test_unknown_transform_fails() {
        let spec = ParameterSpec {
            key: "PORO".into(),
            kind: ParameterType::Field,
            init_files: "poro.grdecl".into(),
            forward_init: true,
            dimensions: Some([2, 2, 1]),
            init_transform: Some("SQUARE".into()),
            output_transform: None,
            min: None,
            max: None,
            output_file: None,
            base_surface: None,
        };
        assert!(matches!(
            spec.into_node(None),
            Err(ForwardModelError::Field(FieldError::UnknownTransform { .. }))
        ));
    }

    #[test]
    fn test_surface_needs_base() {
        let spec: ParameterSpec =
            serde_yaml::from_str("{key: TOP, kind: surface, init_files: top.irap}").unwrap();
        assert!(matches!(
            spec.into_node(None),
            Err(ForwardModelError::InvalidParameter { .. })
        ));
    }
}
