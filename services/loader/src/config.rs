//! Loader configuration.
//!
//! Read from YAML, then:
//! 1. `~` and `${VAR}` / `${VAR:-default}` expanded in path fields
//! 2. environment overrides applied (`ENS_STORAGE_ROOT`, `ENS_GRID_FILE`,
//!    `ENS_LOG_FORMAT`)
//! 3. validated

use anyhow::{Context, Result};
use field_loader::read_active_mask;
use forward_model::{EnsembleConfig, ParameterSpec, Runpaths};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storage::{FileTreeBackend, MemoryBackend, StorageBackend};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    pub storage: StorageConfig,
    pub ensemble: EnsembleSection,
    #[serde(default)]
    pub grid_file: Option<PathBuf>,
    pub runpath_format: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    /// Update-step settings. Not used by loading; carried so one file can
    /// serve the whole workflow.
    #[serde(default)]
    pub analysis: Option<AnalysisConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnsembleSection {
    pub name: String,
    pub size: usize,
    #[serde(default)]
    pub iteration: u32,
    #[serde(default)]
    pub experiment_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_std_cutoff")]
    pub std_cutoff: f64,
}

fn default_alpha() -> f64 {
    3.0
}

fn default_std_cutoff() -> f64 {
    1e-6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

impl LoaderConfig {
    /// Load, expand, override from the process environment, validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read loader config from {:?}", path))?;
        Self::from_yaml(&content, |name| std::env::var(name).ok())
            .with_context(|| format!("Invalid loader config {:?}", path))
    }

    /// Same as [`LoaderConfig::load`] with an explicit variable lookup.
    pub fn from_yaml(content: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config: LoaderConfig =
            serde_yaml::from_str(content).context("Failed to parse loader config YAML")?;
        config.expand_paths(&lookup)?;
        config.apply_overrides(&lookup);
        config.validate()?;
        Ok(config)
    }

    fn expand_paths(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
        self.storage.root = expand_path(&self.storage.root, lookup)?;
        if let Some(grid) = &self.grid_file {
            self.grid_file = Some(expand_path(grid, lookup)?);
        }
        self.runpath_format = expand(&self.runpath_format, lookup)?;
        Ok(())
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup("ENS_STORAGE_ROOT") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(grid) = lookup("ENS_GRID_FILE") {
            self.grid_file = Some(PathBuf::from(grid));
        }
        if let Some(format) = lookup("ENS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.ensemble.name.is_empty(),
            "Ensemble name cannot be empty"
        );
        anyhow::ensure!(
            self.ensemble.size > 0,
            "Ensemble size must be greater than 0"
        );

        let valid_formats = ["json", "pretty"];
        anyhow::ensure!(
            valid_formats.contains(&self.logging.format.as_str()),
            "Invalid log format: {}. Must be one of: {:?}",
            self.logging.format,
            valid_formats
        );

        Runpaths::new(self.runpath_format.as_str())?;

        if let Some(analysis) = &self.analysis {
            anyhow::ensure!(analysis.alpha > 0.0, "analysis.alpha must be positive");
            anyhow::ensure!(
                analysis.std_cutoff >= 0.0,
                "analysis.std_cutoff cannot be negative"
            );
        }
        Ok(())
    }

    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        match self.storage.backend {
            BackendKind::File => Arc::new(FileTreeBackend::new()),
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
        }
    }

    pub fn runpaths(&self) -> Result<Runpaths> {
        Ok(Runpaths::new(self.runpath_format.as_str())?)
    }

    /// Build the parameter set. Fields without explicit dimensions take
    /// the shape of the grid file, which is read only if needed.
    pub fn ensemble_config(&self) -> Result<EnsembleConfig> {
        let needs_grid_shape = self
            .parameters
            .iter()
            .any(|p| p.kind == forward_model::ParameterType::Field && p.dimensions.is_none());

        let grid_shape = match (&self.grid_file, needs_grid_shape) {
            (Some(grid), true) => {
                let (_, shape) = read_active_mask(grid, None)
                    .with_context(|| format!("Failed to read grid {:?}", grid))?;
                Some(shape)
            }
            _ => None,
        };

        let nodes = self
            .parameters
            .iter()
            .cloned()
            .map(|spec| spec.into_node(grid_shape))
            .collect::<forward_model::Result<Vec<_>>>()?;
        Ok(EnsembleConfig::new(self.grid_file.clone(), nodes)?)
    }
}

fn expand(value: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<String> {
    let expanded = shellexpand::full_with_context(
        value,
        || std::env::var("HOME").ok(),
        |name| Ok::<_, std::convert::Infallible>(lookup(name)),
    )
    .with_context(|| format!("Failed to expand {:?}", value))?;
    Ok(expanded.into_owned())
}

fn expand_path(path: &Path, lookup: &impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    let raw = path
        .to_str()
        .with_context(|| format!("Path {:?} is not valid UTF-8", path))?;
    Ok(PathBuf::from(expand(raw, lookup)?))
}

/// Parse a realization selection like `0-4,7` into sorted, unique indices
/// below `size`.
pub fn parse_realizations(selection: &str, size: usize) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for part in selection.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse_index(a)?, parse_index(b)?),
            None => {
                let n = parse_index(part)?;
                (n, n)
            }
        };
        anyhow::ensure!(start <= end, "Invalid realization range {part:?}");
        anyhow::ensure!(
            end < size,
            "Realization {end} out of range for ensemble of size {size}"
        );
        out.extend(start..=end);
    }
    anyhow::ensure!(!out.is_empty(), "No realizations selected");
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

fn parse_index(s: &str) -> Result<usize> {
    s.trim()
        .parse()
        .with_context(|| format!("Invalid realization index {:?}", s))
}
