//! Callbacks run when a realization's forward model finishes.

use ens_common::RealizationState;
use field_loader::GridMaskReader;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{EnsembleConfig, ParameterKind};
use crate::error::{ForwardModelError, Result};
use crate::internalize::{LoadResult, NoResponses, ResultsInternalizer};
use crate::run_arg::RunArg;
use crate::runpath::substitute_iens;

/// Message reported for any error or panic while loading a realization.
/// The detail goes to the log.
pub const GENERIC_FAILURE: &str = "Unhandled exception in callback for forward_model";

/// Turns the files a forward model left in its run path into stored
/// parameters and a realization state.
#[derive(Clone)]
pub struct ForwardModelOutcome {
    mask_reader: Arc<GridMaskReader>,
    internalizer: Arc<dyn ResultsInternalizer>,
}

impl std::fmt::Debug for ForwardModelOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardModelOutcome")
            .field("mask_cache", &self.mask_reader.stats())
            .finish_non_exhaustive()
    }
}

impl Default for ForwardModelOutcome {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ForwardModelOutcome {
    pub fn new(
        mask_reader: Arc<GridMaskReader>,
        internalizer: Arc<dyn ResultsInternalizer>,
    ) -> Self {
        Self {
            mask_reader,
            internalizer,
        }
    }

    /// Fresh mask cache and no responses.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(GridMaskReader::new()), Arc::new(NoResponses))
    }

    pub fn mask_reader(&self) -> &Arc<GridMaskReader> {
        &self.mask_reader
    }

    /// Load forward-initialized parameters and responses for one
    /// realization, then record `HasData` or `LoadFailure`.
    #[instrument(skip_all, fields(iens = run_arg.iens, runpath = %run_arg.runpath.display()))]
    pub fn forward_model_ok(&self, config: &EnsembleConfig, run_arg: &RunArg) -> LoadResult {
        let result = match catch_unwind(AssertUnwindSafe(|| self.load(config, run_arg))) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to load realization");
                LoadResult::failure(GENERIC_FAILURE)
            }
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "Panic while loading realization");
                LoadResult::failure(GENERIC_FAILURE)
            }
        };

        let state = if result.is_success() {
            RealizationState::HasData
        } else {
            RealizationState::LoadFailure
        };
        if let Err(e) = run_arg.ensemble.set_state(run_arg.iens, state) {
            error!(error = %e, %state, "Failed to record realization state");
        }

        info!(status = %result.status, %state, "Realization loaded");
        result
    }

    /// Called when a forward model exits without finishing.
    pub fn forward_model_exit(&self, run_arg: &RunArg) -> LoadResult {
        if let Err(e) = run_arg
            .ensemble
            .set_state(run_arg.iens, RealizationState::LoadFailure)
        {
            error!(iens = run_arg.iens, error = %e, "Failed to record realization state");
        }
        warn!(iens = run_arg.iens, "Forward model exited early");
        LoadResult::failure("")
    }

    fn load(&self, config: &EnsembleConfig, run_arg: &RunArg) -> Result<LoadResult> {
        let result = if config.have_forward_init() {
            self.load_parameters(config, run_arg)?
        } else {
            LoadResult::success("")
        };

        if !result.is_success() {
            return Ok(result);
        }
        Ok(self.internalizer.internalize(config, run_arg))
    }

    /// Missing surface files are collected into the message and the
    /// remaining parameters are still loaded. Any other error aborts.
    fn load_parameters(&self, config: &EnsembleConfig, run_arg: &RunArg) -> Result<LoadResult> {
        let ensemble = &run_arg.ensemble;
        let iens = run_arg.iens;
        let mut errors = String::new();

        for node in config.forward_init_nodes() {
            let key = node.key();
            let file_name = substitute_iens(node.init_file_fmt(), iens);
            let file_path = run_arg.runpath.join(&file_name);

            match node.kind() {
                ParameterKind::Surface(_) => {
                    if ensemble.has_surface_data(key, iens)? {
                        debug!(key, "Surface already stored, skipping");
                        continue;
                    }
                    if file_path.is_file() {
                        ensemble.save_surface_file(key, iens, &file_path)?;
                    } else {
                        warn!(key, file = %file_path.display(), "Surface init file not found");
                        errors.push_str(&format!(
                            "Failed to initialize parameter '{key}' in file {file_name}: File not found\n"
                        ));
                    }
                }
                ParameterKind::Field(field) => {
                    if ensemble.field_has_data(key, iens)? {
                        debug!(key, "Field already stored, skipping");
                        continue;
                    }
                    let grid_file = config
                        .grid_file()
                        .ok_or_else(|| ForwardModelError::MissingGridFile(key.to_string()))?;

                    let mut array = self.mask_reader.read_masked_field(
                        &file_path,
                        key,
                        grid_file,
                        Some(field.shape()),
                    )?;
                    field.apply_init(&mut array);
                    ensemble.save_field(key, iens, &array)?;
                }
            }
        }

        Ok(if errors.is_empty() {
            LoadResult::success("")
        } else {
            LoadResult::failure(errors)
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
