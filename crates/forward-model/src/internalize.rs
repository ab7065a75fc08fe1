//! Load results and the response internalization hook.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::EnsembleConfig;
use crate::run_arg::RunArg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadStatus {
    LoadSuccessful,
    LoadFailure,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LoadSuccessful => "LOAD_SUCCESSFUL",
            Self::LoadFailure => "LOAD_FAILURE",
        })
    }
}

/// Outcome of loading one realization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResult {
    pub status: LoadStatus,
    pub message: String,
}

impl LoadResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: LoadStatus::LoadSuccessful,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: LoadStatus::LoadFailure,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == LoadStatus::LoadSuccessful
    }
}

/// Loads simulator responses once all parameters are in place.
pub trait ResultsInternalizer: Send + Sync {
    fn internalize(&self, config: &EnsembleConfig, run_arg: &RunArg) -> LoadResult;
}

/// Internalizer for ensembles without responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResponses;

impl ResultsInternalizer for NoResponses {
    fn internalize(&self, _config: &EnsembleConfig, _run_arg: &RunArg) -> LoadResult {
        LoadResult::success("")
    }
}
