//! Forward-model completion callbacks.
//!
//! When a realization's forward model finishes, [`ForwardModelOutcome`]
//! reads the parameters it produced from the run path, stores them in the
//! ensemble, runs the [`ResultsInternalizer`] and records the realization
//! state.

pub mod config;
pub mod error;
pub mod internalize;
pub mod outcome;
pub mod run_arg;
pub mod runpath;

pub use config::{
    EnsembleConfig, ParameterKind, ParameterNode, ParameterSpec, ParameterType, SurfaceConfig,
};
pub use error::{ForwardModelError, Result};
pub use internalize::{LoadResult, LoadStatus, NoResponses, ResultsInternalizer};
pub use outcome::{ForwardModelOutcome, GENERIC_FAILURE};
pub use run_arg::RunArg;
pub use runpath::{substitute_iens, Runpaths};
