use std::path::PathBuf;
use std::sync::Arc;

use storage::LocalEnsemble;

/// One realization's run: where it ran and where its results go.
#[derive(Debug, Clone)]
pub struct RunArg {
    pub runpath: PathBuf,
    pub iens: usize,
    pub iteration: u32,
    pub ensemble: Arc<LocalEnsemble>,
}

impl RunArg {
    pub fn new(
        runpath: impl Into<PathBuf>,
        iens: usize,
        iteration: u32,
        ensemble: Arc<LocalEnsemble>,
    ) -> Self {
        Self {
            runpath: runpath.into(),
            iens,
            iteration,
            ensemble,
        }
    }
}
