//! Parallel loading of realizations.

use anyhow::Result;
use forward_model::{EnsembleConfig, ForwardModelOutcome, LoadResult, RunArg, Runpaths};
use futures::future::join_all;
use std::sync::{Arc, OnceLock};
use storage::LocalEnsemble;
use tracing::{error, info, warn};

/// Per-realization outcome of a load.
#[derive(Debug, Default)]
pub struct LoadSummary {
    pub loaded: Vec<usize>,
    pub failed: Vec<(usize, String)>,
}

impl LoadSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, iens: usize, result: LoadResult) {
        if result.is_success() {
            self.loaded.push(iens);
        } else {
            self.failed.push((iens, result.message));
        }
    }
}

/// Runs the forward-model callback for a set of realizations.
pub struct RealizationLoader {
    outcome: Arc<ForwardModelOutcome>,
    config: Arc<EnsembleConfig>,
    ensemble: Arc<LocalEnsemble>,
    runpaths: Runpaths,
}

impl RealizationLoader {
    pub fn new(
        outcome: Arc<ForwardModelOutcome>,
        config: Arc<EnsembleConfig>,
        ensemble: Arc<LocalEnsemble>,
        runpaths: Runpaths,
    ) -> Self {
        Self {
            outcome,
            config,
            ensemble,
            runpaths,
        }
    }

    fn run_arg(&self, iens: usize) -> RunArg {
        RunArg::new(
            self.runpaths.get(iens, self.ensemble.iteration()),
            iens,
            self.ensemble.iteration(),
            Arc::clone(&self.ensemble),
        )
    }

    /// Load every realization on the blocking pool and wait for all of
    /// them.
    pub async fn load(&self, realizations: &[usize]) -> Result<LoadSummary> {
        self.load_until(realizations, std::future::pending()).await
    }

    /// Like [`RealizationLoader::load`], but stops waiting when `cancel`
    /// resolves. Realizations finished by then keep their result; the rest
    /// go through the exit hook.
    pub async fn load_until(
        &self,
        realizations: &[usize],
        cancel: impl std::future::Future<Output = ()>,
    ) -> Result<LoadSummary> {
        info!(
            ensemble = %self.ensemble.id(),
            count = realizations.len(),
            "Loading realizations"
        );

        let run_args: Vec<RunArg> = realizations.iter().map(|&i| self.run_arg(i)).collect();
        let finished: Arc<Vec<OnceLock<LoadResult>>> =
            Arc::new(run_args.iter().map(|_| OnceLock::new()).collect());

        let handles = run_args.iter().enumerate().map(|(slot, run_arg)| {
            let outcome = Arc::clone(&self.outcome);
            let config = Arc::clone(&self.config);
            let run_arg = run_arg.clone();
            let finished = Arc::clone(&finished);
            tokio::task::spawn_blocking(move || {
                let result = outcome.forward_model_ok(&config, &run_arg);
                let _ = finished[slot].set(result.clone());
                result
            })
        });

        let mut summary = LoadSummary::default();
        tokio::select! {
            joined = join_all(handles) => {
                for (run_arg, joined) in run_args.iter().zip(joined) {
                    let result = match joined {
                        Ok(result) => result,
                        Err(e) => {
                            error!(iens = run_arg.iens, error = %e, "Load task failed");
                            self.outcome.forward_model_exit(run_arg);
                            LoadResult::failure(e.to_string())
                        }
                    };
                    summary.record(run_arg.iens, result);
                }
            }
            _ = cancel => {
                warn!("Load interrupted, marking unfinished realizations as failed");
                for (slot, run_arg) in run_args.iter().enumerate() {
                    match finished[slot].get() {
                        Some(result) => summary.record(run_arg.iens, result.clone()),
                        None => {
                            self.outcome.forward_model_exit(run_arg);
                            summary
                                .failed
                                .push((run_arg.iens, "interrupted".to_string()));
                        }
                    }
                }
            }
        }

        info!(
            loaded = summary.loaded.len(),
            failed = summary.failed.len(),
            "Finished loading"
        );
        Ok(summary)
    }
}
