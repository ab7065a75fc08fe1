//! Ensemble metadata stored in `index.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted description of one ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleIndex {
    pub id: Uuid,
    pub experiment_id: Uuid,
    pub name: String,
    pub ensemble_size: usize,
    pub iteration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_ensemble_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
}

/// Parameters for creating an ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleParams {
    pub id: Uuid,
    pub ensemble_size: usize,
    pub experiment_id: Uuid,
    pub iteration: u32,
    pub name: String,
    pub prior_ensemble_id: Option<Uuid>,
}

impl EnsembleParams {
    /// Fresh ids, iteration 0, no prior ensemble.
    pub fn new(name: impl Into<String>, ensemble_size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            ensemble_size,
            experiment_id: Uuid::new_v4(),
            iteration: 0,
            name: name.into(),
            prior_ensemble_id: None,
        }
    }

    pub fn into_index(self, started_at: DateTime<Utc>) -> EnsembleIndex {
        EnsembleIndex {
            id: self.id,
            experiment_id: self.experiment_id,
            name: self.name,
            ensemble_size: self.ensemble_size,
            iteration: self.iteration,
            prior_ensemble_id: self.prior_ensemble_id,
            started_at,
        }
    }
}
