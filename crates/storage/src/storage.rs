//! A storage root holding many ensembles.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::ensemble::LocalEnsemble;
use crate::error::{StorageError, StorageResult};
use crate::index::{EnsembleIndex, EnsembleParams};
use crate::paths::{normalize, EnsemblePaths};

/// Ensembles live under `{root}/ensembles/{id}`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    backend: Arc<dyn StorageBackend>,
    root: PathBuf,
}

impl LocalStorage {
    /// Open (and create if needed) a storage root.
    pub fn open(backend: Arc<dyn StorageBackend>, root: &Path) -> StorageResult<Self> {
        let root = normalize(root)?;
        backend.mkdir(&root.join("ensembles"))?;
        info!(root = %root.display(), backend = backend.kind(), "Opened storage");
        Ok(Self { backend, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn ensemble_path(&self, id: Uuid) -> PathBuf {
        self.root.join("ensembles").join(id.to_string())
    }

    pub fn create_ensemble(
        &self,
        experiment_id: Uuid,
        name: impl Into<String>,
        ensemble_size: usize,
        iteration: u32,
        prior_ensemble_id: Option<Uuid>,
    ) -> StorageResult<LocalEnsemble> {
        let params = EnsembleParams {
            experiment_id,
            iteration,
            prior_ensemble_id,
            ..EnsembleParams::new(name, ensemble_size)
        };
        let path = self.ensemble_path(params.id);
        LocalEnsemble::create(Arc::clone(&self.backend), &path, params)
    }

    pub fn open_ensemble(&self, id: Uuid) -> StorageResult<LocalEnsemble> {
        let path = self.ensemble_path(id);
        if !self.backend.path_exists(&EnsemblePaths::index(&path)) {
            return Err(StorageError::EnsembleNotFound(id));
        }
        LocalEnsemble::open(Arc::clone(&self.backend), &path)
    }

    /// Indexes of every ensemble, oldest first. Directories without a
    /// readable index are skipped.
    pub fn list_ensembles(&self) -> StorageResult<Vec<EnsembleIndex>> {
        let mut indexes = Vec::new();
        for dir in self.backend.list(&self.root.join("ensembles"))? {
            let index_path = EnsemblePaths::index(&dir);
            if !self.backend.path_exists(&index_path) {
                continue;
            }
            let parsed = self
                .backend
                .read(&index_path)
                .and_then(|data| Ok(serde_json::from_slice::<EnsembleIndex>(&data)?));
            match parsed {
                Ok(index) => indexes.push(index),
                Err(e) => warn!(path = %index_path.display(), error = %e, "Skipping unreadable ensemble index"),
            }
        }
        indexes.sort_by_key(|index| (index.started_at, index.iteration));
        Ok(indexes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[test]
    fn test_create_open_list() {
        let storage = LocalStorage::open(Arc::new(MemoryBackend::new()), Path::new("/storage")).unwrap();
        let experiment = Uuid::new_v4();

        let first = storage.create_ensemble(experiment, "prior", 3, 0, None).unwrap();
        let second = storage
            .create_ensemble(experiment, "posterior", 3, 1, Some(first.id()))
            .unwrap();

        let opened = storage.open_ensemble(second.id()).unwrap();
        assert_eq!(opened.index().prior_ensemble_id, Some(first.id()));
        assert_eq!(opened.iteration(), 1);

        let listed: Vec<_> = storage
            .list_ensembles()
            .unwrap()
            .into_iter()
            .map(|index| index.name)
            .collect();
        assert_eq!(listed, vec!["prior", "posterior"]);
    }

    #[test]
    fn test_open_unknown_ensemble() {
        let storage = LocalStorage::open(Arc::new(MemoryBackend::new()), Path::new("/storage")).unwrap();
        let id = Uuid::new_v4();
        assert!(matches!(
            storage.open_ensemble(id),
            Err(StorageError::EnsembleNotFound(found)) if found == id
        ));
    }
}
