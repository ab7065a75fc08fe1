//! Read/write access to one stored ensemble.

use bytes::Bytes;
use chrono::Utc;
use ens_common::RealizationState;
use ndarray::Array3;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::codec::{decode_field, encode_field};
use crate::error::{StorageError, StorageResult};
use crate::index::{EnsembleIndex, EnsembleParams};
use crate::paths::{normalize, validate_key, EnsemblePaths};
use crate::state_map::StateMap;

/// An ensemble directory on a storage backend.
///
/// Shared between worker threads behind an `Arc`. Field and surface
/// writes for different realizations touch disjoint paths; state map
/// updates are serialized only while the map is persisted.
pub struct LocalEnsemble {
    backend: Arc<dyn StorageBackend>,
    path: PathBuf,
    index: EnsembleIndex,
    state_map: StateMap,
    persist_lock: Mutex<()>,
}

impl std::fmt::Debug for LocalEnsemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEnsemble")
            .field("backend", &self.backend.kind())
            .field("path", &self.path)
            .field("id", &self.index.id)
            .finish()
    }
}

impl LocalEnsemble {
    /// Create a new ensemble at `path`. Fails if an index already exists.
    #[instrument(skip(backend, params), fields(path = %path.display(), name = %params.name))]
    pub fn create(
        backend: Arc<dyn StorageBackend>,
        path: &Path,
        params: EnsembleParams,
    ) -> StorageResult<Self> {
        let path = normalize(path)?;
        let index_path = EnsemblePaths::index(&path);
        if backend.path_exists(&index_path) {
            return Err(StorageError::IndexExists(index_path));
        }

        backend.mkdir(&path)?;
        let index = params.into_index(Utc::now());
        backend.write_all(&index_path, &serde_json::to_vec_pretty(&index)?)?;

        let ensemble = Self {
            state_map: StateMap::new(index.ensemble_size),
            backend,
            path,
            index,
            persist_lock: Mutex::new(()),
        };
        ensemble.persist_state_map()?;

        info!(
            id = %ensemble.index.id,
            size = ensemble.index.ensemble_size,
            backend = ensemble.backend.kind(),
            "Created ensemble"
        );
        Ok(ensemble)
    }

    /// Open an existing ensemble. A missing state map means every
    /// realization is `Undefined`.
    pub fn open(backend: Arc<dyn StorageBackend>, path: &Path) -> StorageResult<Self> {
        let path = normalize(path)?;
        let index: EnsembleIndex =
            serde_json::from_slice(&backend.read(&EnsemblePaths::index(&path))?)?;

        let state_path = EnsemblePaths::state_map(&path);
        let state_map = if backend.path_exists(&state_path) {
            let states: Vec<RealizationState> = serde_json::from_slice(&backend.read(&state_path)?)?;
            if states.len() != index.ensemble_size {
                return Err(StorageError::Codec(format!(
                    "state map has {} entries for ensemble of size {}",
                    states.len(),
                    index.ensemble_size
                )));
            }
            StateMap::from_states(states)
        } else {
            StateMap::new(index.ensemble_size)
        };

        debug!(id = %index.id, path = %path.display(), "Opened ensemble");
        Ok(Self {
            backend,
            path,
            index,
            state_map,
            persist_lock: Mutex::new(()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.index.id
    }

    pub fn name(&self) -> &str {
        &self.index.name
    }

    pub fn index(&self) -> &EnsembleIndex {
        &self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ensemble_size(&self) -> usize {
        self.index.ensemble_size
    }

    pub fn iteration(&self) -> u32 {
        self.index.iteration
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    fn check(&self, key: &str, iens: usize) -> StorageResult<()> {
        if iens >= self.index.ensemble_size {
            return Err(StorageError::RealizationOutOfRange {
                iens,
                size: self.index.ensemble_size,
            });
        }
        validate_key(key)
    }

    fn check_iens(&self, iens: usize) -> StorageResult<()> {
        if iens >= self.index.ensemble_size {
            return Err(StorageError::RealizationOutOfRange {
                iens,
                size: self.index.ensemble_size,
            });
        }
        Ok(())
    }

    pub fn field_has_data(&self, key: &str, iens: usize) -> StorageResult<bool> {
        self.check(key, iens)?;
        Ok(self
            .backend
            .path_exists(&EnsemblePaths::field(&self.path, iens, key)))
    }

    /// Store a field for one realization. Stored fields are never replaced.
    #[instrument(skip(self, array), fields(ensemble = %self.index.id))]
    pub fn save_field(&self, key: &str, iens: usize, array: &Array3<f32>) -> StorageResult<()> {
        self.check(key, iens)?;
        let target = EnsemblePaths::field(&self.path, iens, key);
        if self.backend.path_exists(&target) {
            return Err(StorageError::AlreadyExists {
                key: key.to_string(),
                iens,
            });
        }

        self.backend
            .mkdir(&EnsemblePaths::realization(&self.path, iens))?;
        self.backend.write_all(&target, &encode_field(array))?;
        info!(shape = ?array.dim(), "Stored field");
        Ok(())
    }

    pub fn load_field(&self, key: &str, iens: usize) -> StorageResult<Array3<f32>> {
        self.check(key, iens)?;
        let data = self
            .backend
            .read(&EnsemblePaths::field(&self.path, iens, key))?;
        decode_field(&data)
    }

    /// Copy a surface file into the ensemble as an opaque blob. Like
    /// fields, stored surfaces are never replaced.
    #[instrument(skip(self), fields(ensemble = %self.index.id, source = %source.display()))]
    pub fn save_surface_file(&self, key: &str, iens: usize, source: &Path) -> StorageResult<()> {
        self.check(key, iens)?;
        let target = EnsemblePaths::surface(&self.path, iens, key);
        if self.backend.path_exists(&target) {
            return Err(StorageError::AlreadyExists {
                key: key.to_string(),
                iens,
            });
        }
        let data = std::fs::read(source).map_err(|e| StorageError::io_at(source, e))?;

        self.backend
            .mkdir(&EnsemblePaths::realization(&self.path, iens))?;
        self.backend.write_all(&target, &data)?;
        info!(size = data.len(), "Stored surface");
        Ok(())
    }

    pub fn has_surface_data(&self, key: &str, iens: usize) -> StorageResult<bool> {
        self.check(key, iens)?;
        Ok(self
            .backend
            .path_exists(&EnsemblePaths::surface(&self.path, iens, key)))
    }

    pub fn load_surface(&self, key: &str, iens: usize) -> StorageResult<Bytes> {
        self.check(key, iens)?;
        self.backend
            .read(&EnsemblePaths::surface(&self.path, iens, key))
    }

    pub fn state_map(&self) -> &StateMap {
        &self.state_map
    }

    pub fn get_state(&self, iens: usize) -> StorageResult<RealizationState> {
        self.state_map.get(iens)
    }

    /// Set a realization's state unconditionally and persist the map.
    pub fn set_state(&self, iens: usize, state: RealizationState) -> StorageResult<()> {
        self.check_iens(iens)?;
        self.state_map.set(iens, state)?;
        debug!(iens, %state, "Set realization state");
        self.persist_state_map()
    }

    /// Checked state change; see [`StateMap::try_transition`].
    pub fn try_transition(
        &self,
        iens: usize,
        to: RealizationState,
    ) -> StorageResult<RealizationState> {
        let from = self.state_map.try_transition(iens, to)?;
        self.persist_state_map()?;
        Ok(from)
    }

    fn persist_state_map(&self) -> StorageResult<()> {
        let _guard = self.persist_lock.lock();
        let states = self.state_map.snapshot()?;
        self.backend.write_all(
            &EnsemblePaths::state_map(&self.path),
            &serde_json::to_vec(&states)?,
        )
    }
}
