//! Ensemble storage.
//!
//! Provides:
//! - [`StorageBackend`]: a directory tree of blobs, backed by the
//!   filesystem ([`FileTreeBackend`]) or memory ([`MemoryBackend`])
//! - [`LocalEnsemble`]: per-realization fields, surfaces and states
//! - [`LocalStorage`]: a root directory holding many ensembles

pub mod backend;
pub mod codec;
pub mod ensemble;
pub mod error;
pub mod index;
pub mod local;
pub mod memory;
pub mod paths;
pub mod state_map;
pub mod storage;

pub use backend::{BlobWriter, StorageBackend};
pub use ensemble::LocalEnsemble;
pub use error::{StorageError, StorageResult};
pub use index::{EnsembleIndex, EnsembleParams};
pub use local::FileTreeBackend;
pub use memory::MemoryBackend;
pub use paths::{normalize, validate_key, EnsemblePaths};
pub use state_map::StateMap;
pub use storage::LocalStorage;
