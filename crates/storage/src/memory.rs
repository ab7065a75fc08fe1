//! In-memory storage for tests and throwaway runs.

use bytes::Bytes;
use dashmap::DashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::backend::{BlobWriter, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::paths::normalize;

#[derive(Debug, Clone)]
enum Entry {
    Dir,
    Blob(Bytes),
}

/// Directory tree held in a sharded map keyed by normalized path.
///
/// Clones share the same tree. The filesystem root always exists.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: Arc<DashMap<PathBuf, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn blob_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.value(), Entry::Blob(_)))
            .count()
    }

    fn is_dir_normalized(&self, path: &Path) -> bool {
        if path.parent().is_none() {
            return true;
        }
        matches!(self.entries.get(path).as_deref(), Some(Entry::Dir))
    }
}

/// Buffers writes and commits them to the map on `finish` or drop.
struct MemoryBlobWriter {
    entries: Arc<DashMap<PathBuf, Entry>>,
    path: PathBuf,
    buffer: Vec<u8>,
    committed: bool,
}

impl MemoryBlobWriter {
    fn commit(&mut self) {
        if self.committed {
            return;
        }
        let data = Bytes::from(std::mem::take(&mut self.buffer));
        debug!(path = %self.path.display(), size = data.len(), "Committed blob");
        self.entries.insert(self.path.clone(), Entry::Blob(data));
        self.committed = true;
    }
}

impl Write for MemoryBlobWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl BlobWriter for MemoryBlobWriter {
    fn finish(mut self: Box<Self>) -> StorageResult<()> {
        self.commit();
        Ok(())
    }
}

impl Drop for MemoryBlobWriter {
    fn drop(&mut self) {
        self.commit();
    }
}

impl StorageBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn path_exists(&self, path: &Path) -> bool {
        match normalize(path) {
            Ok(path) => path.parent().is_none() || self.entries.contains_key(&path),
            Err(_) => false,
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        normalize(path)
            .map(|p| self.is_dir_normalized(&p))
            .unwrap_or(false)
    }

    fn mkdir(&self, path: &Path) -> StorageResult<()> {
        let path = normalize(path)?;
        let mut ancestors: Vec<&Path> = path.ancestors().collect();
        ancestors.reverse();
        for dir in ancestors.into_iter().filter(|p| p.parent().is_some()) {
            let entry = self
                .entries
                .entry(dir.to_path_buf())
                .or_insert(Entry::Dir);
            if let Entry::Blob(_) = entry.value() {
                return Err(StorageError::NotADirectory(dir.to_path_buf()));
            }
        }
        Ok(())
    }

    fn open_scoped_write(&self, path: &Path) -> StorageResult<Box<dyn BlobWriter>> {
        let path = normalize(path)?;
        if self.is_dir_normalized(&path) {
            return Err(StorageError::IsADirectory(path));
        }
        match path.parent() {
            Some(parent) if self.is_dir_normalized(parent) => {}
            _ => return Err(StorageError::MissingParent(path)),
        }
        Ok(Box::new(MemoryBlobWriter {
            entries: Arc::clone(&self.entries),
            path,
            buffer: Vec::new(),
            committed: false,
        }))
    }

    fn read(&self, path: &Path) -> StorageResult<Bytes> {
        let path = normalize(path)?;
        if self.is_dir_normalized(&path) {
            return Err(StorageError::IsADirectory(path));
        }
        let data = match self.entries.get(&path).as_deref() {
            Some(Entry::Blob(data)) => data.clone(),
            _ => return Err(StorageError::NotFound(path)),
        };
        Ok(data)
    }

    fn list(&self, path: &Path) -> StorageResult<Vec<PathBuf>> {
        let path = normalize(path)?;
        if !self.is_dir_normalized(&path) {
            return Err(if self.entries.contains_key(&path) {
                StorageError::NotADirectory(path)
            } else {
                StorageError::NotFound(path)
            });
        }
        let mut children: Vec<PathBuf> = self
            .entries
            .iter()
            .filter(|e| e.key().parent() == Some(path.as_path()))
            .map(|e| e.key().clone())
            .collect();
        children.sort();
        Ok(children)
    }
}
