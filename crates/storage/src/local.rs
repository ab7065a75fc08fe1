//! Filesystem-backed storage.

use bytes::Bytes;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::backend::{BlobWriter, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::paths::normalize;

/// Stores blobs as files under their normalized paths.
#[derive(Debug, Default, Clone)]
pub struct FileTreeBackend;

impl FileTreeBackend {
    pub fn new() -> Self {
        Self
    }
}

const PARTIAL_MARKER: &str = ".partial-";

/// Sibling path the blob is written to before it is renamed into place.
fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}{}{}", name, PARTIAL_MARKER, Uuid::new_v4().simple()))
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') && n.contains(PARTIAL_MARKER))
        .unwrap_or(false)
}

/// Writes to a partial file next to the target and renames it over the
/// target on `finish` or drop. Readers see the old content until then.
struct FileBlobWriter {
    path: PathBuf,
    partial: PathBuf,
    file: Option<BufWriter<File>>,
}

impl FileBlobWriter {
    fn commit(&mut self) -> StorageResult<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        let result = file
            .into_inner()
            .map_err(|e| StorageError::io_at(&self.partial, e.into_error()))
            .and_then(|f| f.sync_all().map_err(|e| StorageError::io_at(&self.partial, e)))
            .and_then(|_| {
                fs::rename(&self.partial, &self.path)
                    .map_err(|e| StorageError::io_at(&self.path, e))
            });
        match result {
            Ok(()) => {
                debug!(path = %self.path.display(), "Committed file");
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&self.partial);
                Err(e)
            }
        }
    }

    fn file(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "writer already committed"))
    }
}

impl Write for FileBlobWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file()?.flush()
    }
}

impl BlobWriter for FileBlobWriter {
    fn finish(mut self: Box<Self>) -> StorageResult<()> {
        self.commit()
    }
}

impl Drop for FileBlobWriter {
    fn drop(&mut self) {
        if let Err(e) = self.commit() {
            warn!(path = %self.path.display(), error = %e, "Failed to commit file on drop");
        }
    }
}

impl StorageBackend for FileTreeBackend {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn path_exists(&self, path: &Path) -> bool {
        normalize(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        normalize(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    fn mkdir(&self, path: &Path) -> StorageResult<()> {
        let path = normalize(path)?;
        fs::create_dir_all(&path).map_err(|e| StorageError::io_at(&path, e))
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    fn open_scoped_write(&self, path: &Path) -> StorageResult<Box<dyn BlobWriter>> {
        let path = normalize(path)?;
        if path.is_dir() {
            return Err(StorageError::IsADirectory(path));
        }
        match path.parent() {
            Some(parent) if parent.is_dir() => {}
            _ => return Err(StorageError::MissingParent(path)),
        }
        let partial = partial_path(&path);
        let file = File::create(&partial).map_err(|e| StorageError::io_at(&partial, e))?;
        Ok(Box::new(FileBlobWriter {
            path,
            partial,
            file: Some(BufWriter::new(file)),
        }))
    }

    fn read(&self, path: &Path) -> StorageResult<Bytes> {
        let path = normalize(path)?;
        if path.is_dir() {
            return Err(StorageError::IsADirectory(path));
        }
        let data = fs::read(&path).map_err(|e| StorageError::io_at(&path, e))?;
        Ok(Bytes::from(data))
    }

    fn list(&self, path: &Path) -> StorageResult<Vec<PathBuf>> {
        let path = normalize(path)?;
        if !path.is_dir() {
            return Err(if path.exists() {
                StorageError::NotADirectory(path)
            } else {
                StorageError::NotFound(path)
            });
        }
        let mut children = Vec::new();
        for entry in fs::read_dir(&path).map_err(|e| StorageError::io_at(&path, e))? {
            let entry = entry.map_err(|e| StorageError::io_at(&path, e))?;
            let child = entry.path();
            if !is_partial(&child) {
                children.push(child);
            }
        }
        children.sort();
        Ok(children)
    }
}
