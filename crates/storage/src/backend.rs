//! The storage backend abstraction.

use bytes::Bytes;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageResult;

/// Buffered writer for one blob. Data becomes visible once committed.
pub trait BlobWriter: Write + Send {
    /// Flush and commit the written data.
    fn finish(self: Box<Self>) -> StorageResult<()>;
}

/// A directory tree of blobs, on disk or in memory.
///
/// Every path is normalized (absolute, lexically cleaned) before use.
/// Writing into a directory that does not exist is an error.
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Short name for logs ("file", "memory").
    fn kind(&self) -> &'static str;

    fn path_exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    /// Create a directory and all missing ancestors.
    fn mkdir(&self, path: &Path) -> StorageResult<()>;

    /// Open a blob for writing, replacing any existing content on commit.
    fn open_scoped_write(&self, path: &Path) -> StorageResult<Box<dyn BlobWriter>>;

    fn read(&self, path: &Path) -> StorageResult<Bytes>;

    /// Direct children of a directory, sorted.
    fn list(&self, path: &Path) -> StorageResult<Vec<PathBuf>>;

    /// Write a whole blob through a scoped writer.
    fn write_all(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut writer = self.open_scoped_write(path)?;
        writer.write_all(data)?;
        writer.finish()
    }
}
