//! Path normalization and the on-disk layout of an ensemble.

use std::path::{Component, Path, PathBuf};

use crate::error::{StorageError, StorageResult};

/// Absolute, lexically cleaned form of `path`.
///
/// `.` components are dropped and `..` removes the previous component.
/// Symlinks are not resolved, so the result is usable as a map key for
/// paths that do not exist yet.
pub fn normalize(path: &Path) -> StorageResult<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Parameter keys become file names, so they must be a single plain path
/// component.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Path builder for the ensemble directory layout.
///
/// ```text
/// {ensemble}/index.json
/// {ensemble}/state_map.json
/// {ensemble}/realization-{iens}/{key}.field
/// {ensemble}/realization-{iens}/{key}.surface
/// ```
pub struct EnsemblePaths;

impl EnsemblePaths {
    pub fn index(ensemble: &Path) -> PathBuf {
        ensemble.join("index.json")
    }

    pub fn state_map(ensemble: &Path) -> PathBuf {
        ensemble.join("state_map.json")
    }

    pub fn realization(ensemble: &Path, iens: usize) -> PathBuf {
        ensemble.join(format!("realization-{}", iens))
    }

    pub fn field(ensemble: &Path, iens: usize, key: &str) -> PathBuf {
        Self::realization(ensemble, iens).join(format!("{}.field", key))
    }

    pub fn surface(ensemble: &Path, iens: usize, key: &str) -> PathBuf {
        Self::realization(ensemble, iens).join(format!("{}.surface", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        for key in ["PORO", "MULTZ-1", ".hidden"] {
            assert!(validate_key(key).is_ok(), "{key}");
        }
        for key in ["", ".", "..", "a/b", "a\\b"] {
            assert!(
                matches!(validate_key(key), Err(StorageError::InvalidKey(_))),
                "{key}"
            );
        }
    }

    #[test]
    fn test_normalize_cleans_dots() {
        assert_eq!(
            normalize(Path::new("/data/./ens/../ens/index.json")).unwrap(),
            PathBuf::from("/data/ens/index.json")
        );
        assert_eq!(normalize(Path::new("/../a")).unwrap(), PathBuf::from("/a"));
    }

    #[test]
    fn test_normalize_makes_absolute() {
        let normalized = normalize(Path::new("relative/dir")).unwrap();
        assert!(normalized.is_absolute());
        assert!(normalized.ends_with("relative/dir"));
    }

    #[test]
    fn test_layout() {
        let root = Path::new("/storage/ensembles/abc");
        assert_eq!(
            EnsemblePaths::field(root, 3, "PORO"),
            PathBuf::from("/storage/ensembles/abc/realization-3/PORO.field")
        );
        assert_eq!(
            EnsemblePaths::surface(root, 0, "TOP"),
            PathBuf::from("/storage/ensembles/abc/realization-0/TOP.surface")
        );
        assert_eq!(
            EnsemblePaths::state_map(root),
            PathBuf::from("/storage/ensembles/abc/state_map.json")
        );
    }
}
