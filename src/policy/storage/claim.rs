//! In-process ownership of storage directories.
//!
//! Two live storage caches pointed at the same directory would corrupt each
//! other's index, so opening one claims its canonical path in a process-wide
//! set and the claim is released on close or drop. Other processes are not
//! excluded.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::error::ConfigError;

static CLAIMED: Lazy<Mutex<FxHashSet<PathBuf>>> = Lazy::new(|| Mutex::new(FxHashSet::default()));

/// Exclusive in-process claim on a directory. Released on drop.
#[derive(Debug)]
pub(crate) struct DirectoryClaim {
    path: PathBuf,
}

impl DirectoryClaim {
    /// Claims `directory`, which must already exist.
    pub(crate) fn acquire(directory: &Path) -> Result<Self, ConfigError> {
        let path = directory.canonicalize().map_err(|e| {
            ConfigError::DirectoryUnavailable(format!("{}: {}", directory.display(), e))
        })?;

        let mut claimed = CLAIMED.lock();
        if !claimed.insert(path.clone()) {
            return Err(ConfigError::DirectoryInUse(path));
        }
        Ok(Self { path })
    }

    /// Canonical path of the claimed directory.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirectoryClaim {
    fn drop(&mut self) {
        CLAIMED.lock().remove(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_fails_until_release() {
        let dir = tempfile::tempdir().unwrap();

        let first = DirectoryClaim::acquire(dir.path()).unwrap();
        let err = DirectoryClaim::acquire(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::DirectoryInUse(_)));

        drop(first);
        assert!(DirectoryClaim::acquire(dir.path()).is_ok());
    }

    #[test]
    fn equivalent_paths_share_a_claim() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("inner")).unwrap();

        let _claim = DirectoryClaim::acquire(&dir.path().join("inner")).unwrap();
        let dotted = dir.path().join("inner").join("..").join("inner");
        assert!(DirectoryClaim::acquire(&dotted).is_err());
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryClaim::acquire(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, ConfigError::DirectoryUnavailable(_)));
    }
}
