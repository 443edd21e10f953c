//! Advisory file locks guarding a shared install root.

use anyhow::{Context, Result};
use fs2::FileExt;
use log::debug;
use std::fs::{File, OpenOptions};
use std::path::Path;

use super::RealRuntime;

/// Holds an exclusive lock until dropped.
#[derive(Debug, Default)]
pub struct FileLock {
    file: Option<File>,
}

impl FileLock {
    /// A guard that holds nothing. Used by test runtimes.
    pub fn unlocked() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn lock_exclusive_impl(&self, path: &Path) -> Result<FileLock> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open lock file {:?}", path))?;

        if FileExt::try_lock_exclusive(&file).is_err() {
            log::warn!("Waiting for another modstrap process to release {:?}...", path);
            FileExt::lock_exclusive(&file)
                .with_context(|| format!("Failed to lock {:?}", path))?;
        }
        debug!("Acquired lock {:?}", path);

        Ok(FileLock { file: Some(file) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Runtime;
    use tempfile::tempdir;

    #[test]
    fn test_lock_creates_parent_and_is_held() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join("missing/root/.modstrap.lock");

        let lock = RealRuntime.lock_exclusive(&lock_path).unwrap();
        assert!(lock.is_held());
        assert!(lock_path.exists());
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempdir().unwrap();
        let lock_path = dir.path().join(".modstrap.lock");

        {
            let _lock = RealRuntime.lock_exclusive(&lock_path).unwrap();
            let other = File::open(&lock_path).unwrap();
            assert!(FileExt::try_lock_exclusive(&other).is_err());
        }

        let other = File::open(&lock_path).unwrap();
        assert!(FileExt::try_lock_exclusive(&other).is_ok());
    }

    #[test]
    fn test_unlocked_guard_holds_nothing() {
        assert!(!FileLock::unlocked().is_held());
    }
}
