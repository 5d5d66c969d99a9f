//! Staging directory lifecycle
//!
//! Each build run owns a fresh, uniquely named staging directory. The
//! guard removes it on every exit path; a run that asks for retention
//! converts the guard into a persisted path instead.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scoped staging directory, removed when dropped
#[derive(Debug)]
pub struct StagingDir {
    inner: TempDir,
}

impl StagingDir {
    /// Acquire a fresh staging directory.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            inner: TempDir::new()?,
        })
    }

    /// Path of the staging root.
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Persist the directory instead of removing it, returning its path.
    pub fn keep(self) -> PathBuf {
        self.inner.into_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_removed_on_drop() {
        let staging = StagingDir::new().unwrap();
        let path = staging.path().to_path_buf();
        fs::write(path.join("probe"), "x").unwrap();
        drop(staging);
        assert!(!path.exists());
    }

    #[test]
    fn test_keep_persists() {
        let staging = StagingDir::new().unwrap();
        let path = staging.keep();
        assert!(path.is_dir());
        fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn test_runs_get_distinct_roots() {
        let a = StagingDir::new().unwrap();
        let b = StagingDir::new().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
