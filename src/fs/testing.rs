//! Fault-injecting filesystem used by unit tests

use crate::error::{Result, SyncError};
use crate::fs::{EntryMetadata, FileSystem, LocalFileSystem};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Local filesystem with selected operations forced to fail or misbehave.
///
/// Paths are matched by suffix so tests can name files relative to a
/// temporary root.
#[derive(Debug, Default)]
pub(crate) struct FaultyFileSystem {
    inner: LocalFileSystem,
    unreadable: Vec<PathBuf>,
    failing_copies: Vec<PathBuf>,
    corrupting_copies: Vec<PathBuf>,
    undeletable: Vec<PathBuf>,
}

impl FaultyFileSystem {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// `metadata` fails for paths ending in `suffix`
    pub(crate) fn unreadable(mut self, suffix: impl Into<PathBuf>) -> Self {
        self.unreadable.push(suffix.into());
        self
    }

    /// `copy_file` fails with permission denied when the source ends in `suffix`
    pub(crate) fn failing_copy(mut self, suffix: impl Into<PathBuf>) -> Self {
        self.failing_copies.push(suffix.into());
        self
    }

    /// `copy_file` writes the wrong bytes when the source ends in `suffix`
    pub(crate) fn corrupting_copy(mut self, suffix: impl Into<PathBuf>) -> Self {
        self.corrupting_copies.push(suffix.into());
        self
    }

    /// `remove_file` fails when the path ends in `suffix`
    pub(crate) fn undeletable(mut self, suffix: impl Into<PathBuf>) -> Self {
        self.undeletable.push(suffix.into());
        self
    }

    fn matches(list: &[PathBuf], path: &Path) -> bool {
        list.iter().any(|suffix| path.ends_with(suffix))
    }
}

impl FileSystem for FaultyFileSystem {
    fn dir_exists(&self, path: &Path) -> bool {
        self.inner.dir_exists(path)
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.inner.file_exists(path)
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        self.inner.create_dir(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.inner.remove_dir_all(path)
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> Result<u64> {
        if Self::matches(&self.failing_copies, src) {
            return Err(SyncError::PermissionDenied(src.to_path_buf()));
        }
        if Self::matches(&self.corrupting_copies, src) {
            let garbage = b"corrupted during transfer";
            std::fs::write(dst, garbage).map_err(|e| SyncError::io(dst, e))?;
            return Ok(garbage.len() as u64);
        }
        self.inner.copy_file(src, dst)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        if Self::matches(&self.undeletable, path) {
            return Err(SyncError::PermissionDenied(path.to_path_buf()));
        }
        self.inner.remove_file(path)
    }

    fn set_modified(&self, path: &Path, modified: SystemTime) -> Result<()> {
        self.inner.set_modified(path, modified)
    }

    fn clear_readonly(&self, path: &Path) -> Result<()> {
        self.inner.clear_readonly(path)
    }

    fn metadata(&self, path: &Path) -> Result<EntryMetadata> {
        if Self::matches(&self.unreadable, path) {
            return Err(SyncError::PermissionDenied(path.to_path_buf()));
        }
        self.inner.metadata(path)
    }

    fn walk<'a>(&'a self, root: &Path) -> Box<dyn Iterator<Item = Result<PathBuf>> + 'a> {
        self.inner.walk(root)
    }
}
