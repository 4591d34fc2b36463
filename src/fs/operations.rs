//! Filesystem capability used by the scanner and the reconciliation engine
//!
//! The engine never touches `std::fs` directly; it goes through the
//! [`FileSystem`] trait so alternative backends (and fault-injecting test
//! doubles) can be plugged in.

use crate::error::{IoResultExt, Result, SyncError};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Kind of a filesystem entry, as reported without following links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symlink, socket, FIFO, device or anything else
    Other,
}

/// Metadata needed to compare two entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    /// Entry kind
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

/// Operations the mirroring core needs from a filesystem
pub trait FileSystem: Send + Sync {
    /// Whether `path` exists and is a directory
    fn dir_exists(&self, path: &Path) -> bool;

    /// Whether `path` exists and is a regular file
    fn file_exists(&self, path: &Path) -> bool;

    /// Create a directory and any missing parents
    fn create_dir(&self, path: &Path) -> Result<()>;

    /// Remove a directory and everything below it
    fn remove_dir_all(&self, path: &Path) -> Result<()>;

    /// Copy `src` over `dst`, replacing any existing file. Returns bytes copied.
    fn copy_file(&self, src: &Path, dst: &Path) -> Result<u64>;

    /// Remove a single file
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Set the last modification time of `path`
    fn set_modified(&self, path: &Path, modified: SystemTime) -> Result<()>;

    /// Drop the read-only attribute so the entry can be replaced or removed
    fn clear_readonly(&self, path: &Path) -> Result<()>;

    /// Kind, size and modification time of `path` (links are not followed)
    fn metadata(&self, path: &Path) -> Result<EntryMetadata>;

    /// Every entry below `root`, recursively, excluding `root` itself.
    ///
    /// Unreadable entries are yielded as errors and the walk continues.
    fn walk<'a>(&'a self, root: &Path) -> Box<dyn Iterator<Item = Result<PathBuf>> + 'a>;
}

/// [`FileSystem`] backed by the local disk
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    /// Create a local filesystem handle
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for LocalFileSystem {
    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_path(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).with_path(path)
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> Result<u64> {
        if let Ok(existing) = fs::symlink_metadata(dst) {
            // fs::copy would follow the link and overwrite its target
            if existing.file_type().is_symlink() {
                return Err(SyncError::InvalidPath(format!(
                    "Refusing to copy through symbolic link: {}",
                    dst.display()
                )));
            }
            // A read-only destination would reject the truncating open
            if existing.is_file() {
                self.clear_readonly(dst)?;
            }
        }
        fs::copy(src, dst).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound && !src.exists() {
                SyncError::NotFound(src.to_path_buf())
            } else {
                SyncError::io(dst, e)
            }
        })
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_path(path)
    }

    fn set_modified(&self, path: &Path, modified: SystemTime) -> Result<()> {
        filetime::set_file_mtime(path, FileTime::from_system_time(modified)).with_path(path)
    }

    fn clear_readonly(&self, path: &Path) -> Result<()> {
        let metadata = fs::symlink_metadata(path).with_path(path)?;
        let mut permissions = metadata.permissions();
        if !permissions.readonly() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            permissions.set_mode(permissions.mode() | 0o200);
        }

        #[cfg(not(unix))]
        {
            #[allow(clippy::permissions_set_readonly_false)]
            permissions.set_readonly(false);
        }

        fs::set_permissions(path, permissions).with_path(path)
    }

    fn metadata(&self, path: &Path) -> Result<EntryMetadata> {
        let metadata = fs::symlink_metadata(path).with_path(path)?;
        let file_type = metadata.file_type();

        let kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        };

        Ok(EntryMetadata {
            kind,
            size: if kind == EntryKind::File { metadata.len() } else { 0 },
            modified: metadata.modified().with_path(path)?,
        })
    }

    fn walk<'a>(&'a self, root: &Path) -> Box<dyn Iterator<Item = Result<PathBuf>> + 'a> {
        let walker = WalkDir::new(root).min_depth(1).follow_links(false);
        Box::new(walker.into_iter().map(|entry| {
            entry.map(|e| e.into_path()).map_err(SyncError::from)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_copy_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, b"new content").unwrap();
        fs::write(&dst, b"old").unwrap();

        let fs_ops = LocalFileSystem::new();
        let copied = fs_ops.copy_file(&src, &dst).unwrap();

        assert_eq!(copied, 11);
        assert_eq!(fs::read(&dst).unwrap(), b"new content");
    }

    #[test]
    fn test_copy_replaces_readonly_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        fs::write(&src, b"fresh").unwrap();
        fs::write(&dst, b"stale").unwrap();

        let mut permissions = fs::metadata(&dst).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&dst, permissions).unwrap();

        LocalFileSystem::new().copy_file(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"fresh");
    }

    #[test]
    fn test_copy_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = LocalFileSystem::new()
            .copy_file(&dir.path().join("gone"), &dir.path().join("dst"));
        assert!(matches!(result, Err(SyncError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_refuses_symlink_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src.txt");
        let victim = dir.path().join("victim.txt");
        let link = dir.path().join("link.txt");
        fs::write(&src, b"incoming").unwrap();
        fs::write(&victim, b"untouched").unwrap();
        std::os::unix::fs::symlink(&victim, &link).unwrap();

        let result = LocalFileSystem::new().copy_file(&src, &link);

        assert!(matches!(result, Err(SyncError::InvalidPath(_))));
        assert_eq!(fs::read(&victim).unwrap(), b"untouched");
    }

    #[test]
    fn test_set_modified_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file.txt");
        fs::write(&path, b"x").unwrap();

        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let fs_ops = LocalFileSystem::new();
        fs_ops.set_modified(&path, when).unwrap();

        assert_eq!(fs_ops.metadata(&path).unwrap().modified, when);
    }

    #[test]
    fn test_clear_readonly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("locked.txt");
        fs::write(&path, b"x").unwrap();

        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions).unwrap();

        LocalFileSystem::new().clear_readonly(&path).unwrap();
        assert!(!fs::metadata(&path).unwrap().permissions().readonly());
    }

    #[test]
    fn test_metadata_kinds() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.bin");
        fs::write(&file, vec![0u8; 42]).unwrap();

        let fs_ops = LocalFileSystem::new();
        let file_meta = fs_ops.metadata(&file).unwrap();
        assert_eq!(file_meta.kind, EntryKind::File);
        assert_eq!(file_meta.size, 42);
        assert_eq!(fs_ops.metadata(dir.path()).unwrap().kind, EntryKind::Directory);
    }

    #[cfg(unix)]
    #[test]
    fn test_metadata_does_not_follow_symlinks() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("target.txt");
        let link = dir.path().join("link.txt");
        fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(LocalFileSystem::new().metadata(&link).unwrap().kind, EntryKind::Other);
    }

    #[test]
    fn test_walk_excludes_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/c.txt"), b"c").unwrap();

        let fs_ops = LocalFileSystem::new();
        let mut paths: Vec<PathBuf> = fs_ops
            .walk(dir.path())
            .map(|r| r.unwrap())
            .collect();
        paths.sort();

        assert_eq!(
            paths,
            vec![
                dir.path().join("a"),
                dir.path().join("a/b"),
                dir.path().join("a/b/c.txt"),
            ]
        );
    }
}
