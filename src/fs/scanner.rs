//! Directory scanner producing comparable tree snapshots
//!
//! A scan walks a root recursively and records every subdirectory and every
//! regular file, keyed by its path relative to the root. Entries that cannot
//! be read or classified are logged and left out; the scan itself only fails
//! when the root is unusable.

use crate::config::PathCase;
use crate::error::{Result, SyncError};
use crate::fs::{EntryKind, FileSystem};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Comparison key for a relative path.
///
/// Components are joined with `/`; in [`PathCase::Insensitive`] mode the key
/// is case-folded so `Docs/A.txt` and `docs/a.TXT` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PathKey(String);

impl PathKey {
    /// Build the key for `relative` under the given case mode
    pub fn new(relative: &Path, case: PathCase) -> Self {
        let joined = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");

        if case.is_insensitive() {
            Self(joined.to_lowercase())
        } else {
            Self(joined)
        }
    }

    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata recorded for one regular file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path to the file
    pub absolute_path: PathBuf,
    /// Path relative to the snapshot root, as found on disk
    pub relative_path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl FileRecord {
    /// Same size and modification time
    pub fn metadata_matches(&self, other: &FileRecord) -> bool {
        self.size == other.size && self.modified == other.modified
    }
}

/// Immutable view of a directory tree taken at scan time
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    root: PathBuf,
    path_case: PathCase,
    subdirectories: BTreeMap<PathKey, PathBuf>,
    files: HashMap<PathKey, FileRecord>,
    skipped: usize,
}

impl DirectorySnapshot {
    /// Empty snapshot of `root`
    pub fn empty(root: impl Into<PathBuf>, path_case: PathCase) -> Self {
        Self {
            root: root.into(),
            path_case,
            subdirectories: BTreeMap::new(),
            files: HashMap::new(),
            skipped: 0,
        }
    }

    /// Root that was scanned
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Case mode the keys were built with
    pub fn path_case(&self) -> PathCase {
        self.path_case
    }

    /// Key for a relative path under this snapshot's case mode
    pub fn key_for(&self, relative: &Path) -> PathKey {
        PathKey::new(relative, self.path_case)
    }

    /// Whether a subdirectory with this key was seen
    pub fn contains_dir(&self, key: &PathKey) -> bool {
        self.subdirectories.contains_key(key)
    }

    /// File recorded under this key
    pub fn file(&self, key: &PathKey) -> Option<&FileRecord> {
        self.files.get(key)
    }

    /// Whether a file with this key was seen
    pub fn contains_file(&self, key: &PathKey) -> bool {
        self.files.contains_key(key)
    }

    /// All files, in arbitrary order
    pub fn files(&self) -> impl Iterator<Item = (&PathKey, &FileRecord)> {
        self.files.iter()
    }

    /// All subdirectories as `(key, relative path)` pairs
    pub fn subdirectories(&self) -> impl Iterator<Item = (&PathKey, &Path)> {
        self.subdirectories.iter().map(|(k, p)| (k, p.as_path()))
    }

    /// Subdirectories ordered so every parent precedes its children
    pub fn dirs_shallowest_first(&self) -> Vec<(&PathKey, &Path)> {
        let mut dirs: Vec<_> = self.subdirectories().collect();
        dirs.sort_by(|a, b| {
            a.1.as_os_str()
                .len()
                .cmp(&b.1.as_os_str().len())
                .then_with(|| a.0.cmp(b.0))
        });
        dirs
    }

    /// Subdirectories ordered so every child precedes its parent
    pub fn dirs_deepest_first(&self) -> Vec<(&PathKey, &Path)> {
        let mut dirs = self.dirs_shallowest_first();
        dirs.reverse();
        dirs
    }

    /// Absolute path of `relative` inside this tree
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    /// Absolute path of `relative`, reusing the on-disk spelling of every
    /// leading directory this snapshot already holds under the same key.
    ///
    /// Identical to [`absolute`](Self::absolute) in case-sensitive mode.
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        let mut resolved = PathBuf::new();
        let mut prefix = PathBuf::new();

        for component in relative.components() {
            prefix.push(component);
            match self.subdirectories.get(&self.key_for(&prefix)) {
                Some(existing) => resolved = existing.clone(),
                None => resolved.push(component),
            }
        }

        self.root.join(resolved)
    }

    /// Number of files recorded
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Number of subdirectories recorded
    pub fn dir_count(&self) -> usize {
        self.subdirectories.len()
    }

    /// Total size of all recorded files
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|f| f.size).sum()
    }

    /// Entries left out because they could not be read or are not plain
    /// files or directories
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Options controlling a scan.
///
/// Recursion is always full and `.`/`..` are never reported.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// How relative paths are keyed
    pub path_case: PathCase,
    /// Skip unreadable entries instead of failing the scan
    pub tolerate_inaccessible: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            path_case: PathCase::platform_default(),
            tolerate_inaccessible: true,
        }
    }
}

enum Classified {
    Directory(PathBuf),
    File(FileRecord),
    Skipped,
}

/// Walks a tree through a [`FileSystem`] and builds a [`DirectorySnapshot`]
pub struct Scanner {
    fs: Arc<dyn FileSystem>,
    options: ScanOptions,
}

impl Scanner {
    /// Create a scanner over the given filesystem
    pub fn new(fs: Arc<dyn FileSystem>, options: ScanOptions) -> Self {
        Self { fs, options }
    }

    /// Options this scanner was built with
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan `root` and return its snapshot
    pub fn scan(&self, root: &Path) -> Result<DirectorySnapshot> {
        if !self.fs.dir_exists(root) {
            if self.fs.file_exists(root) {
                return Err(SyncError::NotADirectory(root.to_path_buf()));
            }
            return Err(SyncError::NotFound(root.to_path_buf()));
        }

        let mut snapshot = DirectorySnapshot::empty(root, self.options.path_case);

        let mut paths = Vec::new();
        for entry in self.fs.walk(root) {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) if self.options.tolerate_inaccessible => {
                    warn!(root = %root.display(), error = %e, "Skipping inaccessible entry");
                    snapshot.skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let classified: Vec<Classified> = paths
            .par_iter()
            .map(|path| self.classify(root, path))
            .collect();

        for entry in classified {
            match entry {
                Classified::Directory(relative) => {
                    let key = snapshot.key_for(&relative);
                    if let Some(previous) = snapshot.subdirectories.insert(key, relative.clone()) {
                        debug!(first = %previous.display(), second = %relative.display(),
                            "Directories collide under case-insensitive comparison");
                    }
                }
                Classified::File(record) => {
                    let key = snapshot.key_for(&record.relative_path);
                    let relative = record.relative_path.clone();
                    if let Some(previous) = snapshot.files.insert(key, record) {
                        warn!(first = %previous.relative_path.display(), second = %relative.display(),
                            "Files collide under case-insensitive comparison, keeping one");
                    }
                }
                Classified::Skipped => snapshot.skipped += 1,
            }
        }

        debug!(
            root = %root.display(),
            files = snapshot.file_count(),
            dirs = snapshot.dir_count(),
            skipped = snapshot.skipped,
            "Scan complete"
        );

        Ok(snapshot)
    }

    fn classify(&self, root: &Path, path: &Path) -> Classified {
        let relative = match path.strip_prefix(root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
            _ => {
                warn!(path = %path.display(), root = %root.display(), "Entry outside of scanned root");
                return Classified::Skipped;
            }
        };

        let metadata = match self.fs.metadata(path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), root = %root.display(), error = %e,
                    "Error reading entry, leaving it out of the snapshot");
                return Classified::Skipped;
            }
        };

        match metadata.kind {
            EntryKind::Directory => Classified::Directory(relative),
            EntryKind::File => Classified::File(FileRecord {
                absolute_path: path.to_path_buf(),
                relative_path: relative,
                size: metadata.size,
                modified: metadata.modified,
            }),
            EntryKind::Other => {
                warn!(path = %relative.display(), "Skipping entry that is neither a file nor a directory");
                Classified::Skipped
            }
        }
    }
}
