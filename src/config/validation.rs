//! Startup validation of the configured directories and log file
//!
//! Everything here runs once, before the scheduler starts. Any failure is
//! fatal for the process.

use crate::config::{PathCase, SyncConfig};
use crate::error::{IoResultExt, Result, SyncError};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

const MAX_PROBE_ATTEMPTS: u32 = 10;

/// Validate source and destination before the first cycle.
///
/// The destination is created when missing.
pub fn validate(config: &SyncConfig) -> Result<()> {
    let source = &config.source;
    let destination = &config.destination;

    if directories_are_nested(source, destination, config.path_case) {
        return Err(SyncError::NestedDirectories {
            source_dir: source.clone(),
            destination: destination.clone(),
        });
    }

    ensure_readable_directory(source)?;

    if !destination.is_dir() {
        warn!(path = %destination.display(), "Destination directory doesn't exist, creating it");
        fs::create_dir_all(destination).with_path(destination)?;
    }

    ensure_readable_directory(destination)?;
    ensure_writable_directory(destination)?;

    Ok(())
}

/// True when the two paths are identical or one lies inside the other
pub fn directories_are_nested(first: &Path, second: &Path, case: PathCase) -> bool {
    let (first, second) = if case.is_insensitive() {
        (fold_case(first), fold_case(second))
    } else {
        (first.to_path_buf(), second.to_path_buf())
    };

    first == second || first.starts_with(&second) || second.starts_with(&first)
}

fn fold_case(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_lowercase())
}

fn ensure_readable_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        error!(path = %path.display(), "Directory doesn't exist");
        return Err(SyncError::NotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        error!(path = %path.display(), "Path is not a directory");
        return Err(SyncError::NotADirectory(path.to_path_buf()));
    }

    match fs::read_dir(path) {
        Ok(mut entries) => {
            // Pull one entry so unreadable listings surface here
            if let Some(Err(e)) = entries.next() {
                error!(path = %path.display(), error = %e, "Directory is not readable");
                return Err(SyncError::io(path, e));
            }
            info!(path = %path.display(), "Directory accessible for reading");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            error!(path = %path.display(), "Permission for reading missing");
            Err(SyncError::PermissionDenied(path.to_path_buf()))
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Inaccessible directory");
            Err(SyncError::io(path, e))
        }
    }
}

fn ensure_writable_directory(path: &Path) -> Result<()> {
    let probe = (0..MAX_PROBE_ATTEMPTS)
        .map(|attempt| path.join(probe_file_name(attempt)))
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| SyncError::config("Could not pick an unused probe file name"))?;

    let created = OpenOptions::new().write(true).create_new(true).open(&probe);
    match created {
        Ok(file) => drop(file),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            error!(path = %path.display(), "Not authorized to write in directory");
            return Err(SyncError::PermissionDenied(path.to_path_buf()));
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Can't write in directory");
            return Err(SyncError::io(&probe, e));
        }
    }

    fs::remove_file(&probe).with_path(&probe)?;
    info!(path = %path.display(), "Directory write/delete permission OK");
    Ok(())
}

fn probe_file_name(attempt: u32) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    format!(".mirrorsync-probe-{}-{}-{}", std::process::id(), nanos, attempt)
}

/// Make sure the log file can be created or appended to.
///
/// Creates the parent directory when needed.
pub fn prepare_log_file(path: &Path) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| SyncError::InvalidPath(format!("Invalid log file path: {}", path.display())))?;

    if path.is_dir() {
        return Err(SyncError::InvalidPath(format!(
            "Log file path is a directory: {}",
            path.display()
        )));
    }

    fs::create_dir_all(parent).with_path(parent)?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_path(path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_for(source: &Path, destination: &Path) -> SyncConfig {
        SyncConfig {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_nested_detection() {
        let case = PathCase::Sensitive;
        assert!(directories_are_nested(Path::new("/a/b"), Path::new("/a/b"), case));
        assert!(directories_are_nested(Path::new("/a/b"), Path::new("/a/b/c"), case));
        assert!(directories_are_nested(Path::new("/a/b/c"), Path::new("/a/b"), case));
        assert!(!directories_are_nested(Path::new("/a/b"), Path::new("/a/bc"), case));
        assert!(!directories_are_nested(Path::new("/a/b"), Path::new("/a/B"), case));
    }

    #[test]
    fn test_nested_detection_case_insensitive() {
        let case = PathCase::Insensitive;
        assert!(directories_are_nested(Path::new("/a/b"), Path::new("/A/B"), case));
        assert!(directories_are_nested(Path::new("/Data"), Path::new("/data/mirror"), case));
        assert!(!directories_are_nested(Path::new("/data"), Path::new("/database"), case));
    }

    #[test]
    fn test_validate_creates_missing_destination() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("source");
        let destination = root.path().join("mirror/deep");
        fs::create_dir(&source).unwrap();

        validate(&config_for(&source, &destination)).unwrap();

        assert!(destination.is_dir());
        // Probe file must not be left behind
        assert_eq!(fs::read_dir(&destination).unwrap().count(), 0);
    }

    #[test]
    fn test_validate_rejects_missing_source() {
        let root = TempDir::new().unwrap();
        let result = validate(&config_for(&root.path().join("nope"), &root.path().join("dst")));
        assert!(matches!(result, Err(SyncError::NotFound(_))));
    }

    #[test]
    fn test_validate_rejects_file_as_source() {
        let root = TempDir::new().unwrap();
        let file = root.path().join("file.txt");
        fs::write(&file, b"x").unwrap();
        let result = validate(&config_for(&file, &root.path().join("dst")));
        assert!(matches!(result, Err(SyncError::NotADirectory(_))));
    }

    #[test]
    fn test_validate_rejects_nested() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("source");
        fs::create_dir(&source).unwrap();
        let result = validate(&config_for(&source, &source.join("inner")));
        assert!(matches!(result, Err(SyncError::NestedDirectories { .. })));
    }

    #[test]
    fn test_prepare_log_file_creates_parent() {
        let root = TempDir::new().unwrap();
        let log = root.path().join("logs/nested/sync.log");
        prepare_log_file(&log).unwrap();
        assert!(log.is_file());
    }

    #[test]
    fn test_prepare_log_file_rejects_directory() {
        let root = TempDir::new().unwrap();
        assert!(prepare_log_file(root.path()).is_err());
    }
}
