//! Error types for MirrorSync
//!
//! Defines the error type shared by the scanner, verifier, reconciliation
//! engine and scheduler, plus helpers for attaching path context.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for MirrorSync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path the operation was working on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File or directory not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Source and destination are the same or one contains the other
    #[error("Source and destination are nested or identical: '{source_dir}' and '{destination}'")]
    NestedDirectories {
        /// Source directory
        source_dir: PathBuf,
        /// Destination directory
        destination: PathBuf,
    },

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Digest of a copied file does not match its source
    #[error("Digest mismatch after copy for '{path}': expected {expected}, got {actual}")]
    IntegrityMismatch {
        /// Relative path of the copied file
        path: PathBuf,
        /// Digest of the source file
        expected: String,
        /// Digest of the destination file
        actual: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Scheduler lifecycle error
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl SyncError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an integrity mismatch error
    pub fn integrity_mismatch(
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::IntegrityMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Check if this error is a permission issue
    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::PermissionDenied(_) => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. }
            | Self::NotFound(path)
            | Self::NotADirectory(path)
            | Self::PermissionDenied(path)
            | Self::IntegrityMismatch { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for MirrorSync operations
pub type Result<T> = std::result::Result<T, SyncError>;

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<walkdir::Error> for SyncError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
        match err.into_io_error() {
            Some(source) => SyncError::Io { path, source },
            None => SyncError::InvalidPath(format!(
                "filesystem loop detected at '{}'",
                path.display()
            )),
        }
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| SyncError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SyncError::io("/test/path", io_err);
        assert_eq!(err.path(), Some(&PathBuf::from("/test/path")));
    }

    #[test]
    fn test_permission_detection() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(SyncError::io("/locked", io_err).is_permission_error());
        assert!(SyncError::PermissionDenied(PathBuf::from("/locked")).is_permission_error());
        assert!(!SyncError::NotFound(PathBuf::from("/missing")).is_permission_error());
    }

    #[test]
    fn test_with_path_attaches_context() {
        let result: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let err = result.with_path("/some/file").unwrap_err();
        assert!(err.to_string().contains("/some/file"));
    }

    #[test]
    fn test_integrity_mismatch_message() {
        let err = SyncError::integrity_mismatch("a.txt", "abc", "def");
        let message = err.to_string();
        assert!(message.contains("a.txt"));
        assert!(message.contains("abc"));
        assert!(message.contains("def"));
    }
}
