//! # MirrorSync - Periodic One-Way Directory Mirroring
//!
//! MirrorSync keeps a destination directory an exact replica of a source
//! directory. On a fixed interval it scans both trees, creates missing
//! directories, copies new and changed files, and removes everything the
//! source no longer has.
//!
//! ## Features
//!
//! - **Ordered Reconciliation**: directories first, then files, then deletions
//! - **Content Verification**: MD5 by default, XXHash3, BLAKE3 or SHA-256 on request
//! - **Hidden Change Detection**: files with equal size and mtime are compared by digest
//! - **Failure Isolation**: one bad file never stops a cycle
//! - **Overlap Guard**: a cycle never starts while another is running
//! - **Case Modes**: ordinal or case-insensitive path comparison
//!
//! ## Quick Start
//!
//! ```no_run
//! use mirrorsync::config::SyncConfig;
//! use mirrorsync::sync::ReconciliationEngine;
//! use std::path::PathBuf;
//!
//! let config = SyncConfig {
//!     source: PathBuf::from("/source"),
//!     destination: PathBuf::from("/destination"),
//!     ..Default::default()
//! };
//!
//! let engine = ReconciliationEngine::from_config(&config);
//! let report = engine.run_once().unwrap();
//!
//! println!("Copied {} files ({} bytes)", report.files_copied, report.bytes_copied);
//! ```
//!
//! ## Periodic Mirroring
//!
//! ```no_run
//! use mirrorsync::core::CycleScheduler;
//! use mirrorsync::sync::ReconciliationEngine;
//! use mirrorsync::config::SyncConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = SyncConfig::default();
//! let engine = Arc::new(ReconciliationEngine::from_config(&config));
//!
//! let mut scheduler = CycleScheduler::new(engine, Duration::from_secs(60));
//! scheduler.start().unwrap();
//! // ...
//! scheduler.stop();
//! scheduler.wait_for_in_flight();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod fs;
pub mod hash;
pub mod logging;
pub mod sync;

// Re-export commonly used types
pub use config::{HashAlgorithm, PathCase, SyncConfig};
pub use core::{CycleOutcome, CycleScheduler};
pub use error::{Result, SyncError};
pub use sync::{CycleReport, ReconciliationEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use mirrorsync::prelude::*;
    //! ```

    pub use crate::config::{HashAlgorithm, PathCase, SyncConfig};
    pub use crate::core::{CycleOutcome, CycleRunner, CycleScheduler};
    pub use crate::error::{Result, SyncError};
    pub use crate::fs::{DirectorySnapshot, FileSystem, LocalFileSystem, Scanner, ScanOptions};
    pub use crate::hash::{hash_file, ContentVerifier, HashResult};
    pub use crate::sync::{CycleReport, ItemOutcome, ReconciliationEngine};
}
