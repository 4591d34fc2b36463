//! Per-item outcomes and the per-cycle report built from them

use crate::error::SyncError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Why a file was copied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyReason {
    /// Not present in the destination
    Missing,
    /// Size or modification time differ
    MetadataDiff,
    /// Metadata equal but digests differ
    ContentDiff,
}

impl fmt::Display for CopyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing",
            Self::MetadataDiff => "metadata-diff",
            Self::ContentDiff => "content-diff",
        })
    }
}

/// Phase of a cycle an item was handled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Creating source directories in the destination
    CreateDirectories,
    /// Copying new and changed files
    CopyFiles,
    /// Removing destination-only files
    DeleteFiles,
    /// Removing destination-only directories
    DeleteDirectories,
}

/// What happened to one relative path
#[derive(Debug)]
pub enum ItemOutcome {
    /// Directory created in the destination
    CreatedDir,
    /// File copied and verified
    CopiedFile {
        /// Why the copy was needed
        reason: CopyReason,
        /// Bytes written
        bytes: u64,
    },
    /// Destination-only file removed
    DeletedFile,
    /// Destination-only directory tree removed
    DeletedDir,
    /// Nothing to do
    Skipped,
    /// The item was abandoned
    Failed(SyncError),
}

impl ItemOutcome {
    /// Whether this outcome changed the destination
    pub fn is_action(&self) -> bool {
        !matches!(self, Self::Skipped | Self::Failed(_))
    }
}

/// Outcome of one item together with where it happened
#[derive(Debug)]
pub struct ItemReport {
    /// Relative path of the item
    pub path: PathBuf,
    /// Phase that produced the outcome
    pub phase: Phase,
    /// The outcome
    pub outcome: ItemOutcome,
}

/// Summary of a single synchronization cycle
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Directories created
    pub dirs_created: u64,
    /// Files copied
    pub files_copied: u64,
    /// Bytes copied
    pub bytes_copied: u64,
    /// Files copied because metadata matched but content did not
    pub content_mismatches: u64,
    /// Destination-only files deleted
    pub files_deleted: u64,
    /// Destination-only directories deleted
    pub dirs_deleted: u64,
    /// Items that needed no action
    pub skipped: u64,
    /// Entries the scans could not include
    pub scan_skipped: u64,
    /// Every item in the order it was handled
    pub items: Vec<ItemReport>,
    /// Time spent on the cycle
    pub duration: Duration,
}

impl CycleReport {
    /// Empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an item and update the counters
    pub fn record(&mut self, path: impl Into<PathBuf>, phase: Phase, outcome: ItemOutcome) {
        match &outcome {
            ItemOutcome::CreatedDir => self.dirs_created += 1,
            ItemOutcome::CopiedFile { reason, bytes } => {
                self.files_copied += 1;
                self.bytes_copied += bytes;
                if *reason == CopyReason::ContentDiff {
                    self.content_mismatches += 1;
                }
            }
            ItemOutcome::DeletedFile => self.files_deleted += 1,
            ItemOutcome::DeletedDir => self.dirs_deleted += 1,
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Failed(_) => {}
        }

        self.items.push(ItemReport {
            path: path.into(),
            phase,
            outcome,
        });
    }

    /// Number of changes applied to the destination
    pub fn action_count(&self) -> u64 {
        self.dirs_created + self.files_copied + self.files_deleted + self.dirs_deleted
    }

    /// Items that failed, with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &SyncError)> {
        self.items.iter().filter_map(|item| match &item.outcome {
            ItemOutcome::Failed(e) => Some((&item.path, e)),
            _ => None,
        })
    }

    /// Number of failed items
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// No item failed
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Look up the outcome recorded for a relative path in a phase
    pub fn outcome_for(&self, path: impl Into<PathBuf>, phase: Phase) -> Option<&ItemOutcome> {
        let path = path.into();
        self.items
            .iter()
            .find(|item| item.phase == phase && item.path == path)
            .map(|item| &item.outcome)
    }

    /// Log the cycle summary
    pub fn log_summary(&self) {
        info!(
            dirs_created = self.dirs_created,
            files_copied = self.files_copied,
            bytes_copied = %humansize::format_size(self.bytes_copied, humansize::BINARY),
            content_mismatches = self.content_mismatches,
            files_deleted = self.files_deleted,
            dirs_deleted = self.dirs_deleted,
            skipped = self.skipped,
            failed = self.failure_count(),
            duration = ?self.duration,
            "Cycle summary"
        );
    }
}
