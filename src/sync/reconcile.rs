//! One-way reconciliation of a destination tree against a source tree
//!
//! A cycle scans both trees and then runs four phases in strict order:
//!
//! 1. create source directories missing from the destination (shallowest first)
//! 2. copy files that are missing or differ, verifying every copy by digest
//! 3. delete destination files absent from the source
//! 4. delete destination directories absent from the source (deepest first)
//!
//! Every item is handled in isolation. A failing item is logged and recorded
//! in the [`CycleReport`]; it never stops the cycle. Only failing to scan one
//! of the roots aborts the cycle.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::fs::{DirectorySnapshot, EntryKind, FileRecord, FileSystem, LocalFileSystem, PathKey, ScanOptions, Scanner};
use crate::hash::ContentVerifier;
use crate::sync::{CopyReason, CycleReport, ItemOutcome, Phase};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Mirrors one source tree onto one destination tree
pub struct ReconciliationEngine {
    source: PathBuf,
    destination: PathBuf,
    fs: Arc<dyn FileSystem>,
    scanner: Scanner,
    verifier: ContentVerifier,
}

impl ReconciliationEngine {
    /// Create an engine over an arbitrary filesystem
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        scan_options: ScanOptions,
        verifier: ContentVerifier,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            scanner: Scanner::new(Arc::clone(&fs), scan_options),
            fs,
            verifier,
        }
    }

    /// Engine over the local disk, configured from runtime settings
    pub fn from_config(config: &SyncConfig) -> Self {
        let scan_options = ScanOptions {
            path_case: config.path_case,
            ..Default::default()
        };
        let verifier = ContentVerifier::new(config.hash).with_buffer_size(config.buffer_size);

        Self::new(
            &config.source,
            &config.destination,
            Arc::new(LocalFileSystem::new()),
            scan_options,
            verifier,
        )
    }

    /// Source root
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Destination root
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Run one full cycle.
    ///
    /// Returns an error only when one of the roots cannot be scanned.
    pub fn run_once(&self) -> Result<CycleReport> {
        let started = Instant::now();
        info!(
            source = %self.source.display(),
            destination = %self.destination.display(),
            "Starting synchronization cycle"
        );

        let source = self.scanner.scan(&self.source)?;
        let destination = self.scanner.scan(&self.destination)?;

        let mut report = CycleReport::new();
        report.scan_skipped = (source.skipped() + destination.skipped()) as u64;

        self.create_directories(&source, &destination, &mut report);
        self.copy_or_update_files(&source, &destination, &mut report);
        self.delete_extra_files(&source, &destination, &mut report);
        self.delete_extra_directories(&source, &destination, &mut report);

        report.duration = started.elapsed();
        report.log_summary();
        Ok(report)
    }

    fn create_directories(
        &self,
        source: &DirectorySnapshot,
        destination: &DirectorySnapshot,
        report: &mut CycleReport,
    ) {
        for (key, relative) in source.dirs_shallowest_first() {
            let outcome = self.create_directory(key, relative, source, destination);
            match &outcome {
                ItemOutcome::CreatedDir => info!(path = %relative.display(), "Created directory"),
                ItemOutcome::Failed(e) => {
                    error!(path = %relative.display(), error = %e, "Failed creating directory")
                }
                _ => {}
            }
            report.record(relative, Phase::CreateDirectories, outcome);
        }
    }

    fn create_directory(
        &self,
        key: &PathKey,
        relative: &Path,
        source: &DirectorySnapshot,
        destination: &DirectorySnapshot,
    ) -> ItemOutcome {
        let target = destination.resolve(relative);
        if let Err(e) = self.remove_link_in_place(&target, relative) {
            return ItemOutcome::Failed(e);
        }
        if self.fs.dir_exists(&target) {
            return ItemOutcome::Skipped;
        }

        // A destination file may occupy the place of a source directory
        let blocking = destination
            .file(key)
            .map(|record| record.absolute_path.clone())
            .unwrap_or_else(|| target.clone());
        if !source.contains_file(key) && self.fs.file_exists(&blocking) {
            if let Err(e) = self.remove_file(&blocking) {
                return ItemOutcome::Failed(e);
            }
            info!(path = %relative.display(), "Removed file standing in place of a directory");
        }

        match self.fs.create_dir(&target) {
            Ok(()) => ItemOutcome::CreatedDir,
            Err(e) => ItemOutcome::Failed(e),
        }
    }

    fn copy_or_update_files(
        &self,
        source: &DirectorySnapshot,
        destination: &DirectorySnapshot,
        report: &mut CycleReport,
    ) {
        for (key, record) in source.files() {
            let outcome = self.process_file(key, record, source, destination);
            let relative = &record.relative_path;
            match &outcome {
                ItemOutcome::CopiedFile { reason, bytes } => info!(
                    path = %relative.display(),
                    reason = %reason,
                    bytes = *bytes,
                    "Copied file (digest OK)"
                ),
                ItemOutcome::Failed(e) => {
                    error!(path = %relative.display(), error = %e, "Failed processing file")
                }
                _ => {}
            }
            report.record(relative, Phase::CopyFiles, outcome);
        }
    }

    fn process_file(
        &self,
        key: &PathKey,
        record: &FileRecord,
        source: &DirectorySnapshot,
        destination: &DirectorySnapshot,
    ) -> ItemOutcome {
        let existing = destination.file(key);

        let reason = match self.copy_reason(record, existing) {
            Ok(Some(reason)) => reason,
            Ok(None) => return ItemOutcome::Skipped,
            Err(e) => return ItemOutcome::Failed(e),
        };

        let target = match existing {
            Some(existing) => existing.absolute_path.clone(),
            None => destination.resolve(&record.relative_path),
        };

        if existing.is_none() {
            if let Err(e) = self.remove_link_in_place(&target, &record.relative_path) {
                return ItemOutcome::Failed(e);
            }
        }

        // A destination directory may occupy the place of a source file
        if existing.is_none()
            && destination.contains_dir(key)
            && !source.contains_dir(key)
            && self.fs.dir_exists(&target)
        {
            if let Err(e) = self.fs.remove_dir_all(&target) {
                return ItemOutcome::Failed(e);
            }
            info!(path = %record.relative_path.display(), "Removed directory standing in place of a file");
        }

        match self.copy_and_verify(record, &target) {
            Ok(bytes) => ItemOutcome::CopiedFile { reason, bytes },
            Err(e) => ItemOutcome::Failed(e),
        }
    }

    /// Decide whether `record` must be copied over `existing`
    fn copy_reason(
        &self,
        record: &FileRecord,
        existing: Option<&FileRecord>,
    ) -> Result<Option<CopyReason>> {
        let Some(existing) = existing else {
            return Ok(Some(CopyReason::Missing));
        };

        if !record.metadata_matches(existing) {
            return Ok(Some(CopyReason::MetadataDiff));
        }

        if self.verifier.equal(&record.absolute_path, &existing.absolute_path)? {
            return Ok(None);
        }

        warn!(
            path = %record.relative_path.display(),
            algorithm = self.verifier.algorithm().name(),
            "Metadata equal but content differs"
        );
        Ok(Some(CopyReason::ContentDiff))
    }

    /// Overwrite `target`, carry over the modification time, then verify
    fn copy_and_verify(&self, record: &FileRecord, target: &Path) -> Result<u64> {
        let bytes = self.fs.copy_file(&record.absolute_path, target)?;
        self.fs.set_modified(target, record.modified)?;
        self.verifier
            .validate_copy(&record.absolute_path, target, &record.relative_path)?;
        Ok(bytes)
    }

    fn delete_extra_files(
        &self,
        source: &DirectorySnapshot,
        destination: &DirectorySnapshot,
        report: &mut CycleReport,
    ) {
        for (key, record) in destination.files() {
            if source.contains_file(key) {
                continue;
            }

            let relative = &record.relative_path;
            let outcome = if !self.fs.file_exists(&record.absolute_path) {
                ItemOutcome::Skipped
            } else {
                match self.remove_file(&record.absolute_path) {
                    Ok(()) => {
                        info!(path = %relative.display(), "Deleted extra file");
                        ItemOutcome::DeletedFile
                    }
                    Err(e) => {
                        error!(path = %relative.display(), error = %e, "Failed to delete extra file");
                        ItemOutcome::Failed(e)
                    }
                }
            };
            report.record(relative, Phase::DeleteFiles, outcome);
        }
    }

    fn delete_extra_directories(
        &self,
        source: &DirectorySnapshot,
        destination: &DirectorySnapshot,
        report: &mut CycleReport,
    ) {
        for (key, relative) in destination.dirs_deepest_first() {
            if source.contains_dir(key) {
                continue;
            }

            let target = destination.absolute(relative);
            let outcome = if !self.fs.dir_exists(&target) {
                ItemOutcome::Skipped
            } else {
                match self.fs.remove_dir_all(&target) {
                    Ok(()) => {
                        info!(path = %relative.display(), "Deleted extra directory");
                        ItemOutcome::DeletedDir
                    }
                    Err(e) => {
                        error!(path = %relative.display(), error = %e, "Failed to delete extra directory");
                        ItemOutcome::Failed(e)
                    }
                }
            };
            report.record(relative, Phase::DeleteDirectories, outcome);
        }
    }

    /// Unlink a symlink or special entry sitting where a source entry goes.
    ///
    /// The scan never records such entries, so without this a copy would
    /// write through the link.
    fn remove_link_in_place(&self, target: &Path, relative: &Path) -> Result<()> {
        let Ok(metadata) = self.fs.metadata(target) else {
            return Ok(());
        };
        if metadata.kind != EntryKind::Other {
            return Ok(());
        }

        self.fs.remove_file(target)?;
        info!(path = %relative.display(), "Removed link standing in place of a source entry");
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.fs.clear_readonly(path)?;
        self.fs.remove_file(path)
    }
}
