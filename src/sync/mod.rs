//! One-way mirroring module
//!
//! Provides the reconciliation engine:
//! - Ordered four-phase cycle (create dirs, copy files, delete files, delete dirs)
//! - Metadata then digest based change detection
//! - Post-copy verification
//! - Per-item outcome reporting

mod outcome;
mod reconcile;

pub use outcome::*;
pub use reconcile::*;
