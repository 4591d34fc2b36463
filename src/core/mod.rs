//! Core scheduling module
//!
//! Drives the reconciliation engine on a fixed interval with an overlap
//! guard so that cycles never run concurrently.

mod scheduler;

pub use scheduler::*;
