//! Configuration module for MirrorSync
//!
//! Provides CLI arguments, runtime settings and the startup checks
//! performed before the first cycle.

mod settings;
pub mod validation;

pub use settings::*;
pub use validation::{prepare_log_file, validate};
