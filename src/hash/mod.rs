//! Hash computation and integrity verification module
//!
//! Provides streaming content digests and the verifier used to detect
//! content changes and confirm copies.

mod integrity;

pub use integrity::*;
