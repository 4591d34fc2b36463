//! File system module
//!
//! Provides the filesystem capability used by the mirroring core and the
//! scanner that turns a directory tree into a snapshot.

mod operations;
mod scanner;

#[cfg(test)]
pub(crate) mod testing;

pub use operations::*;
pub use scanner::*;
