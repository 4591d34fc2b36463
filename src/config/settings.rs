//! Configuration settings for MirrorSync
//!
//! Defines the CLI arguments, the runtime configuration derived from them,
//! and the defaults used when mirroring.

use crate::error::{IoResultExt, Result, SyncError};
use clap::{ArgGroup, Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest interval between synchronization cycles, in seconds
pub const MIN_INTERVAL_SECS: u64 = 1;

/// Default read buffer for digest computation
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// MirrorSync - periodic one-way directory mirroring
#[derive(Parser, Debug, Clone)]
#[command(name = "mirrorsync")]
#[command(author = "MirrorSync Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Keep a destination directory an exact mirror of a source directory")]
#[command(long_about = r#"
MirrorSync periodically makes DESTINATION an exact copy of SOURCE.

Each cycle creates missing directories, copies new and changed files
(verified by content digest), then removes files and directories that no
longer exist in the source. Cycles never overlap.

Examples:
  mirrorsync /data/source /backup/source 60 /var/log/mirrorsync.log
  mirrorsync ./src ./mirror 5 ./mirror.log --hash blake3
  mirrorsync ./src ./mirror 1 ./mirror.log --once
"#)]
#[command(group(ArgGroup::new("case").args(["case_insensitive", "case_sensitive"])))]
pub struct CliArgs {
    /// Source directory to mirror from
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Destination directory to mirror into
    #[arg(value_name = "DESTINATION")]
    pub destination: PathBuf,

    /// Synchronization interval in seconds (0 becomes 1, negative values use their magnitude)
    #[arg(value_name = "INTERVAL", allow_negative_numbers = true)]
    pub interval: i64,

    /// Log file path
    #[arg(value_name = "LOG_FILE")]
    pub log_file: PathBuf,

    /// Digest algorithm used for content comparison and copy verification
    #[arg(long, value_enum, default_value = "md5", value_name = "ALGO")]
    pub hash: HashAlgorithm,

    /// Compare relative paths case-insensitively
    #[arg(long)]
    pub case_insensitive: bool,

    /// Compare relative paths case-sensitively
    #[arg(long)]
    pub case_sensitive: bool,

    /// Read buffer size for digest computation (e.g., 1M, 64K)
    #[arg(short = 'b', long, default_value = "1M", value_name = "SIZE")]
    pub buffer_size: String,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,
}

/// Hash algorithm for content comparison and copy verification
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    /// MD5 - change-detection checksum (128-bit)
    #[default]
    #[value(name = "md5")]
    Md5,
    /// XXHash3 - Ultra fast, non-cryptographic (128-bit)
    #[value(name = "xxhash3")]
    XXHash3,
    /// BLAKE3 - Fast and cryptographically secure
    #[value(name = "blake3")]
    Blake3,
    /// SHA-256 - Standard cryptographic hash
    #[value(name = "sha256")]
    Sha256,
}

impl HashAlgorithm {
    /// Get the output size in bytes
    pub fn output_size(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::XXHash3 => 16,
            Self::Blake3 => 32,
            Self::Sha256 => 32,
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::XXHash3 => "XXHash3",
            Self::Blake3 => "BLAKE3",
            Self::Sha256 => "SHA-256",
        }
    }
}

/// How relative paths are compared between the two trees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCase {
    /// Ordinal comparison
    Sensitive,
    /// Case-folded comparison
    Insensitive,
}

impl PathCase {
    /// Convention of the platform this binary was built for
    pub fn platform_default() -> Self {
        if cfg!(any(windows, target_os = "macos")) {
            Self::Insensitive
        } else {
            Self::Sensitive
        }
    }

    /// Whether comparisons fold case
    pub fn is_insensitive(&self) -> bool {
        matches!(self, Self::Insensitive)
    }
}

impl Default for PathCase {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Source root, absolute
    pub source: PathBuf,
    /// Destination root, absolute
    pub destination: PathBuf,
    /// Time between cycle starts
    pub interval: Duration,
    /// Log file path, absolute
    pub log_file: PathBuf,
    /// Digest algorithm
    pub hash: HashAlgorithm,
    /// Path comparison mode
    pub path_case: PathCase,
    /// Digest read buffer size in bytes
    pub buffer_size: usize,
    /// Run a single cycle and exit
    pub once: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            interval: Duration::from_secs(60),
            log_file: PathBuf::new(),
            hash: HashAlgorithm::Md5,
            path_case: PathCase::platform_default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            once: false,
        }
    }
}

impl SyncConfig {
    /// Create config from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let path_case = if args.case_insensitive {
            PathCase::Insensitive
        } else if args.case_sensitive {
            PathCase::Sensitive
        } else {
            PathCase::platform_default()
        };

        let buffer_size = parse_size(&args.buffer_size)
            .map_err(|e| SyncError::config(format!("Invalid buffer size: {}", e)))?;
        if buffer_size == 0 {
            return Err(SyncError::config("Buffer size must be greater than zero"));
        }

        Ok(Self {
            source: normalize_path(&args.source)?,
            destination: normalize_path(&args.destination)?,
            interval: coerce_interval(args.interval),
            log_file: normalize_path(&args.log_file)?,
            hash: args.hash,
            path_case,
            buffer_size: buffer_size as usize,
            once: args.once,
        })
    }
}

/// Interval from a signed second count: zero becomes one second,
/// negative values use their magnitude
pub fn coerce_interval(seconds: i64) -> Duration {
    Duration::from_secs(seconds.unsigned_abs().max(MIN_INTERVAL_SECS))
}

/// Absolute form of `path` without trailing separators or `.` components.
///
/// The path does not need to exist.
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
        return Err(SyncError::InvalidPath(
            "empty path used instead of a valid path".to_string(),
        ));
    }

    let absolute = std::path::absolute(path).with_path(path)?;
    Ok(absolute.components().collect())
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("GB") || size.ends_with('G') {
        (size.trim_end_matches(['G', 'B']), 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        (size.trim_end_matches(['M', 'B']), 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        (size.trim_end_matches(['K', 'B']), 1024u64)
    } else if size.ends_with('B') {
        (size.trim_end_matches('B'), 1u64)
    } else {
        (size.as_str(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    if num < 0.0 {
        return Err(format!("Negative size: {}", num_str));
    }

    Ok((num * multiplier as f64) as u64)
}
