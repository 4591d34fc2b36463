//! Content digests and copy verification
//!
//! Digests are change-detection checksums: MD5 by default, with XXHash3,
//! BLAKE3 and SHA-256 available. Files are streamed in fixed-size chunks.

use crate::config::{HashAlgorithm, DEFAULT_BUFFER_SIZE};
use crate::error::{IoResultExt, Result, SyncError};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Hash result as hex string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashResult {
    /// The hash algorithm used
    pub algorithm: HashAlgorithm,
    /// Hash value as hex string
    pub hash: String,
    /// Bytes hashed
    pub size: u64,
}

impl HashResult {
    /// Create a new hash result
    pub fn new(algorithm: HashAlgorithm, hash: String, size: u64) -> Self {
        Self { algorithm, hash, size }
    }

    /// Same algorithm and same digest; hex case is ignored
    pub fn matches(&self, other: &HashResult) -> bool {
        self.algorithm == other.algorithm && self.hash.eq_ignore_ascii_case(&other.hash)
    }
}

impl std::fmt::Display for HashResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// Unified hasher that supports all algorithms
pub enum Hasher {
    /// MD5
    Md5(md5::Md5),
    /// XXHash3 128-bit
    XXHash3(xxhash_rust::xxh3::Xxh3),
    /// BLAKE3
    Blake3(Box<blake3::Hasher>),
    /// SHA-256
    Sha256(sha2::Sha256),
}

impl Hasher {
    /// Create a new hasher for the given algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        use sha2::Digest;
        match algorithm {
            HashAlgorithm::Md5 => Self::Md5(md5::Md5::new()),
            HashAlgorithm::XXHash3 => Self::XXHash3(xxhash_rust::xxh3::Xxh3::new()),
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
        }
    }

    /// Get the algorithm this hasher uses
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Md5(_) => HashAlgorithm::Md5,
            Self::XXHash3(_) => HashAlgorithm::XXHash3,
            Self::Blake3(_) => HashAlgorithm::Blake3,
            Self::Sha256(_) => HashAlgorithm::Sha256,
        }
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        use sha2::Digest;
        match self {
            Self::Md5(h) => h.update(data),
            Self::XXHash3(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha256(h) => h.update(data),
        }
    }

    /// Finalize and get the hash as uppercase hex string
    pub fn finalize(self) -> String {
        use sha2::Digest;
        match self {
            Self::Md5(h) => hex::encode_upper(h.finalize()),
            Self::XXHash3(h) => format!("{:032X}", h.digest128()),
            Self::Blake3(h) => hex::encode_upper(h.finalize().as_bytes()),
            Self::Sha256(h) => hex::encode_upper(h.finalize()),
        }
    }
}

/// Compute hash of data in memory
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> HashResult {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    HashResult::new(algorithm, hasher.finalize(), data.len() as u64)
}

/// Compute hash of a file with the default 1 MiB buffer
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<HashResult> {
    hash_file_with_buffer(path, algorithm, DEFAULT_BUFFER_SIZE)
}

/// Compute hash of a file with custom buffer size.
///
/// The file is opened read-only, so other readers are never blocked.
pub fn hash_file_with_buffer(
    path: &Path,
    algorithm: HashAlgorithm,
    buffer_size: usize,
) -> Result<HashResult> {
    let mut file = File::open(path).with_path(path)?;
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut size = 0u64;

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SyncError::io(path, e)),
        };

        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok(HashResult::new(algorithm, hasher.finalize(), size))
}

/// Digest-based comparison of files
#[derive(Debug, Clone, Copy)]
pub struct ContentVerifier {
    algorithm: HashAlgorithm,
    buffer_size: usize,
}

impl Default for ContentVerifier {
    fn default() -> Self {
        Self::new(HashAlgorithm::Md5)
    }
}

impl ContentVerifier {
    /// Verifier using `algorithm` with a 1 MiB read buffer
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Override the read buffer size
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Algorithm in use
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Digest of one file
    pub fn digest(&self, path: &Path) -> Result<HashResult> {
        hash_file_with_buffer(path, self.algorithm, self.buffer_size)
    }

    /// Whether two files have the same digest; both are hashed in parallel
    pub fn equal(&self, first: &Path, second: &Path) -> Result<bool> {
        let (a, b) = self.digest_pair(first, second)?;
        Ok(a.matches(&b))
    }

    /// Confirm a copy landed intact.
    ///
    /// Fails with [`SyncError::IntegrityMismatch`] naming `relative` when the
    /// digests differ.
    pub fn validate_copy(&self, source: &Path, copy: &Path, relative: &Path) -> Result<()> {
        let (expected, actual) = self.digest_pair(source, copy)?;
        if expected.matches(&actual) {
            Ok(())
        } else {
            Err(SyncError::integrity_mismatch(relative, expected.hash, actual.hash))
        }
    }

    fn digest_pair(&self, first: &Path, second: &Path) -> Result<(HashResult, HashResult)> {
        let (a, b) = rayon::join(|| self.digest(first), || self.digest(second));
        Ok((a?, b?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_md5_known_vectors() {
        assert_eq!(hash_bytes(b"", HashAlgorithm::Md5).hash, "D41D8CD98F00B204E9800998ECF8427E");
        assert_eq!(
            hash_bytes(b"The quick brown fox jumps over the lazy dog", HashAlgorithm::Md5).hash,
            "9E107D9D372BB6826BD81D3542A419D6"
        );
    }

    #[test]
    fn test_hash_algorithms() {
        let data = b"Hello, World!";

        for algorithm in [
            HashAlgorithm::Md5,
            HashAlgorithm::XXHash3,
            HashAlgorithm::Blake3,
            HashAlgorithm::Sha256,
        ] {
            let hash = hash_bytes(data, algorithm);
            assert_eq!(hash.hash.len(), algorithm.output_size() * 2);
            assert_eq!(hash.size, data.len() as u64);
            assert_eq!(hash, hash_bytes(data, algorithm));
        }
    }

    #[test]
    fn test_small_buffer_streams_whole_file() {
        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let path = create_test_file(dir.path(), "data.bin", &content);

        let streamed = hash_file_with_buffer(&path, HashAlgorithm::Md5, 7).unwrap();
        let in_memory = hash_bytes(&content, HashAlgorithm::Md5);

        assert_eq!(streamed.hash, in_memory.hash);
        assert_eq!(streamed.size, content.len() as u64);
    }

    #[test]
    fn test_matches_ignores_hex_case() {
        let upper = HashResult::new(HashAlgorithm::Md5, "ABCDEF".into(), 3);
        let lower = HashResult::new(HashAlgorithm::Md5, "abcdef".into(), 3);
        let other_algo = HashResult::new(HashAlgorithm::Sha256, "abcdef".into(), 3);

        assert!(upper.matches(&lower));
        assert!(!upper.matches(&other_algo));
    }

    #[test]
    fn test_equal_files() {
        let dir = TempDir::new().unwrap();
        let first = create_test_file(dir.path(), "a.bin", b"Identical content");
        let second = create_test_file(dir.path(), "b.bin", b"Identical content");

        let verifier = ContentVerifier::default();
        assert!(verifier.equal(&first, &second).unwrap());

        std::fs::write(&second, b"Different content").unwrap();
        assert!(!verifier.equal(&first, &second).unwrap());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = ContentVerifier::default().digest(&dir.path().join("missing"));
        assert!(matches!(result, Err(SyncError::Io { .. })));
    }

    #[test]
    fn test_validate_copy_mismatch() {
        let dir = TempDir::new().unwrap();
        let source = create_test_file(dir.path(), "source.txt", b"original");
        let copy = create_test_file(dir.path(), "copy.txt", b"corrupted");

        let verifier = ContentVerifier::new(HashAlgorithm::Blake3);
        let err = verifier
            .validate_copy(&source, &copy, Path::new("docs/source.txt"))
            .unwrap_err();

        match err {
            SyncError::IntegrityMismatch { path, expected, actual } => {
                assert_eq!(path, PathBuf::from("docs/source.txt"));
                assert_ne!(expected, actual);
            }
            other => panic!("unexpected error: {other}"),
        }

        std::fs::write(&copy, b"original").unwrap();
        verifier.validate_copy(&source, &copy, Path::new("docs/source.txt")).unwrap();
    }
}
