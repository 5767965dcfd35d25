//! SHA-1 integrity checks for downloaded artifacts

use sha1::{Digest, Sha1};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Read buffer size used when hashing a file from disk
const FILE_HASH_BUFFER: usize = 64 * 1024;

/// Incremental SHA-1 over a byte stream
///
/// Owned by a single transfer; consumed by [`ChecksumVerifier::finalize_hex`].
#[derive(Clone, Default)]
pub struct ChecksumVerifier {
    hasher: Sha1,
    bytes: u64,
}

impl ChecksumVerifier {
    /// Start a new digest
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Number of bytes fed so far
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes
    }

    /// Finish and return the lowercase hex digest
    pub fn finalize_hex(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

/// Compare two hex digests, ignoring case and surrounding whitespace
#[must_use]
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

/// SHA-1 of a file's content, lowercase hex
pub async fn sha1_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut verifier = ChecksumVerifier::new();
    let mut buf = vec![0u8; FILE_HASH_BUFFER];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        verifier.update(&buf[..n]);
    }
    Ok(verifier.finalize_hex())
}
