//! Content hashing for artifact naming and cache invalidation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hex characters in a [`ContentHash`].
const CONTENT_HASH_LEN: usize = 15;

/// Number of hex characters in a [`SourceHash`].
const SOURCE_HASH_LEN: usize = 10;

/// Truncated hex encoding of a SHA-256 digest.
fn hex_prefix(digest: &[u8], chars: usize) -> String {
    let mut out = String::with_capacity(chars);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
        if out.len() >= chars {
            break;
        }
    }
    out.truncate(chars);
    out
}

/// A 15-hex-character digest of final output bytes.
///
/// Used as the filename stem for entry artifacts: two outputs with the
/// same bytes get the same filename, and any byte change produces a new
/// filename. This is what makes emitted entries safe to cache forever.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Computes the content hash of a byte slice (truncated SHA-256).
    pub fn of(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(hex_prefix(&digest, CONTENT_HASH_LEN))
    }

    /// Returns the hex digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.0)
    }
}

/// A 10-hex-character fingerprint of a source file's byte length and
/// modification time.
///
/// A cheap, lossy change detector used only to decide whether a source
/// needs recompiling. It is NOT a content hash: an edit that preserves
/// both the byte length and the mtime is invisible to it. That gap is
/// accepted by design in exchange for never reading source bytes on the
/// cache fast path.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceHash(String);

impl SourceHash {
    /// Computes the fingerprint from a byte length and mtime in milliseconds.
    pub fn of(byte_len: u64, mtime_ms: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(byte_len.to_le_bytes());
        hasher.update(mtime_ms.to_le_bytes());
        let digest = hasher.finalize();
        Self(hex_prefix(&digest, SOURCE_HASH_LEN))
    }

    /// Returns the hex digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SourceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceHash({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_deterministic() {
        let a = ContentHash::of(b"export default 1;");
        let b = ContentHash::of(b"export default 1;");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_single_byte_change() {
        let a = ContentHash::of(b"export default 1;");
        let b = ContentHash::of(b"export default 2;");
        assert_ne!(a, b);
    }

    #[test]
    fn content_hash_is_15_hex() {
        let h = ContentHash::of(b"anything");
        assert_eq!(h.as_str().len(), 15);
        assert!(h.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn source_hash_is_10_hex() {
        let h = SourceHash::of(1024, 1_700_000_000_000);
        assert_eq!(h.as_str().len(), 10);
        assert!(h.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn source_hash_changes_with_length() {
        let a = SourceHash::of(1024, 1_700_000_000_000);
        let b = SourceHash::of(1025, 1_700_000_000_000);
        assert_ne!(a, b);
    }

    #[test]
    fn source_hash_changes_with_mtime() {
        let a = SourceHash::of(1024, 1_700_000_000_000);
        let b = SourceHash::of(1024, 1_700_000_000_001);
        assert_ne!(a, b);
    }

    #[test]
    fn serde_roundtrip() {
        let h = ContentHash::of(b"serde test");
        let json = serde_json::to_string(&h).unwrap();
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
