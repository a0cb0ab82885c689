//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while fingerprinting or probing.
///
/// Callers always resolve these as cache misses; a miss only costs time.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while stat-ing a source file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The filesystem reported metadata the fingerprint cannot use,
    /// e.g. a modification time before the Unix epoch.
    #[error("unusable metadata for {path}: {reason}")]
    Metadata {
        /// The path that caused the error.
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },
}
