//! Cheap source-change fingerprinting.

use std::path::Path;
use std::time::UNIX_EPOCH;

use keel_common::SourceHash;

use crate::error::CacheError;

/// Computes the source fingerprint of a file from its byte length and
/// modification time.
///
/// This never reads the file's bytes, which is the point: on the cache
/// fast path thousands of sources are fingerprinted per run. The tradeoff
/// is documented on [`SourceHash`] — an edit preserving both length and
/// mtime goes undetected.
pub fn fingerprint(path: &Path) -> Result<SourceHash, CacheError> {
    let meta = std::fs::metadata(path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mtime = meta.modified().map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mtime_ms = mtime
        .duration_since(UNIX_EPOCH)
        .map_err(|_| CacheError::Metadata {
            path: path.to_path_buf(),
            reason: "modification time precedes the Unix epoch".to_string(),
        })?
        .as_millis() as u64;

    Ok(SourceHash::of(meta.len(), mtime_ms))
}
