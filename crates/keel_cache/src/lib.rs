//! Incremental-build cache: source fingerprinting and the filesystem probe.
//!
//! There is no stored cache index. A compiled output named after its
//! source fingerprint IS the cache record: if `<sourceHash>.js` exists
//! under a target directory, the source it fingerprints has already been
//! compiled for that target. All operations here are fail-safe — any I/O
//! problem resolves as a cache miss, never a hard failure.

#![warn(missing_docs)]

mod error;
mod fingerprint;
mod probe;

pub use error::CacheError;
pub use fingerprint::fingerprint;
pub use probe::{cached_name, probe};
