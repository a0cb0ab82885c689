//! Shared foundational types used across the Keel build pipeline.
//!
//! This crate provides core types including content and source hashes,
//! compile targets, output references, and the per-run file map.

#![warn(missing_docs)]

pub mod file_map;
pub mod hash;
pub mod target;

pub use file_map::{FileKey, FileMap, OutputRef};
pub use hash::{ContentHash, SourceHash};
pub use target::{Target, Variant};
