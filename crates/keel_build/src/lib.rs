//! The Keel production build pipeline.
//!
//! Compiles a tree of source modules into two parallel artifact sets — a
//! server variant retaining data-loading code and a client variant with
//! it stripped — under content-addressed filenames, then derives route
//! tables and a manifest from the result.
//!
//! The pipeline stages, in orchestration order:
//!
//! 1. [`assets`] — static asset copy and gzip companions
//! 2. [`file_compiler`] — per-file dual-target compilation with caching,
//!    or whole-batch split compilation
//! 3. [`stabilize`] — fixed-point renaming of split bundler output
//! 4. [`hooks`] — configured build hooks
//! 5. [`rewrite`] — cross-file import path fixups for non-split builds
//! 6. [`routes`] — logical route → artifact JSON tables
//! 7. [`manifest`] — the single per-run build record

#![warn(missing_docs)]

pub mod assets;
pub mod error;
pub mod file_compiler;
pub mod hooks;
mod imports;
pub mod manifest;
pub mod orchestrator;
pub mod rewrite;
pub mod routes;
pub mod stabilize;

pub use error::{BuildError, BuildWarning};
pub use file_compiler::FileCompiler;
pub use manifest::Manifest;
pub use orchestrator::{BuildOptions, BuildOrchestrator, BuildReport};
pub use rewrite::ImportPathRewriter;
pub use routes::{RouteMapGenerator, RouteMaps};
pub use stabilize::{ChunkRecord, ChunkStabilizer, StabilizeOutcome};
