//! The bundler contract consumed by the Keel build pipeline.
//!
//! The pipeline never parses or transforms source text itself; it hands
//! entry files to an implementation of [`Compiler`] and post-processes
//! whatever comes back. A real deployment plugs in an actual bundler;
//! this crate ships [`PassthroughCompiler`] as a minimal stand-in and
//! [`FnCompiler`] as a closure adapter for tests.

#![warn(missing_docs)]

mod error;
mod passthrough;

pub use error::CompileError;
pub use passthrough::PassthroughCompiler;

use std::collections::BTreeMap;
use std::path::PathBuf;

/// A single request handed to the compiler.
///
/// Output paths in the result are relative to `root`.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// Entry source files to compile (absolute paths).
    pub entries: Vec<PathBuf>,
    /// Root directory that output paths are expressed relative to.
    pub root: PathBuf,
    /// Import alias table (e.g. `"@" -> "src"`).
    pub aliases: BTreeMap<String, String>,
    /// Whether shared code may be extracted into chunks. Only meaningful
    /// for multi-entry requests.
    pub splitting: bool,
    /// Whether the well-known `load` export (and imports used solely by
    /// it) is removed before bundling. Set for client-variant builds.
    pub strip_load: bool,
}

/// One file produced by a compiler invocation.
///
/// `path` is relative to the request root and, for chunk files, is only
/// stable within the invocation that produced it.
#[derive(Debug, Clone)]
pub struct OutputFile {
    /// Output path relative to the request root, e.g. `"blog/index.js"`
    /// or `"chunk-X7K2P.js"`.
    pub path: String,
    /// The compiled module text.
    pub text: String,
}

/// The external bundler collaborator.
///
/// Contract:
/// - A single-entry, non-split request returns exactly one fully-inlined
///   file.
/// - A multi-entry, split request returns one file per entry plus zero or
///   more shared chunk files with compiler-assigned names.
/// - Any unresolved internal import or syntax error is a typed
///   [`CompileError`] for that unit, never silently skipped.
///
/// Implementations must be `Sync`: invocations are fanned out across a
/// worker pool.
pub trait Compiler: Sync {
    /// Compiles the requested entries into output files.
    fn compile(&self, request: &CompileRequest) -> Result<Vec<OutputFile>, CompileError>;
}

/// Adapts a closure into a [`Compiler`]. Primarily a test convenience.
pub struct FnCompiler<F>(F);

impl<F> FnCompiler<F>
where
    F: Fn(&CompileRequest) -> Result<Vec<OutputFile>, CompileError> + Sync,
{
    /// Wraps the closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Compiler for FnCompiler<F>
where
    F: Fn(&CompileRequest) -> Result<Vec<OutputFile>, CompileError> + Sync,
{
    fn compile(&self, request: &CompileRequest) -> Result<Vec<OutputFile>, CompileError> {
        (self.0)(request)
    }
}
