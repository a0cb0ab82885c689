//! Error and warning types for the build pipeline.

use std::path::PathBuf;

use keel_compiler::CompileError;

/// Fatal build errors. Anything here aborts the run (or the enclosing
/// directory compile) without writing a manifest.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The compiler rejected a source unit.
    #[error("failed to compile {path}: {source}")]
    Compile {
        /// The source file that failed.
        path: PathBuf,
        /// The compiler's error.
        source: CompileError,
    },

    /// An I/O error occurred while reading or writing build output.
    #[error("build I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Required build configuration is missing or invalid.
    #[error("invalid build configuration: {reason}")]
    Config {
        /// Description of the problem.
        reason: String,
    },

    /// A serialization error occurred writing a JSON table.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}

impl BuildError {
    /// Convenience constructor for I/O failures.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Non-fatal conditions collected during a run and surfaced after it.
///
/// Warnings never abort the build; they are reported by the CLI and
/// carried in the [`BuildReport`](crate::BuildReport).
#[derive(Debug, thiserror::Error)]
pub enum BuildWarning {
    /// A static asset could not be copied or compressed.
    #[error("failed to copy asset {path}: {reason}")]
    AssetCopy {
        /// The asset path.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A build hook failed to spawn or exited nonzero.
    #[error("build hook '{command}' failed: {reason}")]
    Hook {
        /// The configured hook command.
        command: String,
        /// Description of the failure.
        reason: String,
    },

    /// The chunk stabilization loop hit its round ceiling while the
    /// output was still changing. The current state was accepted.
    #[error(
        "chunk stabilization did not converge after {rounds} rounds \
         ({unresolved} unresolved references remain)"
    )]
    StabilizationOverrun {
        /// Rounds executed before giving up.
        rounds: usize,
        /// Relative references that still resolve to nothing known.
        unresolved: usize,
    },

    /// A non-entry pipeline stage failed and was skipped.
    #[error("build stage '{stage}' failed: {reason}")]
    Stage {
        /// The stage name.
        stage: &'static str,
        /// Description of the failure.
        reason: String,
    },
}
