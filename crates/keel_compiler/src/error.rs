//! Error types for compiler invocations.

use std::path::PathBuf;

/// Errors reported by a [`Compiler`](crate::Compiler) implementation.
///
/// Every variant is fatal for the unit being compiled; the pipeline never
/// skips a failed unit silently.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The source could not be parsed.
    #[error("syntax error in {path}: {message}")]
    Syntax {
        /// The source file that failed to parse.
        path: PathBuf,
        /// The parser's message.
        message: String,
    },

    /// An internal import could not be resolved.
    #[error("unresolved import '{specifier}' in {path}")]
    UnresolvedImport {
        /// The importing source file.
        path: PathBuf,
        /// The import specifier that failed to resolve.
        specifier: String,
    },

    /// An I/O error occurred while reading a source file.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The source file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The compiler produced output violating its contract, e.g. the
    /// wrong number of files for a single-entry request.
    #[error("compiler contract violation: {reason}")]
    Contract {
        /// Description of the violation.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_display() {
        let err = CompileError::Syntax {
            path: PathBuf::from("routes/index.tsx"),
            message: "unexpected token '}'".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("syntax error"));
        assert!(msg.contains("index.tsx"));
    }

    #[test]
    fn unresolved_import_display() {
        let err = CompileError::UnresolvedImport {
            path: PathBuf::from("routes/about.tsx"),
            specifier: "./missing".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("unresolved import './missing'"));
        assert!(msg.contains("about.tsx"));
    }

    #[test]
    fn io_display() {
        let err = CompileError::Io {
            path: PathBuf::from("routes/gone.tsx"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("failed to read"));
    }
}
