//! Cross-file import path fixups for non-split builds.
//!
//! Each non-split `compile_file` call is unaware of its siblings' final
//! artifact names, so relative source references survive compilation
//! verbatim. Once the whole FileMap exists, this pass resolves every
//! surviving relative reference to the sibling's registered artifact and
//! rewrites it, handling both same-target and cross-target cases.

use std::path::{Component, Path, PathBuf};

use keel_common::{FileMap, OutputRef, Variant};

use crate::error::BuildError;
use crate::imports;

/// Extensions tried when a specifier omits or disguises its extension.
const RESOLVE_EXTS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Rewrites surviving relative references in every emitted `.js` file.
pub struct ImportPathRewriter<'a> {
    out_dir: &'a Path,
}

impl<'a> ImportPathRewriter<'a> {
    /// Creates a rewriter over the given output root.
    pub fn new(out_dir: &'a Path) -> Self {
        Self { out_dir }
    }

    /// Scans and patches every registered artifact. Returns the number of
    /// references rewritten. References that resolve to no FileMap entry
    /// are left untouched (assumed external or already final).
    pub fn rewrite_all(&self, file_map: &FileMap) -> Result<usize, BuildError> {
        let mut total = 0;

        for (key, output_ref) in file_map.iter() {
            if !output_ref.filename().ends_with(".js") {
                continue;
            }
            let out_path = self.out_dir.join(output_ref.as_str());
            let text =
                std::fs::read_to_string(&out_path).map_err(|e| BuildError::io(&out_path, e))?;

            let source_dir = key.source.parent().unwrap_or(Path::new(""));
            let variant = if key.client_variant {
                Variant::Client
            } else {
                Variant::Server
            };

            let (new_text, changed, _unresolved) = imports::rewrite(&text, |spec| {
                let referenced = normalize(&source_dir.join(spec));
                let sibling = lookup(file_map, &referenced, variant)?;
                Some(relative_ref(variant, sibling))
            });

            if changed > 0 {
                std::fs::write(&out_path, new_text).map_err(|e| BuildError::io(&out_path, e))?;
                total += changed;
            }
        }
        Ok(total)
    }
}

/// Resolves a referenced source path to its registered artifact.
///
/// Tries the importing file's own variant first, then the other variant
/// (cross-target reference). Specifiers may omit the extension or carry
/// a compiled `.js` one, so candidate paths are tried with each source
/// extension as well.
fn lookup<'m>(
    file_map: &'m FileMap,
    referenced: &Path,
    variant: Variant,
) -> Option<&'m OutputRef> {
    for candidate in candidates(referenced) {
        if let Some(output) = file_map.get(&candidate, variant) {
            return Some(output);
        }
        let other = match variant {
            Variant::Server => Variant::Client,
            Variant::Client => Variant::Server,
        };
        if let Some(output) = file_map.get(&candidate, other) {
            return Some(output);
        }
    }
    None
}

/// Candidate source paths for a referenced path: as written, with each
/// source extension appended, and with the written extension swapped.
fn candidates(referenced: &Path) -> Vec<PathBuf> {
    let mut out = vec![referenced.to_path_buf()];
    for ext in RESOLVE_EXTS {
        let candidate = referenced.with_extension(ext);
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}

/// Relative path from an importing artifact to a sibling artifact.
fn relative_ref(importing: Variant, sibling: &OutputRef) -> String {
    if sibling.dir() == importing.dir() {
        format!("./{}", sibling.filename())
    } else {
        format!("../{}/{}", sibling.dir(), sibling.filename())
    }
}

/// Lexical normalization of `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
