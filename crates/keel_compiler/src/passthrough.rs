//! A minimal stand-in bundler.
//!
//! `PassthroughCompiler` performs no real bundling or transformation: each
//! entry's text is emitted as-is, with the `load` export (and imports used
//! solely by it) stripped when requested. It exists so the CLI works end
//! to end without an external toolchain and so tests have a deterministic
//! collaborator. It never emits shared chunks.

use std::path::Path;

use crate::{CompileError, CompileRequest, Compiler, OutputFile};

/// Extensions the passthrough compiler accepts as compilable source.
const SOURCE_EXTS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// A [`Compiler`] that passes entry text through unmodified apart from
/// `load`-export stripping.
#[derive(Debug, Default)]
pub struct PassthroughCompiler;

impl PassthroughCompiler {
    /// Creates a new passthrough compiler.
    pub fn new() -> Self {
        Self
    }
}

impl Compiler for PassthroughCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<Vec<OutputFile>, CompileError> {
        let mut outputs = Vec::with_capacity(request.entries.len());
        for entry in &request.entries {
            let ext = entry.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !SOURCE_EXTS.contains(&ext) {
                return Err(CompileError::Syntax {
                    path: entry.clone(),
                    message: format!("unsupported source extension '{ext}'"),
                });
            }

            let text = std::fs::read_to_string(entry).map_err(|e| CompileError::Io {
                path: entry.clone(),
                source: e,
            })?;

            let text = if request.strip_load {
                strip_load_export(&text)
            } else {
                text
            };

            outputs.push(OutputFile {
                path: output_path(entry, &request.root),
                text,
            });
        }
        Ok(outputs)
    }
}

/// Output path for an entry: its path relative to the request root with
/// the extension replaced by `.js`.
fn output_path(entry: &Path, root: &Path) -> String {
    let rel = entry.strip_prefix(root).unwrap_or(entry);
    let stem = rel.with_extension("js");
    stem.to_string_lossy().replace('\\', "/")
}

/// Removes the top-level `load` export and any imports used solely by it.
///
/// Recognizes `export function load`, `export async function load`, and
/// `export const/let/var load = ...`. Brace/paren matching is textual;
/// string literals containing unbalanced braces inside the load body will
/// confuse it, which is acceptable for a stand-in.
pub fn strip_load_export(text: &str) -> String {
    let stripped = match find_load_span(text) {
        Some((start, end)) => {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..start]);
            out.push_str(&text[end..]);
            out
        }
        None => return text.to_string(),
    };
    drop_unused_imports(&stripped)
}

/// Locates the byte span of the `load` export declaration, if present.
fn find_load_span(text: &str) -> Option<(usize, usize)> {
    let mut search = 0;
    while let Some(pos) = text[search..].find("export").map(|p| p + search) {
        search = pos + "export".len();
        let rest = text[search..].trim_start();
        let offset = text.len() - rest.len();

        if let Some(after) = rest
            .strip_prefix("async function load")
            .or_else(|| rest.strip_prefix("function load"))
        {
            // `load` must be the whole identifier; `loader` is not it.
            if !at_identifier_end(after) {
                continue;
            }
            let body_start = offset + (rest.len() - after.len());
            let open = body_brace(text, body_start)?;
            let close = matching_brace(text, open)?;
            return Some((pos, skip_trailing_newline(text, close + 1)));
        }

        for kw in ["const load", "let load", "var load"] {
            if rest
                .strip_prefix(kw)
                .is_some_and(at_identifier_end)
            {
                let end = statement_end(text, offset)?;
                return Some((pos, skip_trailing_newline(text, end)));
            }
        }
    }
    None
}

/// Whether `rest` begins past the end of an identifier, i.e. its first
/// character cannot extend one.
fn at_identifier_end(rest: &str) -> bool {
    !rest
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Finds the function body's opening `{`: the first brace at paren depth
/// zero, so destructured parameters like `load({ params })` are skipped.
fn body_brace(text: &str, from: usize) -> Option<usize> {
    let mut parens = 0usize;
    for (i, ch) in text[from..].char_indices() {
        match ch {
            '(' => parens += 1,
            ')' => parens = parens.saturating_sub(1),
            '{' if parens == 0 => return Some(from + i),
            _ => {}
        }
    }
    None
}

/// Finds the byte index of the matching `}` for the `{` at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in text[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Finds the byte index just past the `;` terminating a statement that
/// starts at `start`, tracking brace/paren nesting.
fn statement_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0isize;
    for (i, ch) in text[start..].char_indices() {
        match ch {
            '{' | '(' | '[' => depth += 1,
            '}' | ')' | ']' => depth -= 1,
            ';' if depth == 0 => return Some(start + i + 1),
            _ => {}
        }
    }
    Some(text.len())
}

/// Extends a span end past one trailing newline so no blank line is left.
fn skip_trailing_newline(text: &str, end: usize) -> usize {
    let bytes = text.as_bytes();
    let mut end = end;
    if bytes.get(end) == Some(&b'\r') {
        end += 1;
    }
    if bytes.get(end) == Some(&b'\n') {
        end += 1;
    }
    end
}

/// Drops import statements none of whose bindings appear in the rest of
/// the module. Side-effect imports (no binding clause) are kept.
fn drop_unused_imports(text: &str) -> String {
    let mut kept = Vec::new();
    let lines: Vec<&str> = text.lines().collect();

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if !trimmed.starts_with("import ") || !trimmed.contains(" from ") {
            kept.push(*line);
            continue;
        }

        let bindings = import_bindings(trimmed);
        if bindings.is_empty() {
            kept.push(*line);
            continue;
        }

        let used = bindings.iter().any(|name| {
            lines
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .any(|(_, other)| contains_identifier(other, name))
        });
        if used {
            kept.push(*line);
        }
    }

    let mut out = kept.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Extracts the bound names from an import statement's binding clause.
fn import_bindings(line: &str) -> Vec<String> {
    let clause = match line
        .strip_prefix("import ")
        .and_then(|rest| rest.split(" from ").next())
    {
        Some(c) => c,
        None => return Vec::new(),
    };

    let mut names = Vec::new();
    for part in clause.split(',') {
        let part = part.trim().trim_matches(|c| c == '{' || c == '}').trim();
        if part.is_empty() {
            continue;
        }
        // "a as b" and "* as b" bind b; plain names bind themselves.
        let name = match part.rsplit_once(" as ") {
            Some((_, alias)) => alias.trim(),
            None => part,
        };
        if name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
            && !name.is_empty()
        {
            names.push(name.to_string());
        }
    }
    names
}

/// Word-boundary check for an identifier occurring in a line of code.
fn contains_identifier(line: &str, name: &str) -> bool {
    let mut search = 0;
    while let Some(pos) = line[search..].find(name).map(|p| p + search) {
        let before_ok = pos == 0
            || !line[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        let after = pos + name.len();
        let after_ok = after >= line.len()
            || !line[after..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        if before_ok && after_ok {
            return true;
        }
        search = pos + name.len();
    }
    false
}
