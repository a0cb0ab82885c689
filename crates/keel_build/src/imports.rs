//! Scanning and rewriting of relative import specifiers.
//!
//! Both the chunk stabilizer and the non-split import rewriter need the
//! same primitive: find every `from "<spec>"` and `import("<spec>")`
//! whose specifier is relative, and substitute a replacement. Compiled
//! output is plain module text, so this is a textual scan, not a parse.

/// Byte range of one quoted specifier's content (quotes excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Specifier {
    pub start: usize,
    pub end: usize,
}

/// Whether a specifier is a relative path reference.
pub(crate) fn is_relative(spec: &str) -> bool {
    spec.starts_with("./") || spec.starts_with("../")
}

/// Finds every quoted specifier in `from "..."` and `import("...")`
/// position, relative or not, in source order.
pub(crate) fn specifiers(text: &str) -> Vec<Specifier> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();

    let mut collect = |keyword: &str, expects_paren: bool| {
        let mut search = 0;
        while let Some(pos) = text[search..].find(keyword).map(|p| p + search) {
            search = pos + keyword.len();
            if !at_word_boundary(bytes, pos, keyword.len()) {
                continue;
            }
            let mut i = skip_ws(bytes, pos + keyword.len());
            if expects_paren {
                if bytes.get(i) != Some(&b'(') {
                    continue;
                }
                i = skip_ws(bytes, i + 1);
            }
            let quote = match bytes.get(i) {
                Some(q @ (b'"' | b'\'')) => *q,
                _ => continue,
            };
            let content_start = i + 1;
            if let Some(rel_end) = text[content_start..].find(quote as char) {
                found.push(Specifier {
                    start: content_start,
                    end: content_start + rel_end,
                });
            }
        }
    };

    collect("from", false);
    collect("import", true);

    found.sort_by_key(|s| s.start);
    found.dedup();
    found
}

/// Rewrites relative specifiers through `replace`.
///
/// `replace` returns the new specifier text, or `None` to leave one
/// untouched. Returns the rewritten text, the number of specifiers that
/// actually changed, and the number of relative specifiers `replace`
/// could not resolve.
pub(crate) fn rewrite<F>(text: &str, mut replace: F) -> (String, usize, usize)
where
    F: FnMut(&str) -> Option<String>,
{
    let specs = specifiers(text);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut changed = 0;
    let mut unresolved = 0;

    for spec in specs {
        let content = &text[spec.start..spec.end];
        if !is_relative(content) {
            continue;
        }
        match replace(content) {
            Some(new) => {
                if new != content {
                    out.push_str(&text[cursor..spec.start]);
                    out.push_str(&new);
                    cursor = spec.end;
                    changed += 1;
                }
            }
            None => unresolved += 1,
        }
    }
    out.push_str(&text[cursor..]);
    (out, changed, unresolved)
}

/// Checks that the keyword at `pos` is not part of a longer identifier.
fn at_word_boundary(bytes: &[u8], pos: usize, len: usize) -> bool {
    let before_ok = pos == 0 || !is_ident_byte(bytes[pos - 1]);
    let after = pos + len;
    let after_ok = after >= bytes.len() || !is_ident_byte(bytes[after]);
    before_ok && after_ok
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_strings(text: &str) -> Vec<&str> {
        specifiers(text)
            .into_iter()
            .map(|s| &text[s.start..s.end])
            .collect()
    }

    #[test]
    fn finds_static_imports() {
        let text = r#"import { Card } from "./components/card";"#;
        assert_eq!(spec_strings(text), vec!["./components/card"]);
    }

    #[test]
    fn finds_dynamic_imports() {
        let text = r#"const mod = await import("../shared/util.js");"#;
        assert_eq!(spec_strings(text), vec!["../shared/util.js"]);
    }

    #[test]
    fn finds_single_quoted() {
        let text = "import x from './x';\nconst y = import('./y');";
        assert_eq!(spec_strings(text), vec!["./x", "./y"]);
    }

    #[test]
    fn ignores_identifier_suffixes() {
        // "reimport(" and "platform" must not trigger the scanners.
        let text = r#"reimport("./a"); const platform = 1; export { platform };"#;
        assert!(spec_strings(text).is_empty());
    }

    #[test]
    fn finds_bare_specifiers_too() {
        let text = r#"import React from "react";"#;
        assert_eq!(spec_strings(text), vec!["react"]);
    }

    #[test]
    fn rewrite_replaces_relative_only() {
        let text = r#"import React from "react";
import { Card } from "./chunk-ABC.js";
const lazy = import("../other/thing.js");"#;
        let (out, changed, unresolved) = rewrite(text, |spec| {
            if spec.contains("chunk-ABC") {
                Some("./a1b2c3d4e5f6789.js".to_string())
            } else {
                None
            }
        });
        assert_eq!(changed, 1);
        assert_eq!(unresolved, 1);
        assert!(out.contains(r#"from "./a1b2c3d4e5f6789.js""#));
        assert!(out.contains(r#"from "react""#));
        assert!(out.contains("../other/thing.js"));
    }

    #[test]
    fn rewrite_identity_counts_no_change() {
        let text = r#"import { x } from "./same.js";"#;
        let (out, changed, unresolved) = rewrite(text, |spec| Some(spec.to_string()));
        assert_eq!(out, text);
        assert_eq!(changed, 0);
        assert_eq!(unresolved, 0);
    }

    #[test]
    fn rewrite_handles_multiple_occurrences() {
        let text = "import a from \"./one\";\nimport b from \"./two\";\n";
        let (out, changed, _) = rewrite(text, |spec| Some(format!("{spec}.js")));
        assert!(out.contains("./one.js"));
        assert!(out.contains("./two.js"));
        assert_eq!(changed, 2);
    }
}
