//! The filesystem cache probe.

use std::path::Path;

use keel_common::SourceHash;

/// Filename a source with the given fingerprint compiles to.
pub fn cached_name(hash: &SourceHash) -> String {
    format!("{hash}.js")
}

/// Checks whether a compiled output for the given source fingerprint
/// already exists under `out_dir`.
///
/// Returns the cached filename on a hit. Pure and stateless: the file's
/// presence is the entire cache signal.
pub fn probe(out_dir: &Path, hash: &SourceHash) -> Option<String> {
    let name = cached_name(hash);
    if out_dir.join(&name).is_file() {
        Some(name)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_miss_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let hash = SourceHash::of(100, 1_700_000_000_000);
        assert!(probe(dir.path(), &hash).is_none());
    }

    #[test]
    fn probe_hit_when_output_exists() {
        let dir = tempfile::tempdir().unwrap();
        let hash = SourceHash::of(100, 1_700_000_000_000);
        std::fs::write(dir.path().join(cached_name(&hash)), "compiled").unwrap();

        let hit = probe(dir.path(), &hash).unwrap();
        assert_eq!(hit, format!("{hash}.js"));
    }

    #[test]
    fn probe_ignores_directories() {
        let dir = tempfile::tempdir().unwrap();
        let hash = SourceHash::of(100, 1_700_000_000_000);
        std::fs::create_dir(dir.path().join(cached_name(&hash))).unwrap();
        assert!(probe(dir.path(), &hash).is_none());
    }

    #[test]
    fn probe_miss_for_other_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let written = SourceHash::of(100, 1_700_000_000_000);
        std::fs::write(dir.path().join(cached_name(&written)), "compiled").unwrap();

        let other = SourceHash::of(101, 1_700_000_000_000);
        assert!(probe(dir.path(), &other).is_none());
    }
}
