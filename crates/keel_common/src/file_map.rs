//! The per-run map from source files to emitted artifact paths.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::target::Variant;

/// Suffix appended to client-variant keys when the map is flattened
/// for the manifest.
const CLIENT_KEY_SUFFIX: &str = "#client";

/// A relative path to an emitted artifact, prefixed `server/` or `client/`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputRef(String);

impl OutputRef {
    /// Builds an output reference from a variant and an artifact filename.
    pub fn new(variant: Variant, filename: &str) -> Self {
        Self(format!("{}/{}", variant.dir(), filename))
    }

    /// The reference as a string slice, e.g. `"server/a1b2c3.js"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The variant directory component (`"server"` or `"client"`).
    pub fn dir(&self) -> &str {
        self.0.split('/').next().unwrap_or("")
    }

    /// The artifact filename component.
    pub fn filename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputRef({})", self.0)
    }
}

/// Identity of one compiled unit within a run: the absolute source path
/// plus whether this is the client variant of that source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileKey {
    /// Absolute path of the source file.
    pub source: PathBuf,
    /// `true` for the client variant of the source.
    pub client_variant: bool,
}

impl FileKey {
    /// Key for a source compiled as the given variant.
    pub fn new(source: &Path, variant: Variant) -> Self {
        Self {
            source: source.to_path_buf(),
            client_variant: variant.is_client(),
        }
    }
}

/// Mapping from compiled units to their emitted artifact references.
///
/// Created fresh per run, threaded `&mut` through the pipeline, and
/// discarded once the manifest is written. At most one live [`OutputRef`]
/// exists per key at any time; re-registering a key replaces the mapping.
#[derive(Debug, Default)]
pub struct FileMap {
    entries: HashMap<FileKey, OutputRef>,
}

impl FileMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the artifact for a compiled unit.
    pub fn insert(&mut self, source: &Path, variant: Variant, output: OutputRef) {
        self.entries.insert(FileKey::new(source, variant), output);
    }

    /// Looks up the artifact for a source compiled as the given variant.
    pub fn get(&self, source: &Path, variant: Variant) -> Option<&OutputRef> {
        self.entries.get(&FileKey::new(source, variant))
    }

    /// Iterates over all registered units.
    pub fn iter(&self) -> impl Iterator<Item = (&FileKey, &OutputRef)> {
        self.entries.iter()
    }

    /// Number of registered units.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattens the map into ordered string pairs for the manifest.
    ///
    /// Client-variant keys get a `#client` suffix so both variants of a
    /// source survive the flattening.
    pub fn flatten(&self) -> BTreeMap<String, String> {
        let mut flat = BTreeMap::new();
        for (key, output) in &self.entries {
            let mut name = key.source.to_string_lossy().into_owned();
            if key.client_variant {
                name.push_str(CLIENT_KEY_SUFFIX);
            }
            flat.insert(name, output.as_str().to_string());
        }
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_ref_components() {
        let r = OutputRef::new(Variant::Server, "a1b2c3.js");
        assert_eq!(r.as_str(), "server/a1b2c3.js");
        assert_eq!(r.dir(), "server");
        assert_eq!(r.filename(), "a1b2c3.js");
    }

    #[test]
    fn insert_and_get_by_variant() {
        let mut map = FileMap::new();
        let src = Path::new("/app/routes/index.tsx");
        map.insert(src, Variant::Server, OutputRef::new(Variant::Server, "s.js"));
        map.insert(src, Variant::Client, OutputRef::new(Variant::Client, "c.js"));

        assert_eq!(map.get(src, Variant::Server).unwrap().as_str(), "server/s.js");
        assert_eq!(map.get(src, Variant::Client).unwrap().as_str(), "client/c.js");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn reinsert_replaces_mapping() {
        let mut map = FileMap::new();
        let src = Path::new("/app/routes/index.tsx");
        map.insert(src, Variant::Server, OutputRef::new(Variant::Server, "old.js"));
        map.insert(src, Variant::Server, OutputRef::new(Variant::Server, "new.js"));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(src, Variant::Server).unwrap().filename(), "new.js");
    }

    #[test]
    fn flatten_tags_client_variants() {
        let mut map = FileMap::new();
        let src = Path::new("/app/routes/index.tsx");
        map.insert(src, Variant::Server, OutputRef::new(Variant::Server, "s.js"));
        map.insert(src, Variant::Client, OutputRef::new(Variant::Client, "c.js"));

        let flat = map.flatten();
        assert_eq!(flat["/app/routes/index.tsx"], "server/s.js");
        assert_eq!(flat["/app/routes/index.tsx#client"], "client/c.js");
    }

    #[test]
    fn missing_lookup_is_none() {
        let map = FileMap::new();
        assert!(map.get(Path::new("/nope.tsx"), Variant::Server).is_none());
        assert!(map.is_empty());
    }
}
