//! The build manifest written at the end of a successful run.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use keel_common::{FileMap, OutputRef};

use crate::error::BuildError;

/// Name of the manifest file under the output root.
pub const MANIFEST_NAME: &str = "manifest.json";

/// Summary of one production build: when it ran, where the application
/// entry landed, and every source-to-artifact mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    /// Unix timestamp (milliseconds) of the run.
    pub timestamp: u64,
    /// Artifact path of the compiled application entry module.
    pub entry: String,
    /// Flattened FileMap: source path (client variants tagged) → artifact.
    pub files: BTreeMap<String, String>,
}

impl Manifest {
    /// Assembles a manifest from the finished run's FileMap.
    pub fn assemble(entry: &OutputRef, file_map: &FileMap) -> Self {
        Self {
            timestamp: unix_millis(),
            entry: entry.as_str().to_string(),
            files: file_map.flatten(),
        }
    }

    /// Writes the manifest as pretty JSON under the output root.
    pub fn write(&self, out_dir: &Path) -> Result<(), BuildError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| BuildError::Serialization {
            reason: e.to_string(),
        })?;
        let path = out_dir.join(MANIFEST_NAME);
        std::fs::write(&path, json).map_err(|e| BuildError::io(&path, e))
    }

    /// Loads a previously written manifest.
    pub fn load(out_dir: &Path) -> Result<Self, BuildError> {
        let path = out_dir.join(MANIFEST_NAME);
        let json = std::fs::read_to_string(&path).map_err(|e| BuildError::io(&path, e))?;
        serde_json::from_str(&json).map_err(|e| BuildError::Serialization {
            reason: e.to_string(),
        })
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_common::Variant;
    use std::path::PathBuf;

    #[test]
    fn round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let mut map = FileMap::new();
        map.insert(
            &PathBuf::from("/app/routes/index.tsx"),
            Variant::Server,
            OutputRef::new(Variant::Server, "abc.js"),
        );
        map.insert(
            &PathBuf::from("/app/routes/index.tsx"),
            Variant::Client,
            OutputRef::new(Variant::Client, "def.js"),
        );

        let entry = OutputRef::new(Variant::Server, "entry0.js");
        let manifest = Manifest::assemble(&entry, &map);
        manifest.write(tmp.path()).unwrap();

        let loaded = Manifest::load(tmp.path()).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.entry, "server/entry0.js");
        assert_eq!(loaded.files["/app/routes/index.tsx"], "server/abc.js");
        assert_eq!(
            loaded.files["/app/routes/index.tsx#client"],
            "client/def.js"
        );
    }

    #[test]
    fn timestamp_is_recent() {
        let manifest = Manifest::assemble(
            &OutputRef::new(Variant::Server, "e.js"),
            &FileMap::new(),
        );
        assert!(manifest.timestamp > 1_600_000_000_000);
    }
}
