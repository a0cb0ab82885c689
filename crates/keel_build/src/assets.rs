//! Static asset copying and gzip pre-compression.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::BuildWarning;

/// Extensions worth shipping a `.gz` companion for. Binary formats with
/// their own compression (images, fonts, archives) are left alone.
const COMPRESSIBLE_EXTS: &[&str] = &[
    "js", "mjs", "css", "html", "htm", "json", "svg", "txt", "xml", "map",
];

/// Copies the static directory into the output root, preserving its
/// directory name and layout, and writes a gzip companion next to each
/// compressible file.
///
/// Individual file failures become warnings; the copy keeps going. Only
/// a missing or unreadable static root is reported (also as a warning,
/// since shipping without assets is still a usable build).
pub fn copy_static_assets(static_dir: &Path, out_dir: &Path) -> Vec<BuildWarning> {
    let mut warnings = Vec::new();

    let dest_name = match static_dir.file_name() {
        Some(name) => name,
        None => {
            warnings.push(BuildWarning::AssetCopy {
                path: static_dir.to_path_buf(),
                reason: "static directory has no name".to_string(),
            });
            return warnings;
        }
    };

    copy_tree(static_dir, &out_dir.join(dest_name), &mut warnings);
    warnings
}

fn copy_tree(src: &Path, dest: &Path, warnings: &mut Vec<BuildWarning>) {
    let entries = match std::fs::read_dir(src) {
        Ok(entries) => entries,
        Err(e) => {
            warnings.push(BuildWarning::AssetCopy {
                path: src.to_path_buf(),
                reason: e.to_string(),
            });
            return;
        }
    };

    if let Err(e) = std::fs::create_dir_all(dest) {
        warnings.push(BuildWarning::AssetCopy {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        });
        return;
    }

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warnings.push(BuildWarning::AssetCopy {
                    path: src.to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let from = entry.path();
        let to = dest.join(entry.file_name());

        if from.is_dir() {
            copy_tree(&from, &to, warnings);
            continue;
        }

        if let Err(e) = std::fs::copy(&from, &to) {
            warnings.push(BuildWarning::AssetCopy {
                path: from.clone(),
                reason: e.to_string(),
            });
            continue;
        }

        if is_compressible(&to) {
            if let Err(e) = write_gzip_companion(&to) {
                warnings.push(BuildWarning::AssetCopy {
                    path: to.clone(),
                    reason: format!("gzip companion failed: {e}"),
                });
            }
        }
    }
}

fn is_compressible(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| COMPRESSIBLE_EXTS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Writes `<path>.gz` beside the copied file.
fn write_gzip_companion(path: &Path) -> io::Result<()> {
    let bytes = std::fs::read(path)?;
    let mut gz_path = path.as_os_str().to_owned();
    gz_path.push(".gz");
    let file = File::create(Path::new(&gz_path))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&bytes)?;
    encoder.finish()?;
    Ok(())
}
