//! Fixed-point stabilization of split bundler output.
//!
//! A splitting compiler invocation returns entry files plus shared chunks
//! whose names are compiler-assigned and stable only within that one
//! invocation. Entries must end up content-addressed (route tables cache
//! on their names), and every relative reference — in entries and chunks
//! alike — must resolve to each file's FINAL name.
//!
//! Phase A materializes the batch: entries are renamed to their content
//! hash, chunks keep the compiler's basename (their content is not final
//! yet, and nothing outside the build looks chunks up by name, so
//! renaming them would only cause churn). Phase B then rewrites
//! references round by round until a whole round changes nothing.
//! Renaming an entry changes its bytes' referrers, which can re-dirty
//! other entries, hence the fixed point; chunks keeping their names is
//! what bounds the rename cascade.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use keel_common::ContentHash;
use keel_compiler::OutputFile;

use crate::error::BuildError;
use crate::imports;

/// Hard ceiling on stabilization rounds. An acyclic reference graph of
/// depth D converges in at most D+1 rounds; real chunk graphs are shallow.
pub const ROUND_CEILING: usize = 8;

/// One materialized file in the batch being stabilized.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Content hash digest for entries; empty for chunks.
    pub hash: String,
    /// Current on-disk filename (`<hash>.js` for entries, the compiler's
    /// basename for chunks).
    pub hash_name: String,
    /// Current file content.
    pub content: String,
    /// The compiler's output-relative path. Never changes; this is the
    /// join key for the whole batch.
    pub relative_path: String,
}

/// Result of one stabilization run.
#[derive(Debug, Clone, Copy)]
pub struct StabilizeOutcome {
    /// Number of entry files in the batch.
    pub entries: usize,
    /// Number of shared chunk files in the batch.
    pub chunks: usize,
    /// Rounds executed, including the final clean round when converged.
    pub rounds: usize,
    /// Whether a clean round was reached before the ceiling.
    pub converged: bool,
    /// Relative references that matched nothing known in the batch.
    /// These are assumed external and left untouched.
    pub unresolved: usize,
}

/// A stabilized batch: final entry names plus the loop outcome.
#[derive(Debug)]
pub struct StabilizedBatch {
    /// Final content-addressed filename per entry source.
    pub entry_names: Vec<(PathBuf, String)>,
    /// Loop statistics and convergence status.
    pub outcome: StabilizeOutcome,
}

/// Stabilizes one homogeneous-target batch of split compiler output.
pub struct ChunkStabilizer<'a> {
    /// The variant output directory files are written into.
    dir: &'a Path,
    /// Records keyed by compiler-relative path.
    records: HashMap<String, ChunkRecord>,
    /// Every filename a record has ever had, mapped to its join key.
    names: HashMap<String, String>,
    /// Entry content hashes mapped to their join key, for references
    /// that still carry a name from an earlier round.
    by_hash: HashMap<String, String>,
}

impl<'a> ChunkStabilizer<'a> {
    /// Creates a stabilizer writing into the given variant directory.
    pub fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            records: HashMap::new(),
            names: HashMap::new(),
            by_hash: HashMap::new(),
        }
    }

    /// Runs both phases over one compiler invocation's output.
    ///
    /// `entries` maps each requested source's root-relative path (with
    /// the extension stripped) to its absolute source path; any output
    /// whose relative path matches is an entry, everything else is a
    /// chunk.
    pub fn run(
        &mut self,
        outputs: Vec<OutputFile>,
        entries: &HashMap<String, PathBuf>,
    ) -> Result<StabilizedBatch, BuildError> {
        self.materialize(outputs, entries)?;
        let outcome = self.stabilize()?;

        let mut entry_names = Vec::new();
        for record in self.records.values() {
            if record.hash.is_empty() {
                continue;
            }
            let stem = strip_extension(&record.relative_path);
            if let Some(source) = entries.get(stem) {
                entry_names.push((source.clone(), record.hash_name.clone()));
            }
        }
        entry_names.sort();

        Ok(StabilizedBatch {
            entry_names,
            outcome,
        })
    }

    /// Phase A: classify, name, and write every file once.
    fn materialize(
        &mut self,
        outputs: Vec<OutputFile>,
        entries: &HashMap<String, PathBuf>,
    ) -> Result<(), BuildError> {
        for output in outputs {
            let stem = strip_extension(&output.path).to_string();
            let compiler_name = basename(&output.path).to_string();

            let (hash, final_name) = if entries.contains_key(stem.as_str()) {
                let hash = ContentHash::of(output.text.as_bytes());
                let name = format!("{hash}.js");
                (hash.as_str().to_string(), name)
            } else {
                // Chunks keep the compiler's basename: unique within the
                // batch is all they need.
                (String::new(), compiler_name.clone())
            };

            let path = self.dir.join(&final_name);
            std::fs::write(&path, &output.text).map_err(|e| BuildError::io(&path, e))?;

            self.names
                .insert(compiler_name, output.path.clone());
            self.names.insert(final_name.clone(), output.path.clone());
            if !hash.is_empty() {
                self.by_hash.insert(hash.clone(), output.path.clone());
            }

            self.records.insert(
                output.path.clone(),
                ChunkRecord {
                    hash,
                    hash_name: final_name,
                    content: output.text,
                    relative_path: output.path,
                },
            );
        }
        Ok(())
    }

    /// Phase B: rewrite references to current final names until a whole
    /// round is clean or the ceiling is hit.
    fn stabilize(&mut self) -> Result<StabilizeOutcome, BuildError> {
        let mut keys: Vec<String> = self.records.keys().cloned().collect();
        keys.sort();

        let mut rounds = 0;
        let mut converged = false;
        let mut unresolved = 0;

        for _ in 0..ROUND_CEILING {
            rounds += 1;
            let mut dirty = false;
            unresolved = 0;

            for key in &keys {
                let content = self.records[key].content.clone();
                let (new_content, changed, missed) = imports::rewrite(&content, |spec| {
                    self.resolve(spec).map(|name| format!("./{name}"))
                });
                unresolved += missed;

                if changed > 0 {
                    dirty = true;
                    self.apply(key, new_content)?;
                }
            }

            if !dirty {
                converged = true;
                break;
            }
        }

        let entries = self.records.values().filter(|r| !r.hash.is_empty()).count();
        Ok(StabilizeOutcome {
            entries,
            chunks: self.records.len() - entries,
            rounds,
            converged,
            unresolved,
        })
    }

    /// Resolves a relative specifier to a batch member's current name.
    ///
    /// Direct name lookup covers compiler-assigned names and every name a
    /// file has carried in earlier rounds; the content-hash fallback
    /// covers references written as a bare hash filename.
    fn resolve(&self, spec: &str) -> Option<String> {
        let name = basename(spec);
        let key = self.names.get(name).or_else(|| {
            let stem = strip_extension(name);
            self.by_hash.get(stem)
        })?;
        Some(self.records[key].hash_name.clone())
    }

    /// Applies rewritten content to a record: chunks are updated in
    /// place, entries are re-hashed and renamed.
    fn apply(&mut self, key: &str, new_content: String) -> Result<(), BuildError> {
        let (is_entry, old_name) = {
            let rec = &self.records[key];
            (!rec.hash.is_empty(), rec.hash_name.clone())
        };

        if !is_entry {
            let path = self.dir.join(&old_name);
            std::fs::write(&path, &new_content).map_err(|e| BuildError::io(&path, e))?;
            if let Some(rec) = self.records.get_mut(key) {
                rec.content = new_content;
            }
            return Ok(());
        }

        let new_hash = ContentHash::of(new_content.as_bytes());
        let new_name = format!("{new_hash}.js");

        let new_path = self.dir.join(&new_name);
        std::fs::write(&new_path, &new_content).map_err(|e| BuildError::io(&new_path, e))?;
        if new_name != old_name {
            let old_path = self.dir.join(&old_name);
            std::fs::remove_file(&old_path).map_err(|e| BuildError::io(&old_path, e))?;
        }

        let old_hash = {
            let rec = self.records.get_mut(key).expect("record exists");
            let old_hash = std::mem::replace(&mut rec.hash, new_hash.as_str().to_string());
            rec.hash_name = new_name.clone();
            rec.content = new_content;
            old_hash
        };

        self.by_hash.remove(&old_hash);
        self.by_hash.insert(new_hash.as_str().to_string(), key.to_string());
        // The stale name stays in the alias map so references written in
        // earlier rounds still resolve.
        self.names.insert(new_name, key.to_string());
        Ok(())
    }
}

/// The path's final component.
fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// The path with its final extension removed.
fn strip_extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => &path[..dot],
        _ => path,
    }
}
