//! Per-file and per-batch compilation into dual-target artifacts.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use keel_cache::{cached_name, fingerprint, probe};
use keel_common::{ContentHash, FileMap, OutputRef, SourceHash, Target, Variant};
use keel_compiler::{CompileError, CompileRequest, Compiler, OutputFile};

use crate::error::BuildError;
use crate::stabilize::{ChunkStabilizer, StabilizeOutcome};

/// Extensions treated as compilable source; anything else is copied
/// verbatim under a hash-derived name.
const SOURCE_EXTS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Upper bound on batch size regardless of core count.
const MAX_BATCH: usize = 20;

/// Compiles source files into per-target artifacts under the output root.
///
/// All FileMap mutation happens on the caller's thread; only compiler
/// invocations (and the writes of their results) are fanned out.
pub struct FileCompiler<'a> {
    compiler: &'a dyn Compiler,
    out_dir: PathBuf,
    root: PathBuf,
    aliases: BTreeMap<String, String>,
    cache: bool,
}

impl<'a> FileCompiler<'a> {
    /// Creates a file compiler.
    ///
    /// `root` is the directory split-output paths are expressed relative
    /// to (typically the routes directory); `cache` enables the
    /// fingerprint probe fast path.
    pub fn new(
        compiler: &'a dyn Compiler,
        out_dir: &Path,
        root: &Path,
        aliases: BTreeMap<String, String>,
        cache: bool,
    ) -> Self {
        Self {
            compiler,
            out_dir: out_dir.to_path_buf(),
            root: root.to_path_buf(),
            aliases,
            cache,
        }
    }

    /// Output directory for one variant.
    fn variant_dir(&self, variant: Variant) -> PathBuf {
        self.out_dir.join(variant.dir())
    }

    /// Compiles one source for the requested target(s), registering the
    /// resulting artifacts in `file_map`.
    pub fn compile_file(
        &self,
        source: &Path,
        target: Target,
        file_map: &mut FileMap,
    ) -> Result<(), BuildError> {
        if let Some(registrations) = self.try_cached(source, target)? {
            register(file_map, source, registrations);
            return Ok(());
        }
        let registrations = self.compile_and_write(source, target)?;
        register(file_map, source, registrations);
        Ok(())
    }

    /// Compiles many independent sources in bounded batches, fanning the
    /// compiler invocations of each batch out across a worker pool.
    ///
    /// Each batch is fully awaited before the next starts, bounding peak
    /// memory while overlapping I/O and CPU.
    pub fn compile_many(
        &self,
        sources: &[PathBuf],
        target: Target,
        file_map: &mut FileMap,
    ) -> Result<(), BuildError> {
        if sources.is_empty() {
            return Ok(());
        }
        let size = batch_size(sources.len());

        for batch in sources.chunks(size) {
            // Cache probes and FileMap mutation stay on this thread.
            let mut misses = Vec::new();
            for source in batch {
                match self.try_cached(source, target)? {
                    Some(registrations) => register(file_map, source, registrations),
                    None => misses.push(source.as_path()),
                }
            }

            let compiled: Vec<Result<Vec<(Variant, String)>, BuildError>> = misses
                .par_iter()
                .map(|source| self.compile_and_write(source, target))
                .collect();

            for (source, result) in misses.iter().zip(compiled) {
                register(file_map, source, result?);
            }
        }
        Ok(())
    }

    /// Compiles the whole entry set as one splitting invocation for a
    /// single concrete variant, then stabilizes the output.
    ///
    /// Split mode is never invoked for `Both`: the client variant comes
    /// from the `strip_load` interception, so each variant needs its own
    /// whole-graph invocation. The fingerprint cache does not apply here;
    /// chunk assignment depends on the whole graph, so per-file reuse
    /// would be unsound.
    pub fn compile_split(
        &self,
        sources: &[PathBuf],
        variant: Variant,
        file_map: &mut FileMap,
    ) -> Result<StabilizeOutcome, BuildError> {
        let request = CompileRequest {
            entries: sources.to_vec(),
            root: self.root.clone(),
            aliases: self.aliases.clone(),
            splitting: true,
            strip_load: variant.is_client(),
        };
        let outputs = self
            .compiler
            .compile(&request)
            .map_err(|e| compile_error(&self.root, e))?;

        let mut entries: HashMap<String, PathBuf> = HashMap::new();
        for source in sources {
            let rel = source.strip_prefix(&self.root).unwrap_or(source);
            let stem = rel.with_extension("");
            entries.insert(
                stem.to_string_lossy().replace('\\', "/"),
                source.clone(),
            );
        }

        let dir = self.variant_dir(variant);
        std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;

        let mut stabilizer = ChunkStabilizer::new(&dir);
        let batch = stabilizer.run(outputs, &entries)?;

        for (source, name) in &batch.entry_names {
            file_map.insert(source, variant, OutputRef::new(variant, name));
        }
        Ok(batch.outcome)
    }

    /// The cache fast path: returns registrations iff every requested
    /// variant has a matching cached output. Fingerprint failures are
    /// silent misses.
    fn try_cached(
        &self,
        source: &Path,
        target: Target,
    ) -> Result<Option<Vec<(Variant, String)>>, BuildError> {
        if !self.cache {
            return Ok(None);
        }
        let fp = match fingerprint(source) {
            Ok(fp) => fp,
            Err(_) => return Ok(None),
        };

        let mut registrations = Vec::new();
        for variant in target.variants() {
            let dir = self.variant_dir(*variant);
            let hit = if is_source(source) {
                probe(&dir, &fp)
            } else {
                let name = verbatim_name(source, &fp);
                dir.join(&name).is_file().then_some(name)
            };
            match hit {
                Some(name) => registrations.push((*variant, name)),
                None => return Ok(None),
            }
        }
        Ok(Some(registrations))
    }

    /// The miss path: compile (or copy) for every requested variant and
    /// write the artifacts. Safe to run off-thread; registration happens
    /// later on the owning thread.
    fn compile_and_write(
        &self,
        source: &Path,
        target: Target,
    ) -> Result<Vec<(Variant, String)>, BuildError> {
        let fp = fingerprint(source).ok();

        if !is_source(source) {
            return self.copy_verbatim(source, target, fp.as_ref());
        }

        let mut registrations = Vec::new();
        for variant in target.variants() {
            let request = CompileRequest {
                entries: vec![source.to_path_buf()],
                root: source.parent().unwrap_or(Path::new("")).to_path_buf(),
                aliases: self.aliases.clone(),
                splitting: false,
                strip_load: variant.is_client(),
            };
            let outputs = self
                .compiler
                .compile(&request)
                .map_err(|e| compile_error(source, e))?;
            let output = expect_single(source, outputs)?;

            let name = output_name(&output, fp.as_ref());
            let dir = self.variant_dir(*variant);
            std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
            let path = dir.join(&name);
            std::fs::write(&path, &output.text).map_err(|e| BuildError::io(&path, e))?;
            registrations.push((*variant, name));
        }
        Ok(registrations)
    }

    /// Copies a non-source file verbatim under a hash-derived name that
    /// preserves its extension.
    fn copy_verbatim(
        &self,
        source: &Path,
        target: Target,
        fp: Option<&SourceHash>,
    ) -> Result<Vec<(Variant, String)>, BuildError> {
        let name = match fp {
            Some(fp) => verbatim_name(source, fp),
            None => {
                let bytes = std::fs::read(source).map_err(|e| BuildError::io(source, e))?;
                let hash = ContentHash::of(&bytes);
                with_source_ext(source, hash.as_str())
            }
        };

        let mut registrations = Vec::new();
        for variant in target.variants() {
            let dir = self.variant_dir(*variant);
            std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
            let dest = dir.join(&name);
            std::fs::copy(source, &dest).map_err(|e| BuildError::io(&dest, e))?;
            registrations.push((*variant, name.clone()));
        }
        Ok(registrations)
    }
}

/// Registers compiled artifacts in the file map.
fn register(file_map: &mut FileMap, source: &Path, registrations: Vec<(Variant, String)>) {
    for (variant, name) in registrations {
        file_map.insert(source, variant, OutputRef::new(variant, &name));
    }
}

/// Whether the path has a compilable source extension.
pub(crate) fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTS.contains(&ext))
}

/// Artifact name for a compiled output: the source fingerprint when one
/// is available (that presence is the cache signal on the next run),
/// otherwise the output's content hash.
fn output_name(output: &OutputFile, fp: Option<&SourceHash>) -> String {
    match fp {
        Some(fp) => cached_name(fp),
        None => format!("{}.js", ContentHash::of(output.text.as_bytes())),
    }
}

/// Hash-derived name for a verbatim copy, preserving the extension.
fn verbatim_name(source: &Path, fp: &SourceHash) -> String {
    with_source_ext(source, fp.as_str())
}

fn with_source_ext(source: &Path, stem: &str) -> String {
    match source.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

/// Batch size: `min(max(cores * 2, 4), file_count, 20)`.
fn batch_size(file_count: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    (cores * 2).max(4).min(file_count).min(MAX_BATCH).max(1)
}

/// Attaches the failing source path to a compiler error, preferring the
/// path the error itself names.
fn compile_error(default: &Path, error: CompileError) -> BuildError {
    let path = match &error {
        CompileError::Syntax { path, .. }
        | CompileError::UnresolvedImport { path, .. }
        | CompileError::Io { path, .. } => path.clone(),
        CompileError::Contract { .. } => default.to_path_buf(),
    };
    BuildError::Compile {
        path,
        source: error,
    }
}

/// Enforces the single-entry contract: exactly one output file.
fn expect_single(source: &Path, outputs: Vec<OutputFile>) -> Result<OutputFile, BuildError> {
    let count = outputs.len();
    outputs.into_iter().next().filter(|_| count == 1).ok_or_else(|| {
        compile_error(
            source,
            CompileError::Contract {
                reason: format!("expected 1 output for a single-entry request, got {count}"),
            },
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_compiler::{FnCompiler, PassthroughCompiler};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn write_source(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn dual_target_produces_both_variants() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("routes");
        std::fs::create_dir_all(&src_dir).unwrap();
        let source = write_source(
            &src_dir,
            "index.tsx",
            "export function load() { return 1; }\nexport default 2;\n",
        );
        let out = tmp.path().join("dist");

        let compiler = PassthroughCompiler::new();
        let fc = FileCompiler::new(&compiler, &out, &src_dir, BTreeMap::new(), false);

        let mut map = FileMap::new();
        fc.compile_file(&source, Target::Both, &mut map).unwrap();

        let server = map.get(&source, Variant::Server).unwrap();
        let client = map.get(&source, Variant::Client).unwrap();
        assert_eq!(server.dir(), "server");
        assert_eq!(client.dir(), "client");

        let server_text = std::fs::read_to_string(out.join(server.as_str())).unwrap();
        let client_text = std::fs::read_to_string(out.join(client.as_str())).unwrap();
        assert!(server_text.contains("load"));
        assert!(!client_text.contains("load"), "client variant must be stripped");
    }

    #[test]
    fn cache_hit_skips_compiler() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("routes");
        std::fs::create_dir_all(&src_dir).unwrap();
        let source = write_source(&src_dir, "index.tsx", "export default 1;\n");
        let out = tmp.path().join("dist");

        let calls = AtomicUsize::new(0);
        let counting = FnCompiler::new(|_req: &CompileRequest| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![OutputFile {
                path: "index.js".to_string(),
                text: "export default 1;\n".to_string(),
            }])
        });

        let fc = FileCompiler::new(&counting, &out, &src_dir, BTreeMap::new(), true);

        let mut map = FileMap::new();
        fc.compile_file(&source, Target::Both, &mut map).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2, "one invocation per variant");

        let mut second = FileMap::new();
        fc.compile_file(&source, Target::Both, &mut second).unwrap();
        assert_eq!(
            calls.load(Ordering::SeqCst),
            2,
            "unchanged fingerprint must not reinvoke the compiler"
        );
        assert_eq!(
            map.get(&source, Variant::Server),
            second.get(&source, Variant::Server)
        );
    }

    #[test]
    fn partial_cache_recompiles_all_variants() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("routes");
        std::fs::create_dir_all(&src_dir).unwrap();
        let source = write_source(&src_dir, "index.tsx", "export default 1;\n");
        let out = tmp.path().join("dist");

        let compiler = PassthroughCompiler::new();
        let fc = FileCompiler::new(&compiler, &out, &src_dir, BTreeMap::new(), true);

        let mut map = FileMap::new();
        fc.compile_file(&source, Target::Both, &mut map).unwrap();

        // Drop the client artifact: the next run must treat this as a
        // full miss, not register a stale half.
        let client = map.get(&source, Variant::Client).unwrap().clone();
        std::fs::remove_file(out.join(client.as_str())).unwrap();

        let mut second = FileMap::new();
        fc.compile_file(&source, Target::Both, &mut second).unwrap();
        assert!(out
            .join(second.get(&source, Variant::Client).unwrap().as_str())
            .is_file());
    }

    #[test]
    fn non_source_file_copied_with_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("routes");
        std::fs::create_dir_all(&src_dir).unwrap();
        let source = write_source(&src_dir, "style.css", "body { margin: 0 }");
        let out = tmp.path().join("dist");

        let compiler = PassthroughCompiler::new();
        let fc = FileCompiler::new(&compiler, &out, &src_dir, BTreeMap::new(), false);

        let mut map = FileMap::new();
        fc.compile_file(&source, Target::Server, &mut map).unwrap();

        let server = map.get(&source, Variant::Server).unwrap();
        assert!(server.filename().ends_with(".css"));
        let copied = std::fs::read_to_string(out.join(server.as_str())).unwrap();
        assert_eq!(copied, "body { margin: 0 }");
    }

    #[test]
    fn compile_many_registers_every_source() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("routes");
        std::fs::create_dir_all(&src_dir).unwrap();
        let sources: Vec<PathBuf> = (0..30)
            .map(|i| write_source(&src_dir, &format!("page{i}.tsx"), &format!("export default {i};\n")))
            .collect();
        let out = tmp.path().join("dist");

        let compiler = PassthroughCompiler::new();
        let fc = FileCompiler::new(&compiler, &out, &src_dir, BTreeMap::new(), false);

        let mut map = FileMap::new();
        fc.compile_many(&sources, Target::Both, &mut map).unwrap();
        assert_eq!(map.len(), 60);
    }

    #[test]
    fn compile_error_aborts_with_path_attached() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("routes");
        std::fs::create_dir_all(&src_dir).unwrap();
        let source = write_source(&src_dir, "broken.tsx", "export default (;\n");
        let out = tmp.path().join("dist");

        let failing = FnCompiler::new(|req: &CompileRequest| {
            Err(CompileError::Syntax {
                path: req.entries[0].clone(),
                message: "unexpected token ';'".to_string(),
            })
        });
        let fc = FileCompiler::new(&failing, &out, &src_dir, BTreeMap::new(), false);

        let mut map = FileMap::new();
        let err = fc.compile_file(&source, Target::Server, &mut map).unwrap_err();
        match err {
            BuildError::Compile { path, .. } => assert_eq!(path, source),
            other => panic!("expected Compile error, got {other:?}"),
        }
    }

    #[test]
    fn contract_violation_on_extra_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        let src_dir = tmp.path().join("routes");
        std::fs::create_dir_all(&src_dir).unwrap();
        let source = write_source(&src_dir, "index.tsx", "export default 1;\n");
        let out = tmp.path().join("dist");

        let chatty = FnCompiler::new(|_req: &CompileRequest| {
            Ok(vec![
                OutputFile { path: "a.js".into(), text: "1".into() },
                OutputFile { path: "b.js".into(), text: "2".into() },
            ])
        });
        let fc = FileCompiler::new(&chatty, &out, &src_dir, BTreeMap::new(), false);

        let mut map = FileMap::new();
        let err = fc.compile_file(&source, Target::Server, &mut map).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Compile {
                source: CompileError::Contract { .. },
                ..
            }
        ));
    }

    #[test]
    fn batch_size_bounds() {
        assert_eq!(batch_size(1), 1);
        assert_eq!(batch_size(1000), batch_size(1000).min(20));
        assert!(batch_size(1000) >= 4 || batch_size(1000) == 20);
        assert!(batch_size(3) <= 3);
    }
}
