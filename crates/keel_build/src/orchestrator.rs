//! End-to-end build orchestration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use keel_common::{FileMap, OutputRef, Target, Variant};
use keel_compiler::Compiler;

use crate::assets;
use crate::error::{BuildError, BuildWarning};
use crate::file_compiler::FileCompiler;
use crate::hooks::{self, HookContext};
use crate::manifest::Manifest;
use crate::rewrite::ImportPathRewriter;
use crate::routes::{RouteMapGenerator, RouteMaps};
use crate::stabilize::StabilizeOutcome;

/// Everything a build run needs, resolved to absolute paths by the caller.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// The single application entry module.
    pub entry: PathBuf,
    /// Directory of route modules. Required; its absence is fatal.
    pub routes_dir: PathBuf,
    /// Directory of API modules, nested inside or beside `routes_dir`.
    pub api_dir: Option<PathBuf>,
    /// Output root.
    pub out_dir: PathBuf,
    /// Static asset root to copy into the output.
    pub static_dir: Option<PathBuf>,
    /// Import alias table handed to the compiler.
    pub aliases: BTreeMap<String, String>,
    /// Whether the fingerprint cache (and output preservation) is on.
    pub cache: bool,
    /// Whether to compile the route set as one splitting invocation.
    pub splitting: bool,
    /// Shell commands run after route compilation.
    pub hooks: Vec<String>,
}

/// What a finished run produced.
#[derive(Debug)]
pub struct BuildReport {
    /// Every source → artifact registration of the run.
    pub file_map: FileMap,
    /// Route tables as written to `server.json` / `client.json`.
    pub routes: RouteMaps,
    /// Non-fatal conditions collected along the way.
    pub warnings: Vec<BuildWarning>,
    /// The compiled entry module's artifact, as recorded in the manifest.
    pub manifest_entry: OutputRef,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Drives the pipeline stages in order over one [`BuildOptions`].
pub struct BuildOrchestrator<'a> {
    compiler: &'a dyn Compiler,
    options: BuildOptions,
}

impl<'a> BuildOrchestrator<'a> {
    /// Creates an orchestrator for one run.
    pub fn new(compiler: &'a dyn Compiler, options: BuildOptions) -> Self {
        Self { compiler, options }
    }

    /// Runs the full pipeline.
    ///
    /// Route-module or entry-module compile failures are fatal and leave
    /// no manifest, so any previous manifest stays authoritative. Asset,
    /// hook, rewrite, and route-table failures are collected as warnings.
    pub fn run(&self) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let opts = &self.options;
        let mut warnings = Vec::new();

        let (route_sources, api_sources) = self.discover_sources()?;

        self.prepare_out_dir()?;

        if let Some(static_dir) = &opts.static_dir {
            warnings.extend(assets::copy_static_assets(static_dir, &opts.out_dir));
        }

        for variant in [Variant::Server, Variant::Client] {
            let dir = opts.out_dir.join(variant.dir());
            std::fs::create_dir_all(&dir).map_err(|e| BuildError::io(&dir, e))?;
        }

        let file_compiler = FileCompiler::new(
            self.compiler,
            &opts.out_dir,
            &opts.routes_dir,
            opts.aliases.clone(),
            opts.cache && !opts.splitting,
        );

        let mut file_map = FileMap::new();
        if opts.splitting {
            self.compile_split(
                &file_compiler,
                &route_sources,
                &api_sources,
                &mut file_map,
                &mut warnings,
            )?;
        } else {
            file_compiler.compile_many(&route_sources, Target::Both, &mut file_map)?;
            file_compiler.compile_many(&api_sources, Target::Server, &mut file_map)?;
        }

        warnings.extend(hooks::run_hooks(
            &opts.hooks,
            &HookContext {
                out_dir: &opts.out_dir,
                static_dir: opts.static_dir.as_deref(),
                production: true,
            },
        ));

        // Entry failure is the one post-compile fatal case.
        file_compiler.compile_file(&opts.entry, Target::Server, &mut file_map)?;
        let manifest_entry = file_map
            .get(&opts.entry, Variant::Server)
            .cloned()
            .ok_or_else(|| BuildError::Config {
                reason: format!("entry module {} produced no artifact", opts.entry.display()),
            })?;

        if !opts.splitting {
            if let Err(e) = ImportPathRewriter::new(&opts.out_dir).rewrite_all(&file_map) {
                warnings.push(BuildWarning::Stage {
                    stage: "import rewrite",
                    reason: e.to_string(),
                });
            }
        }

        let generator = RouteMapGenerator::new(&opts.routes_dir, opts.api_dir.as_deref());
        let routes = generator.generate(&file_map);
        if let Err(e) = generator.write(&routes, &opts.out_dir) {
            warnings.push(BuildWarning::Stage {
                stage: "route tables",
                reason: e.to_string(),
            });
        }

        Manifest::assemble(&manifest_entry, &file_map).write(&opts.out_dir)?;

        Ok(BuildReport {
            file_map,
            routes,
            warnings,
            manifest_entry,
            duration: started.elapsed(),
        })
    }

    /// Clears the output directory on uncached runs; preserves it (as the
    /// cache index) otherwise.
    fn prepare_out_dir(&self) -> Result<(), BuildError> {
        let out = &self.options.out_dir;
        if !self.options.cache && out.exists() {
            std::fs::remove_dir_all(out).map_err(|e| BuildError::io(out, e))?;
        }
        std::fs::create_dir_all(out).map_err(|e| BuildError::io(out, e))
    }

    /// Walks the routes directory (and a disjoint API directory) in sorted
    /// order. A missing routes directory is fatal; a missing configured
    /// API directory simply contributes no sources.
    fn discover_sources(&self) -> Result<(Vec<PathBuf>, Vec<PathBuf>), BuildError> {
        let opts = &self.options;
        if !opts.routes_dir.is_dir() {
            return Err(BuildError::Config {
                reason: format!(
                    "routes directory {} does not exist",
                    opts.routes_dir.display()
                ),
            });
        }

        let mut all = Vec::new();
        walk(&opts.routes_dir, &mut all)?;

        let mut api = Vec::new();
        if let Some(api_dir) = &opts.api_dir {
            if api_dir.starts_with(&opts.routes_dir) {
                // Nested: partition the routes walk instead of re-walking.
                all.retain(|path| {
                    if path.starts_with(api_dir) {
                        api.push(path.clone());
                        false
                    } else {
                        true
                    }
                });
            } else if api_dir.is_dir() {
                walk(api_dir, &mut api)?;
            }
        }

        all.sort();
        api.sort();
        Ok((all, api))
    }

    /// Split mode: one whole-graph invocation per variant. The server
    /// graph includes API modules; the client graph does not.
    fn compile_split(
        &self,
        file_compiler: &FileCompiler<'_>,
        route_sources: &[PathBuf],
        api_sources: &[PathBuf],
        file_map: &mut FileMap,
        warnings: &mut Vec<BuildWarning>,
    ) -> Result<(), BuildError> {
        let mut server_sources = route_sources.to_vec();
        server_sources.extend_from_slice(api_sources);
        server_sources.sort();

        for (variant, sources) in [
            (Variant::Server, server_sources.as_slice()),
            (Variant::Client, route_sources),
        ] {
            if sources.is_empty() {
                continue;
            }
            let outcome = file_compiler.compile_split(sources, variant, file_map)?;
            record_overrun(&outcome, warnings);
        }
        Ok(())
    }
}

fn record_overrun(outcome: &StabilizeOutcome, warnings: &mut Vec<BuildWarning>) {
    if !outcome.converged {
        warnings.push(BuildWarning::StabilizationOverrun {
            rounds: outcome.rounds,
            unresolved: outcome.unresolved,
        });
    }
}

/// Depth-first file collection, skipping dotfiles.
fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), BuildError> {
    let entries = std::fs::read_dir(dir).map_err(|e| BuildError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| BuildError::io(dir, e))?;
        let path = entry.path();
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
        {
            continue;
        }
        if path.is_dir() {
            walk(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
