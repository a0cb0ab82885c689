//! `keel build` — the production build command.
//!
//! Resolves the project root, loads `keel.toml`, applies flag overrides,
//! and hands the result to the build orchestrator with the bundled
//! passthrough compiler.

use std::path::{Path, PathBuf};

use keel_build::{BuildOptions, BuildOrchestrator};
use keel_compiler::PassthroughCompiler;
use keel_config::ProjectConfig;

use crate::{BuildArgs, GlobalArgs};

/// Runs the `keel build` command.
///
/// Returns exit code 0 on success, 1 on a fatal build error. Warnings
/// are printed but do not affect the exit code.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let config = keel_config::load_config(&project_dir)?;

    if !global.quiet {
        eprintln!("   Building {}", config.project.name);
    }

    let options = build_options(&project_dir, &config, args);

    if global.verbose && !global.quiet {
        eprintln!(
            "    Routes {} (cache {}, splitting {})",
            options.routes_dir.display(),
            if options.cache { "on" } else { "off" },
            if options.splitting { "on" } else { "off" }
        );
        eprintln!("    Output {}", options.out_dir.display());
    }

    let compiler = PassthroughCompiler::new();
    let report = match BuildOrchestrator::new(&compiler, options).run() {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{}", severity_line("error", RED, global.color, &e.to_string()));
            return Ok(1);
        }
    };

    for warning in &report.warnings {
        eprintln!(
            "{}",
            severity_line("warning", YELLOW, global.color, &warning.to_string())
        );
    }

    if !global.quiet {
        eprintln!(
            "     Built {} artifacts, {} routes in {:.2?}",
            report.file_map.len(),
            report.routes.server.len(),
            report.duration
        );
        if global.verbose {
            eprintln!("     Entry {}", report.manifest_entry.as_str());
        }
    }

    Ok(0)
}

const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Formats a `severity: message` line, coloring the severity prefix when
/// colored output is enabled.
fn severity_line(severity: &str, ansi: &str, color: bool, message: &str) -> String {
    if color {
        format!("{ansi}{severity}{RESET}: {message}")
    } else {
        format!("{severity}: {message}")
    }
}

/// Resolves the project root: the `--config` file's directory when given,
/// otherwise the nearest ancestor of the working directory holding a
/// `keel.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// Walks up from `start` looking for a directory containing `keel.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut dir = start;
    loop {
        if dir.join("keel.toml").is_file() {
            return Ok(dir.to_path_buf());
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => {
                return Err("could not find keel.toml in this or any parent directory".into());
            }
        }
    }
}

/// Maps the loaded configuration plus flag overrides to build options,
/// anchoring every configured path at the project root.
fn build_options(project_dir: &Path, config: &ProjectConfig, args: &BuildArgs) -> BuildOptions {
    let out_dir = args.out_dir.as_deref().unwrap_or(&config.build.out_dir);

    BuildOptions {
        entry: project_dir.join(&config.project.entry),
        routes_dir: project_dir.join(&config.build.routes_dir),
        api_dir: config.build.api_dir.as_ref().map(|d| project_dir.join(d)),
        out_dir: project_dir.join(out_dir),
        static_dir: config.build.static_dir.as_ref().map(|d| project_dir.join(d)),
        aliases: config.aliases.clone(),
        cache: config.build.cache && !args.no_cache,
        splitting: (config.build.splitting || args.split) && !args.no_split,
        hooks: config.build.hooks.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn default_args() -> BuildArgs {
        BuildArgs {
            no_cache: false,
            split: false,
            no_split: false,
            out_dir: None,
        }
    }

    fn config_from(toml: &str) -> ProjectConfig {
        keel_config::load_config_from_str(toml).unwrap()
    }

    const MINIMAL: &str = "[project]\nname = \"site\"\nentry = \"src/entry.ts\"\n";

    #[test]
    fn severity_line_colors_only_when_enabled() {
        let plain = severity_line("warning", YELLOW, false, "hook failed");
        assert_eq!(plain, "warning: hook failed");

        let colored = severity_line("warning", YELLOW, true, "hook failed");
        assert!(colored.starts_with("\x1b[33mwarning\x1b[0m: "));
        assert!(colored.ends_with("hook failed"));
    }

    #[test]
    fn find_project_root_walks_up() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keel.toml"), MINIMAL).unwrap();
        let nested = tmp.path().join("routes/blog");
        fs::create_dir_all(&nested).unwrap();

        let root = find_project_root(&nested).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_fails_without_config() {
        let tmp = TempDir::new().unwrap();
        assert!(find_project_root(tmp.path()).is_err());
    }

    #[test]
    fn resolve_project_root_from_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("keel.toml");
        fs::write(&config_path, MINIMAL).unwrap();

        let global = GlobalArgs {
            quiet: false,
            verbose: false,
            color: false,
            config: Some(config_path.to_string_lossy().into_owned()),
        };
        let root = resolve_project_root(&global).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn options_anchor_paths_at_project_root() {
        let tmp = TempDir::new().unwrap();
        let config = config_from(MINIMAL);
        let options = build_options(tmp.path(), &config, &default_args());

        assert_eq!(options.entry, tmp.path().join("src/entry.ts"));
        assert_eq!(options.routes_dir, tmp.path().join("routes"));
        assert_eq!(options.out_dir, tmp.path().join("dist"));
        assert!(options.cache);
        assert!(!options.splitting);
    }

    #[test]
    fn no_cache_flag_overrides_config() {
        let tmp = TempDir::new().unwrap();
        let config = config_from(MINIMAL);
        let mut args = default_args();
        args.no_cache = true;

        let options = build_options(tmp.path(), &config, &args);
        assert!(!options.cache);
    }

    #[test]
    fn split_flags_override_config() {
        let tmp = TempDir::new().unwrap();
        let config = config_from(
            "[project]\nname = \"site\"\nentry = \"src/entry.ts\"\n[build]\nsplitting = true\n",
        );

        let mut args = default_args();
        args.no_split = true;
        let options = build_options(tmp.path(), &config, &args);
        assert!(!options.splitting);

        let config = config_from(MINIMAL);
        let mut args = default_args();
        args.split = true;
        let options = build_options(tmp.path(), &config, &args);
        assert!(options.splitting);
    }

    #[test]
    fn out_dir_flag_overrides_config() {
        let tmp = TempDir::new().unwrap();
        let config = config_from(MINIMAL);
        let mut args = default_args();
        args.out_dir = Some("build-output".to_string());

        let options = build_options(tmp.path(), &config, &args);
        assert_eq!(options.out_dir, tmp.path().join("build-output"));
    }
}
