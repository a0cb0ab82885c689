//! Configuration types deserialized from `keel.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level project configuration parsed from `keel.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, application entry module).
    pub project: ProjectMeta,
    /// Build settings (directories, caching, splitting, hooks).
    #[serde(default)]
    pub build: BuildSettings,
    /// Import alias table passed through to the compiler
    /// (e.g. `"@" = "src"`).
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Core project metadata required in every `keel.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Path to the single application entry module, relative to the
    /// project root.
    pub entry: String,
}

/// Build settings controlling directories, caching, and splitting.
#[derive(Debug, Deserialize)]
pub struct BuildSettings {
    /// Directory containing page route modules, relative to the project root.
    #[serde(default = "default_routes_dir")]
    pub routes_dir: String,

    /// Optional API route directory. May nest inside `routes_dir` or sit
    /// beside it.
    #[serde(default)]
    pub api_dir: Option<String>,

    /// Output directory for emitted artifacts.
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Optional static asset directory, copied (and gzip-compressed)
    /// into the output root.
    #[serde(default)]
    pub static_dir: Option<String>,

    /// Whether incremental caching is enabled.
    #[serde(default = "default_true")]
    pub cache: bool,

    /// Whether code-splitting is enabled.
    #[serde(default)]
    pub splitting: bool,

    /// Shell commands run as build hooks after route compilation.
    #[serde(default)]
    pub hooks: Vec<String>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            routes_dir: default_routes_dir(),
            api_dir: None,
            out_dir: default_out_dir(),
            static_dir: None,
            cache: true,
            splitting: false,
            hooks: Vec::new(),
        }
    }
}

fn default_routes_dir() -> String {
    "routes".to_string()
}

fn default_out_dir() -> String {
    "dist".to_string()
}

fn default_true() -> bool {
    true
}
