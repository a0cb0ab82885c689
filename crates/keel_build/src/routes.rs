//! Derivation of logical route → artifact JSON tables.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use keel_common::{FileMap, Variant};

use crate::error::BuildError;

/// Separate route tables for the two targets, ordered for determinism.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RouteMaps {
    /// Logical route → server artifact.
    pub server: BTreeMap<String, String>,
    /// Logical route → client artifact.
    pub client: BTreeMap<String, String>,
}

/// Derives route tables from the run's FileMap.
pub struct RouteMapGenerator<'a> {
    routes_root: &'a Path,
    api_root: Option<&'a Path>,
}

impl<'a> RouteMapGenerator<'a> {
    /// Creates a generator. The API root may nest inside the routes root
    /// or sit beside it.
    pub fn new(routes_root: &'a Path, api_root: Option<&'a Path>) -> Self {
        Self {
            routes_root,
            api_root,
        }
    }

    /// Classifies every non-client-tagged FileMap key and derives its
    /// logical route.
    ///
    /// API classification wins over page classification so a nested API
    /// root is not double-counted. Sources outside both roots (such as
    /// the application entry module) produce no route. The client table
    /// gets the client-variant companion where one was compiled.
    pub fn generate(&self, file_map: &FileMap) -> RouteMaps {
        let mut maps = RouteMaps::default();

        for (key, output) in file_map.iter() {
            if key.client_variant {
                continue;
            }

            let route = match self.classify(&key.source) {
                Some(route) => route,
                None => continue,
            };

            maps.server
                .insert(route.clone(), output.as_str().to_string());
            if let Some(client) = file_map.get(&key.source, Variant::Client) {
                maps.client.insert(route, client.as_str().to_string());
            }
        }
        maps
    }

    /// Writes `server.json` and `client.json` under the output root.
    pub fn write(&self, maps: &RouteMaps, out_dir: &Path) -> Result<(), BuildError> {
        for (name, table) in [("server.json", &maps.server), ("client.json", &maps.client)] {
            let json = serde_json::to_string_pretty(table).map_err(|e| {
                BuildError::Serialization {
                    reason: e.to_string(),
                }
            })?;
            let path = out_dir.join(name);
            std::fs::write(&path, json).map_err(|e| BuildError::io(&path, e))?;
        }
        Ok(())
    }

    /// Derives the logical route for a source, or `None` if the source
    /// lives outside both roots.
    fn classify(&self, source: &Path) -> Option<String> {
        if let Some(api) = self.api_root {
            if let Ok(rel) = source.strip_prefix(api) {
                let prefix = self.api_prefix(api);
                return Some(route_path(&prefix, rel));
            }
        }
        let rel = source.strip_prefix(self.routes_root).ok()?;
        Some(route_path("", rel))
    }

    /// The URL prefix contributed by the API root: its path relative to
    /// the routes root when nested, otherwise its directory name.
    fn api_prefix(&self, api: &Path) -> String {
        match api.strip_prefix(self.routes_root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => api
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

/// Maps a root-relative source path to its logical route.
///
/// The extension is stripped; an `index` basename collapses to the parent
/// path with a trailing slash (the root index becomes `/`). Reserved
/// basenames with a leading underscore pass through verbatim.
fn route_path(prefix: &str, rel: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !prefix.is_empty() {
        parts.extend(prefix.split('/').map(str::to_string));
    }
    for component in rel.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_string_lossy().into_owned());
        }
    }

    if let Some(last) = parts.last_mut() {
        if let Some(dot) = last.rfind('.') {
            last.truncate(dot);
        }
    }

    match parts.last().map(String::as_str) {
        Some("index") => {
            parts.pop();
            format!("/{}", parts.join("/")) + if parts.is_empty() { "" } else { "/" }
        }
        _ => format!("/{}", parts.join("/")),
    }
}
