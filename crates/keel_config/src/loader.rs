//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Loads and validates a `keel.toml` configuration from a project directory.
///
/// Reads `<project_dir>/keel.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join("keel.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `keel.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.entry.is_empty() {
        return Err(ConfigError::MissingField("project.entry".to_string()));
    }
    if config.build.routes_dir.is_empty() {
        return Err(ConfigError::MissingField("build.routes_dir".to_string()));
    }
    if let Some(api_dir) = &config.build.api_dir {
        if api_dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "build.api_dir must not be empty when set".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "site"
entry = "src/entry.ts"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "site");
        assert_eq!(config.project.entry, "src/entry.ts");
        assert_eq!(config.build.routes_dir, "routes");
        assert!(config.build.cache);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "site"
entry = "src/entry.ts"

[build]
routes_dir = "app/routes"
api_dir = "app/routes/api"
out_dir = "build"
static_dir = "public"
cache = false
splitting = true
hooks = ["node scripts/post.js"]

[aliases]
"@" = "src"
"~" = "app"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.build.routes_dir, "app/routes");
        assert_eq!(config.build.api_dir.as_deref(), Some("app/routes/api"));
        assert_eq!(config.build.out_dir, "build");
        assert_eq!(config.build.static_dir.as_deref(), Some("public"));
        assert!(!config.build.cache);
        assert!(config.build.splitting);
        assert_eq!(config.build.hooks.len(), 1);
        assert_eq!(config.aliases["@"], "src");
        assert_eq!(config.aliases["~"], "app");
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
entry = "src/entry.ts"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn missing_entry_errors() {
        let toml = r#"
[project]
name = "site"
entry = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn empty_api_dir_errors() {
        let toml = r#"
[project]
name = "site"
entry = "src/entry.ts"

[build]
api_dir = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
