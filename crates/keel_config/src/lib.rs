//! Loading and validation of `keel.toml` project configuration.

#![warn(missing_docs)]

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::{BuildSettings, ProjectConfig, ProjectMeta};
