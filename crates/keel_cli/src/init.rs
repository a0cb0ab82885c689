//! `keel init` — project scaffolding command.
//!
//! Creates a new Keel project directory with the standard layout:
//! `routes/`, `src/`, `public/`, and a `keel.toml` config file with a
//! starter route and entry module.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Runs the `keel init` command.
///
/// If `name` is `Some`, creates a new subdirectory with that name.
/// Otherwise initializes in the current working directory.
/// Returns exit code 0 on success.
pub fn run(name: Option<String>) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = match &name {
        Some(n) => {
            let dir = PathBuf::from(n);
            if dir.exists() {
                return Err(format!("directory '{}' already exists", n).into());
            }
            fs::create_dir_all(&dir)?;
            dir
        }
        None => std::env::current_dir()?,
    };

    let project_name = project_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("my-site");

    eprintln!("  Creating new Keel project `{project_name}`");

    create_directories(&project_dir)?;
    write_keel_toml(&project_dir, project_name)?;
    write_starter_files(&project_dir)?;

    for created in ["keel.toml", "routes/index.tsx", "src/entry.ts"] {
        eprintln!("     Created {}", project_dir.join(created).display());
    }

    Ok(0)
}

/// Creates the standard project directories.
fn create_directories(root: &Path) -> io::Result<()> {
    for dir in &["routes", "src", "public"] {
        fs::create_dir_all(root.join(dir))?;
    }
    Ok(())
}

fn write_keel_toml(root: &Path, name: &str) -> io::Result<()> {
    let content = format!(
        r#"[project]
name = "{name}"
entry = "src/entry.ts"

[build]
routes_dir = "routes"
out_dir = "dist"
static_dir = "public"
cache = true
splitting = false

[aliases]
"@" = "src"
"#
    );
    fs::write(root.join("keel.toml"), content)
}

fn write_starter_files(root: &Path) -> io::Result<()> {
    fs::write(
        root.join("routes/index.tsx"),
        "export function load() {\n  return { message: \"hello\" };\n}\n\n\
         export default function Index({ message }) {\n  return message;\n}\n",
    )?;
    fs::write(
        root.join("src/entry.ts"),
        "export default function start() {\n  // application bootstrap\n}\n",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn scaffold_layout_is_loadable() {
        let tmp = TempDir::new().unwrap();
        create_directories(tmp.path()).unwrap();
        write_keel_toml(tmp.path(), "demo").unwrap();
        write_starter_files(tmp.path()).unwrap();

        let config = keel_config::load_config(tmp.path()).unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.build.routes_dir, "routes");
        assert!(tmp.path().join("routes/index.tsx").is_file());
        assert!(tmp.path().join("src/entry.ts").is_file());
        assert!(tmp.path().join("public").is_dir());
    }
}
