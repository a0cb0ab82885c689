//! User-configured build hooks.
//!
//! Hooks are shell commands run after route compilation, before the
//! entry module is compiled. A failing hook never fails the build; it
//! becomes a warning in the report.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::BuildWarning;

/// Environment handed to every hook process.
pub struct HookContext<'a> {
    /// Output root, exported as `KEEL_OUT_DIR`.
    pub out_dir: &'a Path,
    /// Static asset root, exported as `KEEL_STATIC_DIR` when configured.
    pub static_dir: Option<&'a Path>,
    /// Exported as `KEEL_PRODUCTION`.
    pub production: bool,
}

/// Runs each hook in order through the platform shell. Returns a warning
/// per hook that failed to spawn or exited nonzero.
pub fn run_hooks(hooks: &[String], ctx: &HookContext<'_>) -> Vec<BuildWarning> {
    let mut warnings = Vec::new();

    for hook in hooks {
        let mut cmd = shell_command(hook);
        cmd.env("KEEL_OUT_DIR", ctx.out_dir)
            .env("KEEL_PRODUCTION", if ctx.production { "1" } else { "0" });
        if let Some(static_dir) = ctx.static_dir {
            cmd.env("KEEL_STATIC_DIR", static_dir);
        } else {
            cmd.env("KEEL_STATIC_DIR", PathBuf::new());
        }

        match cmd.status() {
            Ok(status) if status.success() => {}
            Ok(status) => warnings.push(BuildWarning::Hook {
                command: hook.clone(),
                reason: format!("exited with {status}"),
            }),
            Err(e) => warnings.push(BuildWarning::Hook {
                command: hook.clone(),
                reason: e.to_string(),
            }),
        }
    }
    warnings
}

#[cfg(unix)]
fn shell_command(hook: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(hook);
    cmd
}

#[cfg(windows)]
fn shell_command(hook: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(hook);
    cmd
}
