//! Keel CLI — the command-line interface for the Keel build pipeline.
//!
//! Provides `keel init` for project scaffolding and `keel build` for
//! running the production build over the project's `keel.toml`.

#![warn(missing_docs)]

mod build;
mod init;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Keel — a production build pipeline for web projects.
#[derive(Parser, Debug)]
#[command(name = "keel", version, about = "Keel build pipeline")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `keel.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new Keel project.
    Init {
        /// Project name (creates a subdirectory). If omitted, initializes
        /// in the current directory.
        name: Option<String>,
    },
    /// Run the production build.
    Build(BuildArgs),
}

/// Arguments for the `keel build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Disable the artifact cache and clear the output directory first.
    #[arg(long)]
    pub no_cache: bool,

    /// Compile the route set as one code-splitting invocation.
    #[arg(long, conflicts_with = "no_split")]
    pub split: bool,

    /// Force per-file compilation even if `keel.toml` enables splitting.
    #[arg(long)]
    pub no_split: bool,

    /// Override the configured output directory.
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<String>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Init { name } => init::run(name),
        Command::Build(ref args) => build::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Rough terminal detection — checks if stdout is a terminal.
fn atty_is_terminal() -> bool {
    // Use a simple heuristic: check the TERM env var.
    // In a real build we'd use the `is-terminal` crate, but this is
    // sufficient for now.
    std::env::var("TERM").is_ok()
}
