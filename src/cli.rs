// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::graph::DotKind;
use crate::plan::default_plan_path;

/// Command-line arguments for `deploydag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "deploydag",
    version,
    about = "Apply the resources of a deployment plan in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the plan file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_plan_path())]
    pub plan: PathBuf,

    /// Apply one resource at a time, overriding `[deploy] parallel`.
    #[arg(long)]
    pub sequential: bool,

    /// Parse + validate, print the order resources would be applied in, but
    /// don't apply anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the resource graph in DOT syntax (`dependency` or `flow`) and exit.
    #[arg(long, value_name = "KIND", value_parser = parse_dot_kind)]
    pub dot: Option<DotKind>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEPLOYDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_dot_kind(s: &str) -> Result<DotKind, String> {
    s.parse()
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
