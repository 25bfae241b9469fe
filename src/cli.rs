// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `recalc-scheduler`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "recalc-scheduler",
    version,
    about = "Replay edits and engine notifications through the recalculation scheduler.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Recalc.toml` in the current working directory. A missing
    /// file means default timings.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Replay script (TOML) of timed commands and notifications.
    #[arg(long, value_name = "PATH", required_unless_present = "dry_run")]
    pub script: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RECALC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the effective configuration, replay nothing.
    #[arg(long)]
    pub dry_run: bool,
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

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
