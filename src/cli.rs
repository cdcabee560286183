// src/cli.rs

//! Command-line interface of the `piperun` binary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::RunMode;

/// Command-line arguments for `piperun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "piperun",
    version,
    about = "Run commands as a pipeline (each output feeds the next) or concurrently.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Piperun.toml` in the current working directory, unless
    /// commands are given on the command line.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// `pipe` or `concurrent`. Overrides `[runner].mode`.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<RunMode>,

    /// Directory the commands run in. Overrides `[runner].working_dir`.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Per-command timeout, e.g. `30s`. Overrides `[runner].timeout`.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Log verbosity. Takes precedence over `PIPERUN_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print what would run, without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Commands to run, in order. Replaces the config file's commands.
    #[arg(value_name = "COMMAND", trailing_var_arg = true)]
    pub commands: Vec<String>,
}

/// Values accepted by `--log-level`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse `std::env::args`, exiting with usage on error.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
