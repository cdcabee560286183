// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod runner;
pub mod types;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_and_validate, parse_duration};
use crate::exec::ExecutorOptions;
use crate::runner::PipelineRunner;
use crate::types::{CommandTemplate, RunMode};

pub use crate::errors::{ExecError, PiperunError};
pub use crate::runner::{FailureReport, FailureSink, Settlement};
pub use crate::types::{Ordinal, PipeOutput, ProcessResult};

/// Everything needed to build and drive a runner, after merging CLI flags
/// over the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub working_dir: PathBuf,
    pub mode: RunMode,
    pub timeout: Option<Duration>,
    pub commands: Vec<CommandTemplate>,
}

impl RunPlan {
    /// Resolve the plan for `args`.
    ///
    /// - Commands given on the command line replace the config file's
    ///   commands; the config file is then only read if `--config` is set.
    /// - Working directory: `--cwd`, else `[runner].working_dir` relative to
    ///   the config file, else the config file's directory, else the current
    ///   directory.
    pub fn resolve(args: &CliArgs) -> Result<Self> {
        let config_path = match (&args.config, args.commands.is_empty()) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => Some(default_config_path()),
            (None, false) => None,
        };

        let cfg = match &config_path {
            Some(path) => Some(
                load_and_validate(path)
                    .with_context(|| format!("loading config {}", path.display()))?,
            ),
            None => None,
        };

        let commands: Vec<CommandTemplate> = if args.commands.is_empty() {
            cfg.as_ref().map(|c| c.commands.clone()).unwrap_or_default()
        } else {
            args.commands.iter().map(CommandTemplate::from).collect()
        };

        if commands.is_empty() {
            bail!("no commands to run");
        }

        let working_dir = resolve_working_dir(args, cfg.as_ref(), config_path.as_deref())?;

        let mode = args
            .mode
            .or(cfg.as_ref().map(|c| c.mode))
            .unwrap_or_default();

        let timeout = match &args.timeout {
            Some(s) => Some(
                parse_duration(s)
                    .map_err(anyhow::Error::msg)
                    .context("parsing --timeout")?,
            ),
            None => cfg.as_ref().and_then(|c| c.timeout),
        };

        Ok(Self {
            working_dir,
            mode,
            timeout,
            commands,
        })
    }
}

fn resolve_working_dir(
    args: &CliArgs,
    cfg: Option<&ConfigFile>,
    config_path: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(dir) = &args.cwd {
        return Ok(dir.clone());
    }

    match (cfg, config_path) {
        (Some(cfg), Some(path)) => {
            let root = config_root_dir(path)?;
            Ok(match &cfg.working_dir {
                Some(dir) if dir.is_absolute() => dir.clone(),
                Some(dir) => root.join(dir),
                None => root,
            })
        }
        _ => std::env::current_dir().context("resolving current directory"),
    }
}

/// Directory containing the config file.
///
/// A bare filename like `Piperun.toml` (empty parent) means the current
/// working directory.
fn config_root_dir(config_path: &Path) -> Result<PathBuf> {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => std::env::current_dir().context("resolving current directory"),
    }
}

/// High-level entry point used by `main.rs`.
///
/// Resolves the plan, runs it with real processes and prints the results to
/// stdout. Fails if the pipe fails or if any concurrent command failed.
pub async fn run(args: CliArgs) -> Result<()> {
    let plan = RunPlan::resolve(&args)?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    let options = ExecutorOptions {
        timeout: plan.timeout,
    };
    let mut runner = PipelineRunner::local(&plan.working_dir, options);
    for cmd in &plan.commands {
        runner.add_command(cmd.clone());
    }

    info!(mode = ?plan.mode, commands = plan.commands.len(), "running");

    let failed = match plan.mode {
        RunMode::Pipe => {
            let output = runner.pipe().await?;
            println!("{}", output.stdout);
            0
        }
        RunMode::Concurrent => {
            let settlements = runner.concurrently_settled().await?;
            for s in &settlements {
                if let Ok(result) = &s.outcome {
                    println!("[{}] {}", result.ordinal, result.command);
                    println!("{}", result.stdout.trim());
                }
            }
            settlements.iter().filter(|s| !s.is_success()).count()
        }
    };

    runner.finalize(|results| debug!(results = results.len(), "run complete"));

    if failed > 0 {
        bail!("{failed} of {} commands failed", plan.commands.len());
    }
    Ok(())
}

fn print_dry_run(plan: &RunPlan) {
    println!("piperun dry-run");
    println!("  mode = {:?}", plan.mode);
    println!("  working_dir = {}", plan.working_dir.display());
    if let Some(timeout) = plan.timeout {
        println!("  timeout = {timeout:?}");
    }
    println!();

    println!("commands ({}):", plan.commands.len());
    for (index, cmd) in plan.commands.iter().enumerate() {
        println!("  {}. {cmd}", index + 1);
    }

    debug!("dry-run complete (no execution)");
}
