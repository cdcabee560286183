// src/logging.rs

//! `tracing` subscriber setup for the `piperun` binary.
//!
//! `--log-level` wins when given. Otherwise `PIPERUN_LOG` is read as a full
//! `EnvFilter` directive string (`debug`, `piperun::exec=trace,warn`), and
//! anything missing or unparsable falls back to `info`.
//!
//! Output goes to stderr; stdout carries command output only.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "PIPERUN_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV_VAR).ok();
    let filter = build_filter(cli_level, env.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// Filter for a `--log-level` flag and a `PIPERUN_LOG` value.
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return level_filter(LevelFilter::from(level));
    }

    env.map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| level_filter(LevelFilter::INFO))
}

fn level_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::new(level.to_string())
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}
