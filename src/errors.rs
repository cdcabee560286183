// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ExecError`] is the terminal failure of a single command invocation.
//! - [`PiperunError`] is what the orchestration methods and the config /
//!   CLI layers return.

use std::time::Duration;

use thiserror::Error;

/// Why a single command invocation did not produce a `ProcessResult`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// The process service could not start the command.
    #[error("failed to start process '{command}': {message}")]
    SpawnFailure { command: String, message: String },

    /// The process ran and exited with a nonzero code.
    #[error("process exited with code: {code}")]
    NonZeroExit {
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// The service emitted an event outside `stdOut` / `stdErr` / `exit`.
    #[error("unknown process event: {action}")]
    UnrecognizedEvent { action: String },

    /// The event stream ended before an `exit` event arrived.
    #[error("process event stream closed before exit")]
    StreamClosed,

    #[error("process did not exit within {after:?}")]
    TimedOut { after: Duration },

    /// The task driving the invocation panicked.
    #[error("executor task panicked: {0}")]
    TaskPanicked(String),
}

#[derive(Error, Debug)]
pub enum PiperunError {
    #[error("no commands to run")]
    EmptyPipeline,

    /// A pipe stage failed; `stage` is 1-based.
    #[error("error in process {stage}: {source}")]
    StageFailure {
        stage: usize,
        #[source]
        source: ExecError,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PiperunError>;
