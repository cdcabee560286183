// src/runner/mod.rs

//! Pipeline runner.
//!
//! A [`PipelineRunner`] owns an ordered list of commands, a working directory
//! and the results accumulated while running them. It can be driven in two
//! ways:
//!
//! - [`PipelineRunner::pipe`] (see [`pipe`]): one command at a time, each
//!   command receiving the previous command's trimmed stdout as a trailing
//!   argument. Fails fast.
//! - [`PipelineRunner::concurrently`] (see [`concurrent`]): everything at
//!   once, waiting for all commands to settle. Failures go to a
//!   [`FailureSink`] instead of aborting siblings.
//!
//! Running a runner more than once re-runs the same command templates and
//! keeps appending to the accumulated results.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exec::{CommandExecutor, ExecutorOptions};
use crate::types::{CommandTemplate, ProcessResult};

pub mod concurrent;
pub mod pipe;
pub mod sink;

pub use concurrent::Settlement;
pub use sink::{FailureReport, FailureSink, TracingFailureSink};

pub struct PipelineRunner {
    working_dir: PathBuf,
    commands: Vec<CommandTemplate>,
    results: Vec<ProcessResult>,
    executor: CommandExecutor,
    failure_sink: Arc<dyn FailureSink>,
}

impl fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("working_dir", &self.working_dir)
            .field("commands", &self.commands)
            .field("results", &self.results.len())
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl PipelineRunner {
    /// Create a runner that executes every command in `working_dir`.
    pub fn new(working_dir: impl Into<PathBuf>, executor: CommandExecutor) -> Self {
        Self {
            working_dir: working_dir.into(),
            commands: Vec::new(),
            results: Vec::new(),
            executor,
            failure_sink: Arc::new(TracingFailureSink),
        }
    }

    /// Runner backed by real OS processes.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn local(working_dir: impl Into<PathBuf>, options: ExecutorOptions) -> Self {
        Self::new(working_dir, CommandExecutor::local(options))
    }

    /// Replace the side channel that receives concurrent-mode failures.
    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failure_sink = sink;
        self
    }

    /// Append a command. Accepts a full command line or a token sequence;
    /// tokens are joined with single spaces.
    pub fn add_command(&mut self, command: impl Into<CommandTemplate>) -> &mut Self {
        self.commands.push(command.into());
        self
    }

    pub fn commands(&self) -> &[CommandTemplate] {
        &self.commands
    }

    /// Results accumulated so far, in completion order.
    pub fn results(&self) -> &[ProcessResult] {
        &self.results
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Hand the accumulated results to `callback`, then return the runner for
    /// further chaining.
    pub fn finalize<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnOnce(&[ProcessResult]),
    {
        self.finalize_opt(Some(callback))
    }

    /// Like [`PipelineRunner::finalize`], but a `None` callback is a no-op.
    pub fn finalize_opt<F>(&mut self, callback: Option<F>) -> &mut Self
    where
        F: FnOnce(&[ProcessResult]),
    {
        if let Some(callback) = callback {
            callback(&self.results);
        }
        self
    }
}
