// src/runner/sink.rs

//! Side channel for concurrent-mode failures.

use tracing::error;

use crate::errors::ExecError;
use crate::types::Ordinal;

/// A command that failed while running concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub ordinal: Ordinal,
    pub command: String,
    pub error: ExecError,
}

/// Receives failures that are left out of `concurrently`'s return value.
pub trait FailureSink: Send + Sync {
    fn report(&self, report: &FailureReport);
}

/// Default sink: one `error!` line per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
    fn report(&self, report: &FailureReport) {
        error!(
            ordinal = report.ordinal,
            cmd = %report.command,
            error = %report.error,
            "error in process"
        );
    }
}
