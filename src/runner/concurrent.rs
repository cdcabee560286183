// src/runner/concurrent.rs

//! Concurrent mode.
//!
//! Every command runs in its own Tokio task. The runner waits until each one
//! has settled, successes are accumulated, failures are reported to the
//! runner's [`FailureSink`](super::FailureSink). A failing command never
//! affects its siblings.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::{ExecError, PiperunError, Result};
use crate::types::{Ordinal, ProcessResult};

use super::{FailureReport, PipelineRunner};

/// Final state of one concurrently executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub ordinal: Ordinal,
    pub command: String,
    pub outcome: std::result::Result<ProcessResult, ExecError>,
}

impl Settlement {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

impl PipelineRunner {
    /// Run every command at once and return the successful results, in the
    /// order they settled.
    ///
    /// Failed commands are absent from the returned list; they are only
    /// visible through the failure sink. Use the `ordinal` of each result to
    /// correlate it with the submitted commands.
    pub async fn concurrently(&mut self) -> Result<Vec<ProcessResult>> {
        let settlements = self.settle_all().await?;
        Ok(settlements
            .into_iter()
            .filter_map(|s| s.outcome.ok())
            .collect())
    }

    /// Same execution as [`PipelineRunner::concurrently`], but returns one
    /// [`Settlement`] per submitted command, sorted by ordinal.
    pub async fn concurrently_settled(&mut self) -> Result<Vec<Settlement>> {
        let mut settlements = self.settle_all().await?;
        settlements.sort_by_key(|s| s.ordinal);
        Ok(settlements)
    }

    /// Launch everything, wait for all to settle, record the outcomes.
    ///
    /// Returned in arrival order.
    async fn settle_all(&mut self) -> Result<Vec<Settlement>> {
        if self.commands.is_empty() {
            return Err(PiperunError::EmptyPipeline);
        }

        let total = self.commands.len();
        info!(
            commands = total,
            working_dir = %self.working_dir.display(),
            "starting concurrent run"
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<Settlement>();
        let mut handles: HashMap<Ordinal, (String, JoinHandle<()>)> = HashMap::with_capacity(total);

        for (index, template) in self.commands.iter().enumerate() {
            let ordinal = index + 1;
            let command = template.resolve(None);

            let executor = self.executor.clone();
            let working_dir = self.working_dir.clone();
            let tx = tx.clone();
            let task_command = command.clone();

            let handle = tokio::spawn(async move {
                let outcome = executor
                    .execute(ordinal, task_command.clone(), &working_dir)
                    .await;
                let _ = tx.send(Settlement {
                    ordinal,
                    command: task_command,
                    outcome,
                });
            });

            handles.insert(ordinal, (command, handle));
        }

        // Only the spawned tasks hold senders now; the loop ends once every
        // task has either reported or died.
        drop(tx);

        let mut settlements = Vec::with_capacity(total);
        while let Some(settlement) = rx.recv().await {
            debug!(
                ordinal = settlement.ordinal,
                success = settlement.is_success(),
                "command settled"
            );
            handles.remove(&settlement.ordinal);
            settlements.push(settlement);
        }

        let mut silent: Vec<_> = handles.into_iter().collect();
        silent.sort_by_key(|(ordinal, _)| *ordinal);
        for (ordinal, (command, handle)) in silent {
            let message = match handle.await {
                Err(e) => e.to_string(),
                Ok(()) => "task finished without reporting an outcome".to_string(),
            };
            settlements.push(Settlement {
                ordinal,
                command,
                outcome: Err(ExecError::TaskPanicked(message)),
            });
        }

        for settlement in &settlements {
            match &settlement.outcome {
                Ok(result) => self.results.push(result.clone()),
                Err(error) => self.failure_sink.report(&FailureReport {
                    ordinal: settlement.ordinal,
                    command: settlement.command.clone(),
                    error: error.clone(),
                }),
            }
        }

        let succeeded = settlements.iter().filter(|s| s.is_success()).count();
        info!(
            succeeded,
            failed = total - succeeded,
            "concurrent run finished"
        );

        Ok(settlements)
    }
}
