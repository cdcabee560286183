// src/runner/pipe.rs

//! Sequential pipe mode.

use tracing::{info, warn};

use crate::errors::{PiperunError, Result};
use crate::types::PipeOutput;

use super::PipelineRunner;

impl PipelineRunner {
    /// Run every command in order, appending each stage's trimmed stdout to
    /// the next stage's command line.
    ///
    /// The first failing stage aborts the run with
    /// [`PiperunError::StageFailure`]; later stages are never started.
    pub async fn pipe(&mut self) -> Result<PipeOutput> {
        if self.commands.is_empty() {
            return Err(PiperunError::EmptyPipeline);
        }

        info!(
            stages = self.commands.len(),
            working_dir = %self.working_dir.display(),
            "starting pipe run"
        );

        let first = self.results.len();
        let mut upstream: Option<String> = None;

        for (index, template) in self.commands.iter().enumerate() {
            let stage = index + 1;
            let command = template.resolve(upstream.as_deref());

            let result = self
                .executor
                .execute(stage, command, &self.working_dir)
                .await
                .map_err(|source| {
                    warn!(stage, error = %source, "pipe stage failed; skipping remaining stages");
                    PiperunError::StageFailure { stage, source }
                })?;

            upstream = Some(result.stdout.clone());
            self.results.push(result);
        }

        let output = PipeOutput::from_results(&self.results[first..]);
        info!(exit_codes = ?output.exit_codes, "pipe run finished");
        Ok(output)
    }
}
