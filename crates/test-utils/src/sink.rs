use std::sync::{Arc, Mutex};

use piperun::runner::{FailureReport, FailureSink};

/// Failure sink that keeps every report for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingFailureSink {
    reports: Arc<Mutex<Vec<FailureReport>>>,
}

impl RecordingFailureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports.lock().unwrap().clone()
    }

    pub fn ordinals(&self) -> Vec<usize> {
        let mut ordinals: Vec<_> = self.reports().iter().map(|r| r.ordinal).collect();
        ordinals.sort_unstable();
        ordinals
    }
}

impl FailureSink for RecordingFailureSink {
    fn report(&self, report: &FailureReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}
