#![allow(dead_code)]

pub use piperun_test_utils::builders;
pub use piperun_test_utils::{
    init_tracing, with_timeout, FakeProcessService, FakeRig, RecordingFailureSink, Script,
};

use piperun::types::ProcessResult;

/// Ordinals of `results`, sorted; concurrent results arrive in no fixed order.
pub fn ordinals(results: &[ProcessResult]) -> Vec<usize> {
    let mut ordinals: Vec<_> = results.iter().map(|r| r.ordinal).collect();
    ordinals.sort_unstable();
    ordinals
}
