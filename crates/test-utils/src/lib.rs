pub mod builders;
pub mod fake_service;
pub mod sink;

use std::future::Future;
use std::sync::{Arc, Once};
use std::time::Duration;

use piperun::exec::ExecutorOptions;
use piperun::runner::PipelineRunner;
use tracing_subscriber::{fmt, EnvFilter};

pub use fake_service::{FakeProcessService, Script};
pub use sink::RecordingFailureSink;

static INIT: Once = Once::new();

const TEST_DEADLINE: Duration = Duration::from_secs(5);

/// Install a test-friendly subscriber once per test binary.
///
/// Output goes through the test writer, so it only shows up for failing
/// tests. `RUST_LOG` selects what is recorded (default `info`).
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        // Another harness may have installed a subscriber already.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `fut`, panicking if it takes longer than five seconds.
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    match tokio::time::timeout(TEST_DEADLINE, fut).await {
        Ok(output) => output,
        Err(_) => panic!("test did not finish within {TEST_DEADLINE:?}"),
    }
}

/// A runner on top of a [`FakeProcessService`], reporting failures to a
/// [`RecordingFailureSink`].
///
/// Must be called from within a Tokio runtime.
pub struct FakeRig {
    pub runner: PipelineRunner,
    pub service: FakeProcessService,
    pub failures: RecordingFailureSink,
}

impl FakeRig {
    pub fn new() -> Self {
        Self::with_options(ExecutorOptions::default())
    }

    pub fn with_options(options: ExecutorOptions) -> Self {
        let (service, executor) = FakeProcessService::with_executor(options);
        let failures = RecordingFailureSink::new();
        let runner = PipelineRunner::new(std::env::temp_dir(), executor)
            .with_failure_sink(Arc::new(failures.clone()));

        Self {
            runner,
            service,
            failures,
        }
    }
}

impl Default for FakeRig {
    fn default() -> Self {
        Self::new()
    }
}
