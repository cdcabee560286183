// tests/executor.rs

mod common;
use crate::common::{init_tracing, with_timeout, FakeProcessService, Script};

use std::error::Error;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

use piperun::errors::ExecError;
use piperun::exec::{
    CommandExecutor, ExecutorOptions, InvocationId, ProcessAction, ProcessService, SpawnRequest,
};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn exit_zero_yields_a_result_with_accumulated_output() -> TestResult {
    init_tracing();
    let (service, executor) = FakeProcessService::with_executor(ExecutorOptions::default());
    service.script(
        "build",
        Script::new()
            .stdout("compiling ")
            .stderr("warning: x\n")
            .stdout("done\n")
            .exit(0),
    );

    let result = with_timeout(executor.execute(7, "build".to_string(), Path::new("/srv"))).await?;

    assert_eq!(result.ordinal, 7);
    assert_eq!(result.command, "build");
    assert_eq!(result.stdout, "compiling done\n");
    assert_eq!(result.stderr, "warning: x\n");
    assert_eq!(result.exit_code, 0);
    Ok(())
}

#[tokio::test]
async fn spawn_request_carries_the_working_directory() -> TestResult {
    init_tracing();
    let (service, executor) = FakeProcessService::with_executor(ExecutorOptions::default());

    with_timeout(executor.execute(1, "echo hi".to_string(), Path::new("/work/dir"))).await?;

    let requests = service.spawn_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].working_dir, Path::new("/work/dir"));
    assert_eq!(requests[0].command, "echo hi");
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_keeps_partial_output() -> TestResult {
    init_tracing();
    let (service, executor) = FakeProcessService::with_executor(ExecutorOptions::default());
    service.script(
        "test",
        Script::new().stdout("3 passed").stderr("1 failed").exit(101),
    );

    let err = with_timeout(executor.execute(1, "test".to_string(), Path::new(".")))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExecError::NonZeroExit {
            code: 101,
            stdout: "3 passed".to_string(),
            stderr: "1 failed".to_string(),
        }
    );
    assert_eq!(err.to_string(), "process exited with code: 101");
    Ok(())
}

#[tokio::test]
async fn unknown_action_tag_is_a_protocol_violation() -> TestResult {
    init_tracing();
    let (service, executor) = FakeProcessService::with_executor(ExecutorOptions::default());
    service.script("odd", Script::new().raw("heartbeat", "").exit(0));

    let err = with_timeout(executor.execute(1, "odd".to_string(), Path::new(".")))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExecError::UnrecognizedEvent {
            action: "heartbeat".to_string()
        }
    );
    Ok(())
}

#[tokio::test]
async fn exit_with_non_numeric_payload_is_unrecognized() -> TestResult {
    init_tracing();
    let (service, executor) = FakeProcessService::with_executor(ExecutorOptions::default());
    service.script("garbled", Script::new().raw("exit", "zero"));

    let err = with_timeout(executor.execute(1, "garbled".to_string(), Path::new(".")))
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::UnrecognizedEvent { ref action } if action == "exit"));
    Ok(())
}

#[tokio::test]
async fn raw_platform_tags_map_to_output_and_exit() -> TestResult {
    init_tracing();
    let (service, executor) = FakeProcessService::with_executor(ExecutorOptions::default());
    service.script(
        "raw",
        Script::new()
            .raw("stdOut", "out")
            .raw("stdErr", "err")
            .raw("exit", "0"),
    );

    let result = with_timeout(executor.execute(1, "raw".to_string(), Path::new("."))).await?;

    assert_eq!(result.stdout, "out");
    assert_eq!(result.stderr, "err");
    Ok(())
}

#[tokio::test]
async fn spawn_failure_is_reported_before_any_event() -> TestResult {
    init_tracing();
    let (service, executor) = FakeProcessService::with_executor(ExecutorOptions::default());
    service.script("locked", Script::spawn_error("permission denied"));

    let err = with_timeout(executor.execute(1, "locked".to_string(), Path::new(".")))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExecError::SpawnFailure {
            command: "locked".to_string(),
            message: "permission denied".to_string(),
        }
    );
    assert_eq!(executor.router().active_routes(), 0);
    Ok(())
}

#[tokio::test]
async fn timeout_stops_waiting_for_a_hung_process() -> TestResult {
    init_tracing();
    let options = ExecutorOptions {
        timeout: Some(Duration::from_millis(50)),
    };
    let (service, executor) = FakeProcessService::with_executor(options);
    service.script("daemon", Script::new().stdout("listening").hang());

    let err = with_timeout(executor.execute(1, "daemon".to_string(), Path::new(".")))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExecError::TimedOut {
            after: Duration::from_millis(50)
        }
    );
    assert_eq!(executor.router().active_routes(), 0);
    Ok(())
}

#[tokio::test]
async fn routes_are_released_after_each_invocation() -> TestResult {
    init_tracing();
    let (_service, executor) = FakeProcessService::with_executor(ExecutorOptions::default());

    for ordinal in 1..=3 {
        with_timeout(executor.execute(ordinal, format!("echo {ordinal}"), Path::new("."))).await?;
    }
    let _ = with_timeout(executor.execute(4, "false".to_string(), Path::new("."))).await;

    assert_eq!(executor.router().active_routes(), 0);
    Ok(())
}

#[tokio::test]
async fn stray_events_on_the_shared_channel_are_ignored() -> TestResult {
    init_tracing();
    let (service, executor) = FakeProcessService::with_executor(ExecutorOptions::default());
    service.script(
        "slow",
        Script::new().sleep_ms(30).stdout("mine").exit(0),
    );

    let pending = tokio::spawn({
        let executor = executor.clone();
        async move { executor.execute(1, "slow".to_string(), Path::new(".")).await }
    });

    tokio::time::sleep(Duration::from_millis(5)).await;
    service
        .inject(InvocationId::new(u64::MAX), ProcessAction::StdOut("stray".into()))
        .await;
    service
        .inject(InvocationId::new(u64::MAX), ProcessAction::Exit(1))
        .await;

    let result = with_timeout(pending).await??;
    assert_eq!(result.stdout, "mine");
    assert_eq!(result.exit_code, 0);
    Ok(())
}

/// Accepts every spawn and never emits anything.
struct SilentService;

impl ProcessService for SilentService {
    fn spawn(
        &self,
        _request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}

#[tokio::test]
async fn closed_event_channel_surfaces_as_stream_closed() -> TestResult {
    init_tracing();
    let (tx, rx) = mpsc::channel(1);
    let executor = CommandExecutor::new(SilentService, rx, ExecutorOptions::default());

    let pending = tokio::spawn({
        let executor = executor.clone();
        async move {
            executor
                .execute(1, "anything".to_string(), Path::new("."))
                .await
        }
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(tx);

    let err = with_timeout(pending).await?.unwrap_err();
    assert_eq!(err, ExecError::StreamClosed);

    // Invocations started after the channel closed fail right away.
    let err = with_timeout(executor.execute(2, "later".to_string(), Path::new(".")))
        .await
        .unwrap_err();
    assert_eq!(err, ExecError::StreamClosed);
    Ok(())
}
