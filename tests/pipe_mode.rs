// tests/pipe_mode.rs

mod common;
use crate::common::{init_tracing, with_timeout, FakeRig, Script};

use std::error::Error;

use piperun::errors::{ExecError, PiperunError};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn three_stage_pipe_joins_trimmed_outputs_in_order() -> TestResult {
    init_tracing();
    let mut rig = FakeRig::new();

    rig.service
        .script("stage-one", Script::succeed_with("  alpha\n"))
        .script("stage-two alpha", Script::succeed_with("beta\n"))
        .script("stage-three beta", Script::succeed_with("gamma\n\n"));

    rig.runner
        .add_command("stage-one")
        .add_command("stage-two")
        .add_command("stage-three");

    let output = with_timeout(rig.runner.pipe()).await?;

    assert_eq!(output.stdout, "alpha\nbeta\ngamma");
    assert_eq!(output.exit_codes, vec![0, 0, 0]);
    assert_eq!(
        rig.service.spawned(),
        vec!["stage-one", "stage-two alpha", "stage-three beta"]
    );
    Ok(())
}

#[tokio::test]
async fn stage_output_is_appended_after_a_single_space() -> TestResult {
    init_tracing();
    let mut rig = FakeRig::new();

    rig.service.script("produce", Script::succeed_with("42\n"));
    rig.runner.add_command("produce").add_command("echo value=");

    let output = with_timeout(rig.runner.pipe()).await?;

    let executed = rig.service.spawned();
    assert_eq!(executed[1], "echo value= 42");
    assert_eq!(rig.runner.results()[1].command, "echo value= 42");
    assert_eq!(output.stdout, "42\nvalue= 42");
    Ok(())
}

#[tokio::test]
async fn templates_are_not_rewritten_by_a_pipe_run() -> TestResult {
    init_tracing();
    let mut rig = FakeRig::new();

    rig.runner.add_command("echo one").add_command("echo two");
    with_timeout(rig.runner.pipe()).await?;

    let templates: Vec<_> = rig.runner.commands().iter().map(|c| c.as_str()).collect();
    assert_eq!(templates, vec!["echo one", "echo two"]);
    assert_eq!(rig.runner.results()[1].command, "echo two one");
    Ok(())
}

#[tokio::test]
async fn upstream_output_is_substituted_verbatim() -> TestResult {
    init_tracing();
    let mut rig = FakeRig::new();

    rig.service
        .script("emit", Script::succeed_with("a; rm -rf / && $(whoami)\n"));
    rig.runner.add_command("emit").add_command("consume");
    rig.service.script(
        "consume a; rm -rf / && $(whoami)",
        Script::succeed_with("ok"),
    );

    with_timeout(rig.runner.pipe()).await?;

    assert_eq!(rig.service.spawned()[1], "consume a; rm -rf / && $(whoami)");
    Ok(())
}

#[tokio::test]
async fn failing_stage_aborts_the_rest_of_the_pipe() -> TestResult {
    init_tracing();
    let mut rig = FakeRig::new();

    rig.service
        .script("second first", Script::fail_with(3, "boom"));
    rig.runner
        .add_command("echo first")
        .add_command("second")
        .add_command("third")
        .add_command("fourth");

    let err = with_timeout(rig.runner.pipe()).await.unwrap_err();

    match err {
        PiperunError::StageFailure {
            stage,
            source: ExecError::NonZeroExit { code, stderr, .. },
        } => {
            assert_eq!(stage, 2);
            assert_eq!(code, 3);
            assert_eq!(stderr, "boom");
        }
        other => panic!("expected StageFailure/NonZeroExit, got {other:?}"),
    }

    // Nothing after the failing stage was started.
    assert_eq!(rig.service.spawned(), vec!["echo first", "second first"]);
    // Stage 1 stays observable through the accumulator.
    assert_eq!(rig.runner.results().len(), 1);
    assert_eq!(rig.runner.results()[0].ordinal, 1);
    Ok(())
}

#[tokio::test]
async fn spawn_failure_in_first_stage_is_reported_as_stage_one() -> TestResult {
    init_tracing();
    let mut rig = FakeRig::new();

    rig.runner.add_command("no-such-binary").add_command("echo never");

    let err = with_timeout(rig.runner.pipe()).await.unwrap_err();

    match &err {
        PiperunError::StageFailure {
            stage: 1,
            source: ExecError::SpawnFailure { command, message },
        } => {
            assert_eq!(command, "no-such-binary");
            assert!(message.contains("command not found"));
        }
        other => panic!("expected stage 1 SpawnFailure, got {other:?}"),
    }
    assert!(err.to_string().starts_with("error in process 1:"));
    assert_eq!(rig.service.spawned(), vec!["no-such-binary"]);
    assert!(rig.runner.results().is_empty());
    Ok(())
}

#[tokio::test]
async fn unrecognized_event_fails_the_stage() -> TestResult {
    init_tracing();
    let mut rig = FakeRig::new();

    rig.service.script(
        "weird",
        Script::new().stdout("partial").raw("progress", "50%").exit(0),
    );
    rig.runner.add_command("weird").add_command("echo after");

    let err = with_timeout(rig.runner.pipe()).await.unwrap_err();

    match err {
        PiperunError::StageFailure {
            stage: 1,
            source: ExecError::UnrecognizedEvent { action },
        } => assert_eq!(action, "progress"),
        other => panic!("expected UnrecognizedEvent, got {other:?}"),
    }
    assert_eq!(rig.service.spawned(), vec!["weird"]);
    Ok(())
}

#[tokio::test]
async fn empty_pipe_fails_without_spawning() -> TestResult {
    init_tracing();
    let mut rig = FakeRig::new();

    let err = rig.runner.pipe().await.unwrap_err();

    assert!(matches!(err, PiperunError::EmptyPipeline));
    assert!(rig.service.spawned().is_empty());
    Ok(())
}

#[tokio::test]
async fn stderr_is_aggregated_per_stage_without_trimming() -> TestResult {
    init_tracing();
    let mut rig = FakeRig::new();

    rig.service
        .script("a", Script::new().stdout("x").stderr("warn a\n").exit(0))
        .script("b x", Script::new().stdout("y").exit(0))
        .script("c y", Script::new().stderr("  indented: c\n").exit(0));
    rig.runner.add_command("a").add_command("b").add_command("c");

    let output = with_timeout(rig.runner.pipe()).await?;

    // Stage b wrote nothing; every stage still gets its own segment.
    assert_eq!(output.stderr, "warn a\n\n\n  indented: c\n");
    assert_eq!(output.exit_codes.len(), 3);
    Ok(())
}

#[tokio::test]
async fn running_the_pipe_twice_appends_to_the_accumulator() -> TestResult {
    init_tracing();
    let mut rig = FakeRig::new();

    rig.runner.add_command("echo hi").add_command("echo there");

    let first = with_timeout(rig.runner.pipe()).await?;
    let second = with_timeout(rig.runner.pipe()).await?;

    assert_eq!(first, second);
    assert_eq!(rig.runner.results().len(), 4);
    Ok(())
}
