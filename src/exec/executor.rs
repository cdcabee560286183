// src/exec/executor.rs

//! Single-command executor.
//!
//! Turns the event stream of one invocation into exactly one terminal
//! outcome: a [`ProcessResult`] on `exit 0`, an [`ExecError`] otherwise.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::ExecError;
use crate::types::{Ordinal, ProcessResult};

use super::events::{ProcessAction, ProcessEvent};
use super::local::LocalProcessService;
use super::router::{EventRouter, Subscription};
use super::service::{ProcessService, SpawnRequest};

/// Knobs applied to every invocation of an executor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Stop waiting for a process after this long. `None` waits forever.
    ///
    /// Timing out does not kill the process.
    pub timeout: Option<Duration>,
}

/// Runs commands through a [`ProcessService`], one invocation at a time per
/// call to [`CommandExecutor::execute`].
///
/// Cloning is cheap; clones share the service and the event router, so they
/// can run invocations from different tasks at once.
#[derive(Clone)]
pub struct CommandExecutor {
    service: Arc<dyn ProcessService>,
    router: EventRouter,
    options: ExecutorOptions,
}

impl fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("router", &self.router)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CommandExecutor {
    /// Build an executor around `service`, routing the service's shared
    /// `events` channel through a freshly spawned [`EventRouter`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<S>(service: S, events: mpsc::Receiver<ProcessEvent>, options: ExecutorOptions) -> Self
    where
        S: ProcessService + 'static,
    {
        Self::with_router(Arc::new(service), EventRouter::spawn(events), options)
    }

    /// Build an executor from an already running router, e.g. to share one
    /// service between several runners.
    pub fn with_router(
        service: Arc<dyn ProcessService>,
        router: EventRouter,
        options: ExecutorOptions,
    ) -> Self {
        Self {
            service,
            router,
            options,
        }
    }

    /// Executor backed by real OS processes.
    pub fn local(options: ExecutorOptions) -> Self {
        let (service, events) = LocalProcessService::channel();
        Self::new(service, events, options)
    }

    pub fn options(&self) -> ExecutorOptions {
        self.options
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Run `command` in `working_dir` and wait for its terminal event.
    pub async fn execute(
        &self,
        ordinal: Ordinal,
        command: String,
        working_dir: &Path,
    ) -> Result<ProcessResult, ExecError> {
        let Some(after) = self.options.timeout else {
            return self.run(ordinal, command, working_dir).await;
        };

        match tokio::time::timeout(after, self.run(ordinal, command, working_dir)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(ordinal, ?after, "process did not exit in time; no longer waiting");
                Err(ExecError::TimedOut { after })
            }
        }
    }

    async fn run(
        &self,
        ordinal: Ordinal,
        command: String,
        working_dir: &Path,
    ) -> Result<ProcessResult, ExecError> {
        // Subscribe first so that events emitted right after the spawn are
        // already routed to us.
        let mut events = self.router.subscribe();
        let id = events.id();

        info!(
            ordinal,
            invocation = %id,
            cmd = %command,
            "starting process"
        );

        let request = SpawnRequest {
            id,
            command: command.clone(),
            working_dir: working_dir.to_path_buf(),
        };

        if let Err(err) = self.service.spawn(request).await {
            warn!(ordinal, invocation = %id, error = %err, "failed to start process");
            return Err(ExecError::SpawnFailure {
                command,
                message: format!("{err:#}"),
            });
        }

        collect_outcome(ordinal, command, &mut events).await
    }
}

async fn collect_outcome(
    ordinal: Ordinal,
    command: String,
    events: &mut Subscription,
) -> Result<ProcessResult, ExecError> {
    let mut stdout = String::new();
    let mut stderr = String::new();

    while let Some(action) = events.next().await {
        match action {
            ProcessAction::StdOut(chunk) => stdout.push_str(&chunk),
            ProcessAction::StdErr(chunk) => stderr.push_str(&chunk),
            ProcessAction::Exit(code) => {
                info!(
                    ordinal,
                    invocation = %events.id(),
                    exit_code = code,
                    success = code == 0,
                    "process exited"
                );

                if code != 0 {
                    return Err(ExecError::NonZeroExit {
                        code,
                        stdout,
                        stderr,
                    });
                }

                return Ok(ProcessResult {
                    ordinal,
                    command,
                    stdout,
                    stderr,
                    exit_code: code,
                });
            }
            ProcessAction::Unrecognized { action, data } => {
                warn!(
                    ordinal,
                    invocation = %events.id(),
                    action = %action,
                    data = %data,
                    "unknown process event"
                );
                return Err(ExecError::UnrecognizedEvent { action });
            }
        }
    }

    debug!(ordinal, invocation = %events.id(), "event stream closed before exit");
    Err(ExecError::StreamClosed)
}
