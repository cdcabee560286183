use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, Barrier};
use piperun::exec::{
    CommandExecutor, ExecutorOptions, InvocationId, ProcessAction, ProcessEvent, ProcessService,
    SpawnRequest,
};

/// What a fake process does once spawned.
#[derive(Debug, Clone, Default)]
pub struct Script {
    spawn_error: Option<String>,
    steps: Vec<Step>,
}

#[derive(Debug, Clone)]
enum Step {
    Emit(ProcessAction),
    Sleep(Duration),
    Wait(Arc<Barrier>),
    Hang,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints `out` and exits 0.
    pub fn succeed_with(out: &str) -> Self {
        Self::new().stdout(out).exit(0)
    }

    /// Prints `err` on stderr and exits with `code`.
    pub fn fail_with(code: i32, err: &str) -> Self {
        Self::new().stderr(err).exit(code)
    }

    /// The spawn itself fails with `message`.
    pub fn spawn_error(message: &str) -> Self {
        Self {
            spawn_error: Some(message.to_string()),
            steps: Vec::new(),
        }
    }

    pub fn stdout(mut self, chunk: &str) -> Self {
        self.steps.push(Step::Emit(ProcessAction::StdOut(chunk.to_string())));
        self
    }

    pub fn stderr(mut self, chunk: &str) -> Self {
        self.steps.push(Step::Emit(ProcessAction::StdErr(chunk.to_string())));
        self
    }

    pub fn exit(mut self, code: i32) -> Self {
        self.steps.push(Step::Emit(ProcessAction::Exit(code)));
        self
    }

    /// Emit a raw platform event (`action` tag + payload).
    pub fn raw(mut self, action: &str, data: &str) -> Self {
        self.steps.push(Step::Emit(ProcessAction::from_raw(action, data)));
        self
    }

    pub fn sleep(mut self, dur: Duration) -> Self {
        self.steps.push(Step::Sleep(dur));
        self
    }

    pub fn sleep_ms(self, ms: u64) -> Self {
        self.sleep(Duration::from_millis(ms))
    }

    /// Block until every other script sharing `barrier` has reached it too.
    pub fn rendezvous(mut self, barrier: Arc<Barrier>) -> Self {
        self.steps.push(Step::Wait(barrier));
        self
    }

    /// Never emit anything else (the process never exits).
    pub fn hang(mut self) -> Self {
        self.steps.push(Step::Hang);
        self
    }
}

/// A fake process service that:
/// - records every spawn request (in order)
/// - plays a [`Script`] per command on the shared event channel
///
/// Commands without a script behave like a tiny shell: `echo ...` prints its
/// arguments, `true` / `false` exit 0 / 1, `exit N` exits with `N`, anything
/// else fails to spawn.
#[derive(Clone)]
pub struct FakeProcessService {
    events: mpsc::Sender<ProcessEvent>,
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    spawned: Arc<Mutex<Vec<SpawnRequest>>>,
}

impl FakeProcessService {
    pub fn channel() -> (Self, mpsc::Receiver<ProcessEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let service = Self {
            events: tx,
            scripts: Arc::new(Mutex::new(HashMap::new())),
            spawned: Arc::new(Mutex::new(Vec::new())),
        };
        (service, rx)
    }

    /// Fake service plus an executor wired to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_executor(options: ExecutorOptions) -> (Self, CommandExecutor) {
        let (service, events) = Self::channel();
        let executor = CommandExecutor::new(service.clone(), events, options);
        (service, executor)
    }

    /// Script the behaviour of the exact command line `command`.
    pub fn script(&self, command: &str, script: Script) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(command.to_string(), script);
        self
    }

    /// Command lines of every spawn request so far, in order.
    pub fn spawned(&self) -> Vec<String> {
        self.spawned
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.command.clone())
            .collect()
    }

    pub fn spawn_requests(&self) -> Vec<SpawnRequest> {
        self.spawned.lock().unwrap().clone()
    }

    /// Send an arbitrary event on the shared channel, as if another process
    /// had emitted it.
    pub async fn inject(&self, id: InvocationId, action: ProcessAction) {
        let _ = self.events.send(ProcessEvent::new(id, action)).await;
    }

    fn script_for(&self, command: &str) -> Script {
        if let Some(script) = self.scripts.lock().unwrap().get(command) {
            return script.clone();
        }
        builtin_script(command)
    }
}

fn builtin_script(command: &str) -> Script {
    let trimmed = command.trim();
    let (program, rest) = match trimmed.split_once(' ') {
        Some((program, rest)) => (program, rest.trim()),
        None => (trimmed, ""),
    };

    match program {
        "echo" => Script::succeed_with(&format!("{rest}\n")),
        "true" => Script::new().exit(0),
        "false" => Script::new().exit(1),
        "exit" => match rest.parse::<i32>() {
            Ok(code) => Script::new().exit(code),
            Err(_) => Script::new().exit(2),
        },
        other => Script::spawn_error(&format!("command not found: {other}")),
    }
}

impl ProcessService for FakeProcessService {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let script = self.script_for(&request.command);
        let events = self.events.clone();
        let id = request.id;
        self.spawned.lock().unwrap().push(request);

        Box::pin(async move {
            if let Some(message) = script.spawn_error {
                anyhow::bail!(message);
            }

            tokio::spawn(async move {
                for step in script.steps {
                    match step {
                        Step::Emit(action) => {
                            if events.send(ProcessEvent::new(id, action)).await.is_err() {
                                return;
                            }
                        }
                        Step::Sleep(dur) => tokio::time::sleep(dur).await,
                        Step::Wait(barrier) => {
                            barrier.wait().await;
                        }
                        Step::Hang => std::future::pending::<()>().await,
                    }
                }
            });

            Ok(())
        })
    }
}
