// src/exec/local.rs

//! Process service backed by `tokio::process`.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::events::{InvocationId, ProcessAction, ProcessEvent};
use super::service::{ProcessService, SpawnRequest};

/// Capacity of the shared event channel created by
/// [`LocalProcessService::channel`].
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

const READ_CHUNK: usize = 8 * 1024;

/// Runs commands through the platform shell (`sh -c` / `cmd /C`).
///
/// Output is forwarded chunk by chunk as it is read. `Exit` is sent only
/// after both stdout and stderr reached EOF and the child was reaped, so an
/// executor never misses trailing output.
#[derive(Debug, Clone)]
pub struct LocalProcessService {
    events: mpsc::Sender<ProcessEvent>,
}

impl LocalProcessService {
    pub fn new(events: mpsc::Sender<ProcessEvent>) -> Self {
        Self { events }
    }

    /// Create a service together with the receiving end of its event channel.
    pub fn channel() -> (Self, mpsc::Receiver<ProcessEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (Self::new(tx), rx)
    }
}

impl ProcessService for LocalProcessService {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let events = self.events.clone();

        Box::pin(async move {
            let SpawnRequest {
                id,
                command,
                working_dir,
            } = request;

            let mut cmd = if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(&command);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(&command);
                c
            };

            cmd.current_dir(&working_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let child = cmd.spawn().with_context(|| {
                format!(
                    "spawning '{}' in {}",
                    command,
                    working_dir.display()
                )
            })?;

            debug!(invocation = %id, pid = ?child.id(), "process spawned");
            tokio::spawn(forward_events(id, child, events));

            Ok(())
        })
    }
}

async fn forward_events(id: InvocationId, mut child: Child, events: mpsc::Sender<ProcessEvent>) {
    let stdout = child
        .stdout
        .take()
        .map(|out| tokio::spawn(pump(id, out, events.clone(), ProcessAction::StdOut)));
    let stderr = child
        .stderr
        .take()
        .map(|err| tokio::spawn(pump(id, err, events.clone(), ProcessAction::StdErr)));

    for pump in [stdout, stderr].into_iter().flatten() {
        if let Err(e) = pump.await {
            warn!(invocation = %id, error = %e, "output reader task failed");
        }
    }

    let code = match child.wait().await {
        Ok(status) => status.code().unwrap_or(-1),
        Err(e) => {
            warn!(invocation = %id, error = %e, "failed waiting for process");
            -1
        }
    };

    if events
        .send(ProcessEvent::new(id, ProcessAction::Exit(code)))
        .await
        .is_err()
    {
        debug!(invocation = %id, "event channel closed before exit could be reported");
    }
}

/// Forward everything read from `reader` as events until EOF.
async fn pump<R>(
    id: InvocationId,
    mut reader: R,
    events: mpsc::Sender<ProcessEvent>,
    wrap: fn(String) -> ProcessAction,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(invocation = %id, error = %e, "error reading process output");
                break;
            }
        };

        pending.extend_from_slice(&buf[..n]);
        let chunk = take_utf8(&mut pending);
        if chunk.is_empty() {
            continue;
        }

        if events.send(ProcessEvent::new(id, wrap(chunk))).await.is_err() {
            debug!(invocation = %id, "event channel closed; dropping process output");
            return;
        }
    }

    if !pending.is_empty() {
        let rest = String::from_utf8_lossy(&pending).into_owned();
        if events.send(ProcessEvent::new(id, wrap(rest))).await.is_err() {
            debug!(invocation = %id, "event channel closed; dropping trailing output");
        }
    }
}

/// Take the longest decodable prefix out of `pending`.
///
/// Invalid byte sequences become U+FFFD one at a time, so valid characters
/// around them survive. An incomplete character at the end stays in
/// `pending` until the rest of it arrives.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    let mut consumed = 0;

    loop {
        match std::str::from_utf8(&pending[consumed..]) {
            Ok(valid) => {
                out.push_str(valid);
                consumed = pending.len();
                break;
            }
            Err(e) => {
                let valid_end = consumed + e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[consumed..valid_end]));
                match e.error_len() {
                    Some(bad) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        consumed = valid_end + bad;
                    }
                    None => {
                        consumed = valid_end;
                        break;
                    }
                }
            }
        }
    }

    pending.drain(..consumed);
    out
}
