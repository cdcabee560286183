// src/exec/events.rs

//! Process lifecycle events as emitted by a [`ProcessService`].
//!
//! [`ProcessService`]: super::ProcessService

use std::fmt;

/// Identity of a single command invocation.
///
/// Every event on the shared event channel carries the id of the invocation
/// it belongs to; the [`EventRouter`](super::EventRouter) uses it to hand the
/// event to the right executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InvocationId(u64);

impl InvocationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happened to a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessAction {
    /// A chunk of standard output.
    StdOut(String),
    /// A chunk of standard error.
    StdErr(String),
    /// The process terminated with this exit code. Terminal.
    Exit(i32),
    /// Anything the executor does not understand.
    Unrecognized { action: String, data: String },
}

impl ProcessAction {
    /// Map a raw platform event (`action` tag + textual payload) to a typed
    /// action.
    ///
    /// An `exit` whose payload is not an integer is reported as
    /// `Unrecognized`.
    pub fn from_raw(action: &str, data: impl Into<String>) -> Self {
        let data = data.into();
        match action {
            "stdOut" => ProcessAction::StdOut(data),
            "stdErr" => ProcessAction::StdErr(data),
            "exit" => match data.trim().parse::<i32>() {
                Ok(code) => ProcessAction::Exit(code),
                Err(_) => ProcessAction::Unrecognized {
                    action: action.to_string(),
                    data,
                },
            },
            other => ProcessAction::Unrecognized {
                action: other.to_string(),
                data,
            },
        }
    }

    /// Raw tag of this action, as the platform would name it.
    pub fn tag(&self) -> &str {
        match self {
            ProcessAction::StdOut(_) => "stdOut",
            ProcessAction::StdErr(_) => "stdErr",
            ProcessAction::Exit(_) => "exit",
            ProcessAction::Unrecognized { action, .. } => action,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessAction::Exit(_))
    }
}

/// An event on the shared process event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEvent {
    pub id: InvocationId,
    pub action: ProcessAction,
}

impl ProcessEvent {
    pub fn new(id: InvocationId, action: ProcessAction) -> Self {
        Self { id, action }
    }
}
