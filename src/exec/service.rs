// src/exec/service.rs

//! Pluggable process service abstraction.
//!
//! The executor never creates OS processes itself. It asks a
//! `ProcessService` to start a command and then listens for that
//! invocation's events on the shared event channel the service was built
//! with.
//!
//! - [`LocalProcessService`](super::LocalProcessService) is the production
//!   implementation (`tokio::process`).
//! - Tests provide their own implementation that replays scripted events.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use anyhow::Result;

use super::events::InvocationId;

/// Everything a service needs to start one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub id: InvocationId,
    pub command: String,
    pub working_dir: PathBuf,
}

/// Trait abstracting how commands are started.
///
/// Contract:
/// - `spawn` resolves once the process has been started, or fails if it
///   could not be started. A failed spawn must not emit any events.
/// - After a successful spawn the service sends `StdOut` / `StdErr` chunks
///   followed by exactly one `Exit`, all tagged with `request.id`, on its
///   shared event sender.
pub trait ProcessService: Send + Sync {
    fn spawn(
        &self,
        request: SpawnRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
