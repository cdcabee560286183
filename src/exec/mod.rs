// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`events`] defines the lifecycle events a process service emits.
//! - [`service`] provides the `ProcessService` trait the executor talks to.
//! - [`router`] demultiplexes the service's shared event channel into one
//!   private stream per invocation.
//! - [`executor`] turns one invocation's stream into a single outcome.
//! - [`local`] is the `tokio::process` backed service used in production.

pub mod events;
pub mod executor;
pub mod local;
pub mod router;
pub mod service;

pub use events::{InvocationId, ProcessAction, ProcessEvent};
pub use executor::{CommandExecutor, ExecutorOptions};
pub use local::LocalProcessService;
pub use router::{EventRouter, Subscription};
pub use service::{ProcessService, SpawnRequest};
