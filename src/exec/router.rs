// src/exec/router.rs

//! Demultiplexer for the shared process event channel.
//!
//! A process service emits the events of every invocation on one
//! `mpsc` channel. The router owns the receiving end and forwards each event
//! to the private channel of the invocation it belongs to, so concurrently
//! running commands never see each other's output.
//!
//! Invocations register through [`EventRouter::subscribe`] *before* asking
//! the service to spawn, which guarantees no event is routed to a missing
//! subscriber because of a race with the spawn.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::events::{InvocationId, ProcessAction, ProcessEvent};

#[derive(Default)]
struct RouteTable {
    routes: HashMap<InvocationId, mpsc::UnboundedSender<ProcessAction>>,
    /// Set once the shared channel is gone; no route will ever be fed again.
    closed: bool,
}

struct RouterInner {
    table: Mutex<RouteTable>,
    next_id: AtomicU64,
}

impl RouterInner {
    fn table(&self) -> MutexGuard<'_, RouteTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheaply cloneable handle to a running router.
#[derive(Clone)]
pub struct EventRouter {
    inner: Arc<RouterInner>,
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("active_routes", &self.active_routes())
            .finish_non_exhaustive()
    }
}

impl EventRouter {
    /// Create a router that has not been attached to any event channel.
    ///
    /// Events are fed in with [`EventRouter::route`]. Most callers want
    /// [`EventRouter::spawn`] instead.
    pub fn detached() -> Self {
        Self {
            inner: Arc::new(RouterInner {
                table: Mutex::new(RouteTable::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Spawn the background routing loop over `events`.
    ///
    /// The loop runs until every sender of the shared channel is gone, then
    /// [closes](EventRouter::close) the router.
    pub fn spawn(mut events: mpsc::Receiver<ProcessEvent>) -> Self {
        let router = Self::detached();
        let handle = router.clone();

        tokio::spawn(async move {
            debug!("event router started");

            while let Some(event) = events.recv().await {
                handle.route(event);
            }

            let orphaned = handle.close();
            info!(orphaned, "event router finished (event channel closed)");
        });

        router
    }

    /// Allocate a fresh invocation id and register a private channel for it.
    pub fn subscribe(&self) -> Subscription {
        let id = InvocationId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();

        let mut table = self.inner.table();
        if table.closed {
            // Dropping `tx` here makes the subscription report a closed
            // stream right away.
            debug!(invocation = %id, "router closed; subscription will see no events");
            drop(tx);
        } else {
            table.routes.insert(id, tx);
        }
        drop(table);

        Subscription {
            id,
            rx,
            router: Arc::clone(&self.inner),
        }
    }

    /// Deliver one event to its invocation.
    ///
    /// Events for unknown (or already finished) invocations are dropped. An
    /// `Exit` event closes the route after delivery.
    pub fn route(&self, event: ProcessEvent) {
        let ProcessEvent { id, action } = event;
        let terminal = action.is_terminal();

        let mut table = self.inner.table();
        let Some(tx) = table.routes.get(&id) else {
            warn!(
                invocation = %id,
                action = action.tag(),
                "dropping process event for unknown invocation"
            );
            return;
        };

        if tx.send(action).is_err() {
            debug!(invocation = %id, "subscriber gone; removing route");
            table.routes.remove(&id);
            return;
        }

        if terminal {
            table.routes.remove(&id);
        }
    }

    /// Stop routing: drop every route so waiting invocations observe a
    /// closed stream instead of hanging. Returns how many routes were open.
    pub fn close(&self) -> usize {
        let mut table = self.inner.table();
        table.closed = true;
        let open = table.routes.len();
        table.routes.clear();
        open
    }

    /// Number of invocations currently waiting for events.
    pub fn active_routes(&self) -> usize {
        self.inner.table().routes.len()
    }
}

/// Private event stream of one invocation.
///
/// Dropping the subscription unregisters it from the router.
pub struct Subscription {
    id: InvocationId,
    rx: mpsc::UnboundedReceiver<ProcessAction>,
    router: Arc<RouterInner>,
}

impl Subscription {
    pub fn id(&self) -> InvocationId {
        self.id
    }

    /// Next action for this invocation, or `None` once the route is closed
    /// and drained.
    pub async fn next(&mut self) -> Option<ProcessAction> {
        self.rx.recv().await
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.router.table().routes.remove(&self.id);
    }
}
