//! Asynchronous event emitter.
//!
//! Listeners are kept per event name in registration order. [`EventEmitter::emit`]
//! never runs listeners inline: it queues the notification for a dispatch
//! task, so a mutating call always returns before its listeners run.
//! Listeners run once the emitting task yields to the runtime.
//!
//! The dispatch task is spawned on the current Tokio runtime when the
//! emitter is created and stops once every clone of the emitter is dropped.
//! It runs outside the cooperative budget, so a single yield drains the
//! whole backlog. A panicking listener is logged and skipped; the task and
//! the remaining listeners keep running.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chunknet_oracle::binding::{ListenerId, RawListener};
use chunknet_types::abi::{DynSolValue, JsonAbi};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

enum Dispatch {
    Event { name: String, args: Vec<DynSolValue> },
    Flush(oneshot::Sender<()>),
}

#[derive(Default)]
struct Registry {
    listeners: Mutex<HashMap<String, Vec<(ListenerId, RawListener)>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn listeners(&self) -> MutexGuard<'_, HashMap<String, Vec<(ListenerId, RawListener)>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Listeners registered for `event` right now.
    fn snapshot(&self, event: &str) -> Vec<RawListener> {
        self.listeners()
            .get(event)
            .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }
}

/// Per-event listener registry with queued, in-order delivery.
#[derive(Clone)]
pub struct EventEmitter {
    registry: Arc<Registry>,
    queue: mpsc::UnboundedSender<Dispatch>,
    abi: Option<&'static JsonAbi>,
    sequence: Arc<AtomicU64>,
}

impl EventEmitter {
    /// Create an emitter accepting any event name.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> Self {
        Self::spawn(None)
    }

    /// Create an emitter that only emits events declared in `abi`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn for_abi(abi: &'static JsonAbi) -> Self {
        Self::spawn(Some(abi))
    }

    fn spawn(abi: Option<&'static JsonAbi>) -> Self {
        let registry = Arc::new(Registry::default());
        let (queue, rx) = mpsc::unbounded_channel();
        tokio::spawn(tokio::task::unconstrained(dispatch(Arc::downgrade(&registry), rx)));
        Self {
            registry,
            queue,
            abi,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Register `listener` for `event`.
    pub fn on(&self, event: &str, listener: RawListener) -> ListenerId {
        let id = self.registry.next_id.fetch_add(1, Ordering::SeqCst);
        self.registry
            .listeners()
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove the listener `id` from `event`. Other listeners are untouched.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.registry.listeners();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.registry.listeners().get(event).map_or(0, Vec::len)
    }

    /// Queue `event` for delivery to its listeners.
    ///
    /// Returns `false` if the event is not declared in the emitter's ABI or
    /// the dispatch task has stopped.
    pub fn emit(&self, event: &str, args: Vec<DynSolValue>) -> bool {
        if let Some(abi) = self.abi {
            if abi.event(event).is_none() {
                warn!(event, "rejecting undeclared event");
                return false;
            }
        }
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(event, sequence, "event queued");
        let queued = self
            .queue
            .send(Dispatch::Event {
                name: event.to_string(),
                args,
            })
            .is_ok();
        if !queued {
            warn!(event, sequence, "event dispatch stopped, dropping event");
        }
        queued
    }

    /// Number of events queued so far.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Wait until every event queued before this call has been delivered.
    pub async fn flush(&self) {
        let (done, rx) = oneshot::channel();
        if self.queue.send(Dispatch::Flush(done)).is_ok() {
            // Ignore recv errors (dispatch task gone)
            let _ = rx.await;
        }
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

async fn dispatch(registry: Weak<Registry>, mut rx: mpsc::UnboundedReceiver<Dispatch>) {
    while let Some(item) = rx.recv().await {
        match item {
            Dispatch::Flush(done) => {
                let _ = done.send(());
            }
            Dispatch::Event { name, args } => {
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let listeners = registry.snapshot(&name);
                trace!(event = %name, listeners = listeners.len(), "delivering event");
                for (index, listener) in listeners.into_iter().enumerate() {
                    if panic::catch_unwind(AssertUnwindSafe(|| listener(&args))).is_err() {
                        warn!(event = %name, listener = index, "listener panicked");
                    }
                }
            }
        }
    }
    debug!("event dispatch stopped");
}
