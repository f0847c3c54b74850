//! Priority-ordered event dispatch.
//!
//! Listeners are registered per event name with a numeric priority. On
//! dispatch they run one at a time, highest priority first, each awaited to
//! completion before the next one starts. Listeners sharing a priority run
//! in registration order.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{trace, warn};

use crate::Result;
use crate::events::Event;

/// A handler for dispatched events.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Handle an event. Returning an error stops a propagating dispatch.
    async fn handle(&self, event: &mut Event) -> Result<()>;
}

/// Adapter turning a synchronous closure into a [`Listener`].
pub struct FnListener<F>(F);

#[async_trait]
impl<F> Listener for FnListener<F>
where
    F: Fn(&mut Event) -> Result<()> + Send + Sync,
{
    async fn handle(&self, event: &mut Event) -> Result<()> {
        (self.0)(event)
    }
}

/// Wrap a closure as a shareable listener.
pub fn listener_fn<F>(f: F) -> Arc<dyn Listener>
where
    F: Fn(&mut Event) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnListener(f))
}

/// Handle returned by [`Dispatcher::on`], used to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    event: String,
    id: u64,
}

impl Subscription {
    /// The event name this subscription listens to.
    pub fn event(&self) -> &str {
        &self.event
    }
}

struct Entry {
    id: u64,
    priority: i32,
    listener: Arc<dyn Listener>,
}

/// Ordered publish/subscribe bus.
#[derive(Default)]
pub struct Dispatcher {
    listeners: RwLock<HashMap<String, Vec<Entry>>>,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `event` at the given priority.
    pub fn on(
        &self,
        event: impl Into<String>,
        priority: i32,
        listener: Arc<dyn Listener>,
    ) -> Subscription {
        let event = event.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entries = listeners.entry(event.clone()).or_default();
        let position = entries
            .iter()
            .position(|e| e.priority < priority)
            .unwrap_or(entries.len());
        entries.insert(
            position,
            Entry {
                id,
                priority,
                listener,
            },
        );

        trace!(event = %event, priority, "Listener registered");
        Subscription { event, id }
    }

    /// Remove a listener. Returns `false` if it was already removed.
    pub fn off(&self, subscription: &Subscription) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = listeners.get_mut(&subscription.event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != subscription.id);
        before != entries.len()
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Dispatch an event to its listeners in priority order.
    ///
    /// With `propagate_errors`, the first listener error aborts the dispatch
    /// and is returned. Without it, failures are logged and the remaining
    /// listeners still run.
    pub async fn dispatch(&self, event: &mut Event, propagate_errors: bool) -> Result<()> {
        let name = event.name();

        // Snapshot so listeners may subscribe or dispatch re-entrantly.
        let listeners: Vec<Arc<dyn Listener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|entries| entries.iter().map(|e| Arc::clone(&e.listener)).collect())
            .unwrap_or_default();

        trace!(event = name, count = listeners.len(), "Dispatching event");

        for listener in listeners {
            if let Err(err) = listener.handle(event).await {
                if propagate_errors {
                    return Err(err);
                }
                warn!(event = name, error = %err, "Event listener failed");
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect();
        f.debug_struct("Dispatcher")
            .field("listeners", &counts)
            .finish()
    }
}
