/// file: src/bus.rs
/// description: publish/subscribe registry that routes channel payloads to decoupled consumers
use crate::{
    error::{DashboardError, Result},
    monitoring::HANDLER_FAILURE_COUNTER,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{
    collections::HashMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::{debug, error, trace};

/// Token returned by [`EventBus::subscribe`], used to unsubscribe exactly
/// that registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

pub type Handler = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

/// Result of one delivery pass over the handlers of a single event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<String, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the list for `event`. Handlers fire in
    /// registration order.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) -> Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.subscribers
            .lock()
            .entry(event.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        debug!(event, %id, "Subscribed handler");
        id
    }

    /// Like [`subscribe`](Self::subscribe), but decodes the payload into `T`
    /// first. A payload that does not fit `T` counts as a handler failure.
    pub fn subscribe_typed<T, F>(&self, event: &str, handler: F) -> SubscriptionId
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        self.subscribe(event, move |payload| {
            let value = T::deserialize(payload).map_err(DashboardError::SerdeError)?;
            handler(value);
            Ok(())
        })
    }

    /// Removes the registration `id` under `event`. Returns false when no
    /// such registration exists.
    pub fn unsubscribe(&self, event: &str, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let Some(handlers) = subscribers.get_mut(event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            subscribers.remove(event);
        }
        if removed {
            debug!(event, %id, "Unsubscribed handler");
        }
        removed
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers.lock().get(event).map_or(0, Vec::len)
    }

    /// Delivers `payload` to every handler registered for `event` at the
    /// moment of the call. The handler list is snapshotted and the lock
    /// released before any handler runs, so handlers may subscribe or
    /// unsubscribe freely; such changes apply from the next delivery on.
    pub fn publish(&self, event: &str, payload: &Value) -> Delivery {
        let snapshot: Vec<(SubscriptionId, Handler)> = self
            .subscribers
            .lock()
            .get(event)
            .cloned()
            .unwrap_or_default();

        if snapshot.is_empty() {
            trace!(event, "No subscribers for event");
            return Delivery::default();
        }

        let mut outcome = Delivery::default();
        for (id, handler) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => outcome.delivered += 1,
                Ok(Err(e)) => {
                    outcome.failed += 1;
                    HANDLER_FAILURE_COUNTER.increment(1);
                    error!(event, %id, "Error in listener: {}", e);
                }
                Err(panic) => {
                    outcome.failed += 1;
                    HANDLER_FAILURE_COUNTER.increment(1);
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(event, %id, "Listener panicked: {}", reason);
                }
            }
        }
        outcome
    }
}
