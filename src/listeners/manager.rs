//! Listener manager for broadcasting transitions.

use crate::render::Renderer;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

use super::types::{
    DataSourceEvent, DropReason, Listener, ListenerId, SubscriptionConfig, SubscriptionHandle,
    SubscriptionId, Transition,
};

/// Internal subscription state.
struct Subscription<R: Renderer> {
    config: SubscriptionConfig,
    sender: Sender<DataSourceEvent<R>>,
}

impl<R: Renderer> Subscription<R> {
    /// Try to send an event. Returns false if buffer is full (subscriber will be dropped).
    fn try_send(&self, event: DataSourceEvent<R>) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(_)) => false,
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        }
    }

    fn wants(&self, transition: &Transition<R>) -> bool {
        self.config.include_failures || !transition.is_failure()
    }
}

/// Registered listeners and subscriptions.
///
/// Registration and removal may happen at any time, including from inside a
/// callback. Notification works on a snapshot of the listener list, so a
/// removal takes effect from the next notification on.
pub struct ListenerManager<R: Renderer> {
    /// Callback listeners in registration order.
    listeners: RwLock<Vec<(ListenerId, Arc<dyn Listener<R>>)>>,
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription<R>>>,
    /// Counter for generating listener and subscription IDs.
    next_id: AtomicU64,
}

impl<R: Renderer> ListenerManager<R> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    // --- Callback Listeners ---

    pub fn add_listener(&self, listener: Arc<dyn Listener<R>>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener by id. Returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Remove every registration of this exact listener instance.
    pub fn remove_listener_instance(&self, listener: &Arc<dyn Listener<R>>) -> bool {
        let target = Arc::as_ptr(listener) as *const ();
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(_, existing)| Arc::as_ptr(existing) as *const () != target);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    // --- Subscriptions ---

    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle<R> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        self.subscriptions
            .write()
            .insert(id, Subscription { config, sender });

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            // Best effort
            let _ = sub.sender.try_send(DataSourceEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    // --- Broadcasting ---

    /// Deliver a transition to every listener, then to every subscription.
    ///
    /// A panicking listener is logged and skipped; it does not stop the
    /// remaining listeners or the queue.
    pub fn notify(&self, transition: &Transition<R>) {
        let snapshot: Vec<(ListenerId, Arc<dyn Listener<R>>)> = self.listeners.read().clone();

        for (id, listener) in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener.on_transition(transition)));
            if outcome.is_err() {
                warn!(listener = id.0, ticket = transition.ticket().0, "listener panicked");
            }
        }

        self.broadcast(transition);
    }

    /// Drops subscribers that fail to receive.
    fn broadcast(&self, transition: &Transition<R>) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if sub.wants(transition)
                    && !sub.try_send(DataSourceEvent::Transition(transition.clone()))
                {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    warn!(subscription = id.0, "dropping slow subscriber");
                    let _ = sub.sender.try_send(DataSourceEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl<R: Renderer> Default for ListenerManager<R> {
    fn default() -> Self {
        Self::new()
    }
}
