//! Event bus implementation.
//!
//! Registry layout:
//!
//! ```text
//! "server.session.created" → [Persistent#3, Waiter#7]
//! "server.*"               → [Persistent#1, Once#5]
//! "close"                  → [Persistent#2]
//! ```
//!
//! `dispatch("server.session.created")` runs #3 and settles #7, then runs #1
//! and #5. #5 and #7 are removed before anything runs.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tracing::{debug, error, trace};

use crate::identifiers::SubscriptionId;
use crate::protocol::{Event, names};

use super::subscription::{Handler, Invocation, Subscription, SubscriptionKind};

// ============================================================================
// Registry
// ============================================================================

/// Subscriptions keyed by exact or wildcard event name.
#[derive(Default)]
struct Registry {
    subscriptions: FxHashMap<String, Vec<Subscription>>,
}

impl Registry {
    fn insert(&mut self, event_name: &str, subscription: Subscription) {
        self.subscriptions
            .entry(event_name.to_string())
            .or_default()
            .push(subscription);
    }

    /// Moves one-shot entries out, clones persistent handlers, keeps order.
    fn take_matching(&mut self, key: &str, out: &mut Vec<Invocation>) {
        let Some(list) = self.subscriptions.get_mut(key) else {
            return;
        };

        let mut kept = Vec::with_capacity(list.len());
        for Subscription { id, kind } in list.drain(..) {
            match kind {
                SubscriptionKind::Persistent(handler) => {
                    out.push(Invocation::Handler(id, Arc::clone(&handler)));
                    kept.push(Subscription {
                        id,
                        kind: SubscriptionKind::Persistent(handler),
                    });
                }
                SubscriptionKind::Once(handler) => out.push(Invocation::Handler(id, handler)),
                SubscriptionKind::Waiter(tx) => out.push(Invocation::Waiter(id, tx)),
            }
        }

        if kept.is_empty() {
            self.subscriptions.remove(key);
        } else {
            *list = kept;
        }
    }

    /// Removes matching entries and returns how many were removed.
    fn remove_where(
        &mut self,
        event_name: &str,
        mut predicate: impl FnMut(&Subscription) -> bool,
    ) -> usize {
        let Some(list) = self.subscriptions.get_mut(event_name) else {
            return 0;
        };

        let before = list.len();
        list.retain(|s| !predicate(s));
        let removed = before - list.len();

        if list.is_empty() {
            self.subscriptions.remove(event_name);
        }
        removed
    }
}

// ============================================================================
// EventBus
// ============================================================================

/// Named-event publish/subscribe registry.
///
/// Cloning yields another handle to the same registry.
///
/// # Example
///
/// ```
/// use realtime_client::EventBus;
/// use realtime_client::protocol::Event;
///
/// let bus = EventBus::new();
/// bus.on("server.*", |event| println!("got {}", event.event_type()));
///
/// let event = Event::decode(r#"{"type":"session.created"}"#).unwrap();
/// bus.dispatch("server.session.created", &event);
/// ```
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a persistent handler.
    ///
    /// Handlers for one name run in registration order.
    pub fn on<F>(&self, event_name: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(event_name, SubscriptionKind::Persistent(Arc::new(handler)))
    }

    /// Registers a handler that runs at most once.
    ///
    /// It is removed before it runs, so a dispatch issued from inside the
    /// handler does not reach it again.
    pub fn once<F>(&self, event_name: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(event_name, SubscriptionKind::Once(Arc::new(handler)))
    }

    /// Removes one handler, or every handler for `event_name` if `id` is `None`.
    ///
    /// Pending waiters are not affected. Returns the number of handlers removed.
    pub fn off(&self, event_name: &str, id: Option<SubscriptionId>) -> usize {
        let removed = self.registry.lock().remove_where(event_name, |s| match id {
            Some(id) => s.id == id,
            None => s.is_handler(),
        });
        trace!(event = event_name, removed, "Handlers removed");
        removed
    }

    /// Removes every subscription.
    ///
    /// Pending `wait_for_next` futures resolve to `None`.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut self.registry.lock().subscriptions);
        debug!(names = drained.len(), "Event bus cleared");
    }

    /// Returns the number of subscriptions registered under exactly `event_name`.
    #[must_use]
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.registry
            .lock()
            .subscriptions
            .get(event_name)
            .map_or(0, Vec::len)
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.lock().subscriptions.is_empty()
    }

    /// Delivers `event` to everything registered under `event_name`, then to
    /// everything under its wildcard.
    ///
    /// The matching set is fixed before any handler runs. A panicking handler
    /// is logged and skipped; the rest still run.
    pub fn dispatch(&self, event_name: &str, event: &Event) {
        let mut invocations = Vec::new();
        {
            let mut registry = self.registry.lock();
            registry.take_matching(event_name, &mut invocations);
            if let Some(wildcard) = names::wildcard_for(event_name) {
                registry.take_matching(&wildcard, &mut invocations);
            }
        }

        trace!(
            event = event_name,
            recipients = invocations.len(),
            "Dispatching event"
        );

        for invocation in invocations {
            match invocation {
                Invocation::Handler(id, handler) => Self::invoke(event_name, id, &handler, event),
                Invocation::Waiter(id, tx) => {
                    if tx.send(event.clone()).is_err() {
                        trace!(event = event_name, subscription = %id, "Waiter already gone");
                    }
                }
            }
        }
    }

    /// Waits for the next event dispatched under `event_name`.
    ///
    /// The waiter is registered when this method is called, not when the
    /// returned future is first polled. Resolves to `None` if `timeout`
    /// elapses first or the bus is cleared. With no timeout it waits
    /// indefinitely. Dropping the future removes the waiter.
    pub fn wait_for_next(
        &self,
        event_name: &str,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Option<Event>> + Send + 'static {
        let (tx, mut rx) = oneshot::channel();
        let id = self.register(event_name, SubscriptionKind::Waiter(tx));
        let mut guard = WaiterGuard {
            bus: self.clone(),
            event_name: event_name.to_string(),
            id,
            armed: true,
        };

        async move {
            let outcome = match timeout {
                Some(limit) => tokio::time::timeout(limit, &mut rx).await.ok(),
                None => Some((&mut rx).await),
            };

            let Some(result) = outcome else {
                // Whoever removes the waiter first wins. If dispatch already
                // took it, the event is in flight and belongs to us.
                if guard.disarm() {
                    debug!(event = %guard.event_name, "Wait timed out");
                    return None;
                }
                return rx.await.ok();
            };
            result.ok()
        }
    }

    fn register(&self, event_name: &str, kind: SubscriptionKind) -> SubscriptionId {
        let subscription = Subscription::new(kind);
        let id = subscription.id;
        self.registry.lock().insert(event_name, subscription);
        trace!(event = event_name, subscription = %id, "Subscription registered");
        id
    }

    fn invoke(event_name: &str, id: SubscriptionId, handler: &Handler, event: &Event) {
        if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
            error!(event = event_name, subscription = %id, "Event handler panicked");
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("EventBus")
            .field("names", &registry.subscriptions.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WaiterGuard
// ============================================================================

/// Removes a waiter from the registry when its future ends or is dropped.
struct WaiterGuard {
    bus: EventBus,
    event_name: String,
    id: SubscriptionId,
    armed: bool,
}

impl WaiterGuard {
    /// Removes the waiter. Returns `false` if dispatch took it first.
    fn disarm(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;
        let id = self.id;
        self.bus
            .registry
            .lock()
            .remove_where(&self.event_name, |s| s.id == id)
            > 0
    }
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        self.disarm();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    fn event(event_type: &str) -> Event {
        Event::decode(&json!({ "type": event_type }).to_string()).unwrap()
    }

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Handler) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let make = move |tag: &str| -> Handler {
            let log = Arc::clone(&log_clone);
            let tag = tag.to_string();
            Arc::new(move |_: &Event| log.lock().push(tag.clone()))
        };
        (log, make)
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        for tag in ["h1", "h2", "h3"] {
            let handler = make(tag);
            bus.on("server.ack", move |e| handler(e));
        }

        bus.dispatch("server.ack", &event("ack"));
        bus.dispatch("server.ack", &event("ack"));

        assert_eq!(*log.lock(), ["h1", "h2", "h3", "h1", "h2", "h3"]);
    }

    #[test]
    fn test_exact_handlers_run_before_wildcard() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let wild = make("wild");
        let exact = make("exact");
        bus.on("server.*", move |e| wild(e));
        bus.on("server.ack", move |e| exact(e));

        bus.dispatch("server.ack", &event("ack"));

        assert_eq!(*log.lock(), ["exact", "wild"]);
    }

    #[test]
    fn test_wildcard_does_not_cross_namespaces() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        bus.on("client.*", move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.dispatch("server.ack", &event("ack"));
        bus.dispatch("close", &event("close"));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dispatch_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.dispatch("server.nobody", &event("nobody"));
        assert!(bus.is_empty());
    }

    #[test]
    fn test_once_runs_at_most_once() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        bus.once("server.ack", move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..5 {
            bus.dispatch("server.ack", &event("ack"));
        }

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count("server.ack"), 0);
    }

    #[test]
    fn test_once_not_retriggered_by_reentrant_dispatch() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let inner_bus = bus.clone();
        bus.once("server.ack", move |e| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
            inner_bus.dispatch("server.ack", e);
        });

        bus.dispatch("server.ack", &event("ack"));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_inside_handler_keeps_current_dispatch() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let first = make("first");
        let second = make("second");
        let inner_bus = bus.clone();
        bus.on("server.ack", move |e| {
            first(e);
            inner_bus.off("server.ack", None);
        });
        bus.on("server.ack", move |e| second(e));

        bus.dispatch("server.ack", &event("ack"));
        bus.dispatch("server.ack", &event("ack"));

        assert_eq!(*log.lock(), ["first", "second"]);
    }

    #[test]
    fn test_off_specific_handler() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let a = make("a");
        let b = make("b");
        let id = bus.on("server.ack", move |e| a(e));
        bus.on("server.ack", move |e| b(e));

        assert_eq!(bus.off("server.ack", Some(id)), 1);
        bus.dispatch("server.ack", &event("ack"));

        assert_eq!(*log.lock(), ["b"]);
    }

    #[test]
    fn test_off_without_match_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.off("server.ack", None), 0);
        let id = bus.on("server.other", |_| {});
        assert_eq!(bus.off("server.ack", Some(id)), 0);
        assert_eq!(bus.listener_count("server.other"), 1);
    }

    #[test]
    fn test_panicking_handler_does_not_abort_dispatch() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let after = make("after");
        bus.on("server.ack", |_| panic!("handler failure"));
        bus.on("server.ack", move |e| after(e));

        bus.dispatch("server.ack", &event("ack"));

        assert_eq!(*log.lock(), ["after"]);
    }

    #[test]
    fn test_clear_removes_everything() {
        let bus = EventBus::new();
        bus.on("server.ack", |_| {});
        bus.once("client.*", |_| {});
        bus.clear();
        assert!(bus.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_next_times_out() {
        let bus = EventBus::new();
        let result = bus
            .wait_for_next("server.error", Some(Duration::from_millis(100)))
            .await;

        assert!(result.is_none());
        assert!(bus.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_next_resolves_with_event() {
        let bus = EventBus::new();
        let waiter = bus.wait_for_next("server.error", Some(Duration::from_millis(100)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let sent = event("error");
        bus.dispatch("server.error", &sent);

        assert_eq!(waiter.await, Some(sent));
        assert!(bus.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_after_timeout_is_ignored() {
        let bus = EventBus::new();
        let result = bus
            .wait_for_next("server.error", Some(Duration::from_millis(100)))
            .await;
        assert!(result.is_none());

        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        bus.on("server.error", move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        bus.dispatch("server.error", &event("error"));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count("server.error"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_waiters_are_independent() {
        let bus = EventBus::new();
        let first = bus.wait_for_next("server.ack", None);

        let e1 = Event::decode(r#"{"type":"ack","n":1}"#).unwrap();
        bus.dispatch("server.ack", &e1);

        let second = bus.wait_for_next("server.ack", None);
        let e2 = Event::decode(r#"{"type":"ack","n":2}"#).unwrap();
        bus.dispatch("server.ack", &e2);

        assert_eq!(first.await, Some(e1));
        assert_eq!(second.await, Some(e2));
    }

    #[tokio::test]
    async fn test_one_dispatch_settles_all_earlier_waiters() {
        let bus = EventBus::new();
        let a = bus.wait_for_next("server.ack", None);
        let b = bus.wait_for_next("server.*", None);

        let sent = event("ack");
        bus.dispatch("server.ack", &sent);

        assert_eq!(a.await.as_ref(), Some(&sent));
        assert_eq!(b.await.as_ref(), Some(&sent));
    }

    #[tokio::test]
    async fn test_dropped_waiter_is_removed() {
        let bus = EventBus::new();
        let waiter = bus.wait_for_next("server.ack", None);
        assert_eq!(bus.listener_count("server.ack"), 1);

        drop(waiter);

        assert_eq!(bus.listener_count("server.ack"), 0);
    }

    #[tokio::test]
    async fn test_clear_releases_waiters() {
        let bus = EventBus::new();
        let waiter = bus.wait_for_next("server.ack", None);
        bus.clear();
        assert!(waiter.await.is_none());
    }

    #[tokio::test]
    async fn test_off_leaves_waiters_alone() {
        let bus = EventBus::new();
        let waiter = bus.wait_for_next("server.ack", None);
        bus.on("server.ack", |_| {});

        assert_eq!(bus.off("server.ack", None), 1);
        let sent = event("ack");
        bus.dispatch("server.ack", &sent);

        assert_eq!(waiter.await, Some(sent));
    }
}
