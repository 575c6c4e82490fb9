//! Subscription records stored in the event bus registry.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::identifiers::SubscriptionId;
use crate::protocol::Event;

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Called synchronously on the dispatching task with a borrowed event.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// How a subscription reacts to a matching dispatch.
pub(crate) enum SubscriptionKind {
    /// Runs on every match until removed.
    Persistent(Handler),
    /// Removed before its first run.
    Once(Handler),
    /// Settles a pending `wait_for_next` with the first match.
    Waiter(oneshot::Sender<Event>),
}

/// One registration under an event name.
pub(crate) struct Subscription {
    pub id: SubscriptionId,
    pub kind: SubscriptionKind,
}

impl Subscription {
    #[inline]
    pub fn new(kind: SubscriptionKind) -> Self {
        Self {
            id: SubscriptionId::next(),
            kind,
        }
    }

    /// Waiters are not handlers and are left alone by `off`.
    #[inline]
    pub fn is_handler(&self) -> bool {
        !matches!(self.kind, SubscriptionKind::Waiter(_))
    }
}

/// Work collected under the registry lock and run after it is released.
pub(crate) enum Invocation {
    Handler(SubscriptionId, Handler),
    Waiter(SubscriptionId, oneshot::Sender<Event>),
}
