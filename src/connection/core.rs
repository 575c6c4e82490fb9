//! Connection lifecycle and event routing.
//!
//! The [`ConnectionManager`] owns at most one transport link at a time and
//! routes every event through its [`EventBus`]:
//!
//! ```text
//!  send(type, payload) ──► envelope ──► transport ──► dispatch client.<type>
//!
//!  transport frame ──► pump task ──► receive(raw) ──► dispatch server.<type>
//!                                        │
//!                                        └─ malformed ──► dispatch error
//!
//!  transport error/close ──► teardown ──► dispatch close { error }
//! ```
//!
//! # States
//!
//! | State | `connect` | `send` | `disconnect` |
//! |-------|-----------|--------|--------------|
//! | `Idle` | opens | `State` error | no-op |
//! | `Connecting` | `State` error | `State` error | no-op |
//! | `Connected` | `State` error | writes | closes, publishes `close` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::bus::EventBus;
use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::protocol::{Event, names};
use crate::transport::{AuthDecorator, Transport, TransportEvent, TransportHandle, TransportLink};

use super::builder::ConnectionBuilder;
use super::credentials;
use super::options::{ConnectOptions, MODEL_PARAM};

// ============================================================================
// Types
// ============================================================================

/// Public view of the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link. Ready to connect.
    Idle,
    /// A `connect` call is waiting for the handshake.
    Connecting,
    /// A link is open.
    Connected,
}

/// The link slot. At most one live link.
enum LinkSlot {
    Idle,
    Connecting,
    Connected {
        /// Distinguishes this link from earlier ones.
        generation: u64,
        handle: Arc<dyn TransportHandle>,
    },
}

/// Internal shared state for the manager.
pub(crate) struct ManagerInner {
    /// Resolved URL, credential included.
    url: Url,

    /// Handshake decoration.
    auth: AuthDecorator,

    /// Log event bodies at `debug` level.
    debug_bodies: bool,

    /// Link factory.
    transport: Arc<dyn Transport>,

    /// Local event routing.
    bus: EventBus,

    /// Current link.
    slot: Mutex<LinkSlot>,

    /// Last generation handed out.
    generation: AtomicU64,
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Owns the transport link and routes events to subscribers.
///
/// Cloning yields another handle to the same connection. The link is closed
/// when the last handle is dropped.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use realtime_client::{ConnectOptions, ConnectionManager};
/// use serde_json::json;
///
/// # async fn example() -> realtime_client::Result<()> {
/// let client = ConnectionManager::builder()
///     .credential("sk-...")
///     .build()?;
///
/// client.on("server.*", |event| println!("<- {}", event.event_type()));
/// client.connect(ConnectOptions::new().model("gpt-4o-realtime-preview")).await?;
///
/// let updated = client.wait_for_next("server.session.updated", Some(Duration::from_secs(5)));
/// client.send("session.update", Some(json!({ "session": { "voice": "alloy" } })))?;
/// updated.await;
///
/// client.disconnect();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    /// Shared inner state.
    pub(crate) inner: Arc<ManagerInner>,
}

// ============================================================================
// ConnectionManager - Display
// ============================================================================

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &credentials::redact(&self.inner.url))
            .field("state", &self.state())
            .field("debug", &self.inner.debug_bodies)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConnectionManager - Construction
// ============================================================================

impl ConnectionManager {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    /// Creates a manager from validated parts.
    pub(crate) fn new(
        url: Url,
        auth: AuthDecorator,
        transport: Arc<dyn Transport>,
        debug_bodies: bool,
    ) -> Self {
        debug!(url = %credentials::redact(&url), debug_bodies, "Connection manager created");

        Self {
            inner: Arc::new(ManagerInner {
                url,
                auth,
                debug_bodies,
                transport,
                bus: EventBus::new(),
                slot: Mutex::new(LinkSlot::Idle),
                generation: AtomicU64::new(0),
            }),
        }
    }
}

// ============================================================================
// ConnectionManager - Lifecycle
// ============================================================================

impl ConnectionManager {
    /// Returns the resolved URL. It carries the credential; do not log it.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        match &*self.inner.slot.lock() {
            LinkSlot::Idle => ConnectionState::Idle,
            LinkSlot::Connecting => ConnectionState::Connecting,
            LinkSlot::Connected { .. } => ConnectionState::Connected,
        }
    }

    /// Returns `true` while a link is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Opens a link and waits for the handshake.
    ///
    /// After this returns `Ok`, link failures are reported only as a `close`
    /// event. Dropping the returned future before it completes abandons the
    /// attempt and returns the manager to `Idle`.
    ///
    /// # Errors
    ///
    /// - [`Error::State`] if already connected or connecting
    /// - [`Error::Connection`] if the transport fails or closes before the
    ///   handshake completes
    pub async fn connect(&self, options: ConnectOptions) -> Result<()> {
        {
            let mut slot = self.inner.slot.lock();
            match *slot {
                LinkSlot::Connected { .. } => return Err(Error::state("already connected")),
                LinkSlot::Connecting => {
                    return Err(Error::state("a connection attempt is already in progress"));
                }
                LinkSlot::Idle => *slot = LinkSlot::Connecting,
            }
        }
        let mut pending = PendingConnect {
            inner: &self.inner,
            armed: true,
        };

        let url = self.inner.connect_url(&options);
        info!(url = %credentials::redact(&url), "Connecting");

        let TransportLink { handle, mut events } = self
            .inner
            .transport
            .open(&url, &self.inner.auth)
            .await
            .map_err(|e| Error::connection(e.to_string()))?;
        let handle: Arc<dyn TransportHandle> = Arc::from(handle);

        let failure = match events.recv().await {
            Some(TransportEvent::Open) => None,
            Some(TransportEvent::Error(message)) => Some(message),
            Some(TransportEvent::Closed) | None => {
                Some("link closed before the handshake completed".to_string())
            }
            Some(TransportEvent::Message(_)) => {
                Some("frame received before the handshake completed".to_string())
            }
        };

        if let Some(message) = failure {
            handle.close();
            warn!(%message, "Connect failed");
            return Err(Error::connection(message));
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        *self.inner.slot.lock() = LinkSlot::Connected { generation, handle };
        pending.disarm();

        tokio::spawn(pump(Arc::downgrade(&self.inner), generation, events));

        info!(generation, "Connected");
        Ok(())
    }

    /// Closes the link and publishes `close` with `error: false`.
    ///
    /// Does nothing when not connected, so calling it twice publishes one
    /// `close` event. Returns nothing: the call cannot fail, and whether a
    /// link existed is observable through [`state`](Self::state) beforehand
    /// or the `close` event.
    pub fn disconnect(&self) {
        let Some(handle) = self.inner.take_link(None) else {
            trace!("Disconnect ignored, not connected");
            return;
        };

        handle.close();
        info!("Disconnected");
        self.inner.publish_close(false);
    }
}

// ============================================================================
// ConnectionManager - Messaging
// ============================================================================

impl ConnectionManager {
    /// Sends one event and dispatches it locally as `client.<type>`.
    ///
    /// `payload` must be a JSON object or `None`. A fresh `event_id` and the
    /// given `type` are stamped on top of its fields.
    ///
    /// # Errors
    ///
    /// - [`Error::State`] if not connected, the type is empty, or the payload
    ///   is not an object
    /// - [`Error::ConnectionClosed`] if the link went away
    pub fn send(&self, event_type: &str, payload: Option<Value>) -> Result<Event> {
        let handle = self
            .inner
            .live_handle()
            .ok_or_else(|| Error::state("not connected"))?;

        let event = Event::envelope(event_type, payload)?;
        handle.send(event.encode()?)?;

        self.inner.log_event("sent", &event);
        self.inner.bus.dispatch(&names::client(event_type), &event);
        Ok(event)
    }

    /// Serializes `payload` and sends it like [`send`](Self::send).
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus [`Error::Json`] if serialization fails.
    pub fn send_json<T>(&self, event_type: &str, payload: &T) -> Result<Event>
    where
        T: Serialize + ?Sized,
    {
        if !self.is_connected() {
            return Err(Error::state("not connected"));
        }
        self.send(event_type, Some(serde_json::to_value(payload)?))
    }

    /// Decodes one inbound frame and dispatches it as `server.<type>`.
    ///
    /// The transport pump calls this for every text frame; it is public so
    /// frames obtained elsewhere can be fed in.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if `raw` is not a JSON object with a non-empty
    /// string `type`. Nothing is dispatched in that case.
    pub fn receive(&self, raw: &str) -> Result<Event> {
        self.inner.receive(raw)
    }
}

// ============================================================================
// ConnectionManager - Subscriptions
// ============================================================================

impl ConnectionManager {
    /// Returns the event bus.
    #[inline]
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Registers a persistent handler. See [`EventBus::on`].
    pub fn on<F>(&self, event_name: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.bus.on(event_name, handler)
    }

    /// Registers a one-shot handler. See [`EventBus::once`].
    pub fn once<F>(&self, event_name: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.inner.bus.once(event_name, handler)
    }

    /// Removes handlers. See [`EventBus::off`].
    pub fn off(&self, event_name: &str, id: Option<SubscriptionId>) -> usize {
        self.inner.bus.off(event_name, id)
    }

    /// Removes every subscription. See [`EventBus::clear`].
    pub fn clear_handlers(&self) {
        self.inner.bus.clear();
    }

    /// Waits for the next matching event. See [`EventBus::wait_for_next`].
    pub fn wait_for_next(
        &self,
        event_name: &str,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Option<Event>> + Send + 'static {
        self.inner.bus.wait_for_next(event_name, timeout)
    }
}

// ============================================================================
// ManagerInner
// ============================================================================

impl ManagerInner {
    /// Returns the URL for one connect call.
    fn connect_url(&self, options: &ConnectOptions) -> Url {
        let mut url = self.url.clone();
        if let Some(model) = options.model_name() {
            let named = url.query_pairs().any(|(key, _)| key == MODEL_PARAM);
            if !named {
                url.query_pairs_mut().append_pair(MODEL_PARAM, model);
            }
        }
        url
    }

    /// Returns the live link's handle without holding the lock.
    fn live_handle(&self) -> Option<Arc<dyn TransportHandle>> {
        match &*self.slot.lock() {
            LinkSlot::Connected { handle, .. } => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    /// Moves the slot to `Idle` and returns the live handle.
    ///
    /// With `Some(generation)`, only a link of that generation is taken.
    fn take_link(&self, generation: Option<u64>) -> Option<Arc<dyn TransportHandle>> {
        let mut slot = self.slot.lock();
        let matches = match &*slot {
            LinkSlot::Connected {
                generation: live, ..
            } => generation.is_none_or(|wanted| wanted == *live),
            _ => false,
        };
        if !matches {
            return None;
        }

        match std::mem::replace(&mut *slot, LinkSlot::Idle) {
            LinkSlot::Connected { handle, .. } => Some(handle),
            _ => None,
        }
    }

    /// Returns `true` if `generation` is the live link.
    fn is_live(&self, generation: u64) -> bool {
        matches!(
            &*self.slot.lock(),
            LinkSlot::Connected { generation: live, .. } if *live == generation
        )
    }

    /// Ends link `generation` after a transport notification.
    fn teardown(&self, generation: u64, error: bool) {
        let Some(handle) = self.take_link(Some(generation)) else {
            return;
        };
        handle.close();
        self.publish_close(error);
    }

    fn receive(&self, raw: &str) -> Result<Event> {
        let event = Event::decode(raw)?;
        self.log_event("received", &event);
        self.bus.dispatch(&names::server(event.event_type()), &event);
        Ok(event)
    }

    /// Handles one frame from the pump.
    fn on_frame(&self, raw: &str) {
        if let Err(e) = self.receive(raw) {
            warn!(error = %e, "Malformed inbound frame");
            let mut fields = Map::new();
            fields.insert(
                "error".to_string(),
                json!({
                    "type": "protocol_error",
                    "message": e.to_string(),
                    "raw": raw,
                }),
            );
            let event = Event::synthetic(names::ERROR, fields);
            self.bus.dispatch(names::ERROR, &event);
        }
    }

    fn publish_close(&self, error: bool) {
        let mut fields = Map::new();
        fields.insert("error".to_string(), Value::Bool(error));
        let event = Event::synthetic(names::CLOSE, fields);
        self.bus.dispatch(names::CLOSE, &event);
    }

    fn log_event(&self, direction: &'static str, event: &Event) {
        if self.debug_bodies {
            debug!(
                direction,
                event_type = event.event_type(),
                event_id = event.event_id().unwrap_or_default(),
                body = %event.encode().unwrap_or_default(),
                "Realtime event"
            );
        } else {
            trace!(
                direction,
                event_type = event.event_type(),
                event_id = event.event_id().unwrap_or_default(),
                "Realtime event"
            );
        }
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        if let LinkSlot::Connected { handle, generation } = &*self.slot.lock() {
            debug!(generation, "Manager dropped, closing link");
            handle.close();
        }
    }
}

// ============================================================================
// PendingConnect
// ============================================================================

/// Returns the slot to `Idle` unless the connect attempt succeeded.
struct PendingConnect<'a> {
    inner: &'a ManagerInner,
    armed: bool,
}

impl PendingConnect<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingConnect<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.inner.slot.lock();
        if matches!(*slot, LinkSlot::Connecting) {
            *slot = LinkSlot::Idle;
        }
    }
}

// ============================================================================
// Pump Task
// ============================================================================

/// Forwards notifications of link `generation` until it ends.
///
/// Holds only a weak reference so a dropped manager ends the task.
async fn pump(
    inner: Weak<ManagerInner>,
    generation: u64,
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(notification) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        if !inner.is_live(generation) {
            trace!(generation, "Notification for a replaced link ignored");
            return;
        }

        match notification {
            TransportEvent::Message(raw) => inner.on_frame(&raw),
            TransportEvent::Error(message) => {
                warn!(generation, %message, "Link failed");
                inner.teardown(generation, true);
                return;
            }
            TransportEvent::Closed => {
                info!(generation, "Link closed by peer");
                inner.teardown(generation, false);
                return;
            }
            TransportEvent::Open => trace!(generation, "Repeated open ignored"),
        }
    }

    if let Some(inner) = inner.upgrade() {
        inner.teardown(generation, true);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use tokio_test::{assert_pending, assert_ready_ok};

    use crate::transport::MemoryTransport;

    const WAIT: Option<Duration> = Some(Duration::from_secs(1));

    fn manager(transport: &MemoryTransport) -> ConnectionManager {
        ConnectionManager::builder()
            .url("wss://example.test/v1/realtime")
            .credential("sk-test")
            .transport(transport.clone())
            .build()
            .unwrap()
    }

    async fn connected() -> (ConnectionManager, MemoryTransport) {
        let peer = MemoryTransport::new();
        let client = manager(&peer);
        client.connect(ConnectOptions::new()).await.unwrap();
        (client, peer)
    }

    fn counter(client: &ConnectionManager, event_name: &str) -> Arc<AtomicUsize> {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        client.on(event_name, move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        hits
    }

    fn capture(client: &ConnectionManager, event_name: &str) -> Arc<Mutex<Vec<Event>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        client.on(event_name, move |event| seen_clone.lock().push(event.clone()));
        seen
    }

    // ------------------------------------------------------------------------
    // connect
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_connect_opens_link() {
        let (client, peer) = connected().await;

        assert!(client.is_connected());
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(peer.open_count(), 1);

        let url = peer.last_url().unwrap();
        assert!(url.query_pairs().any(|(k, v)| k == "api-key" && v == "sk-test"));

        let headers = peer.last_headers().unwrap();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
    }

    #[tokio::test]
    async fn test_connect_twice_is_state_error() {
        let (client, peer) = connected().await;

        let err = client.connect(ConnectOptions::new()).await.unwrap_err();

        assert!(err.is_state_error());
        assert_eq!(peer.open_count(), 1);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_connect_while_connecting_is_state_error() {
        let peer = MemoryTransport::manual();
        let client = manager(&peer);

        let mut first = tokio_test::task::spawn(client.connect(ConnectOptions::new()));
        assert_pending!(first.poll());
        assert_eq!(client.state(), ConnectionState::Connecting);

        let err = client.connect(ConnectOptions::new()).await.unwrap_err();
        assert!(err.is_state_error());

        assert!(peer.accept());
        assert_ready_ok!(first.poll());
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_refused_connect_returns_to_idle() {
        let peer = MemoryTransport::refusing("401 Unauthorized");
        let client = manager(&peer);

        let err = client.connect(ConnectOptions::new()).await.unwrap_err();

        assert!(err.is_connection_error());
        assert!(err.to_string().contains("401"));
        assert_eq!(client.state(), ConnectionState::Idle);
        assert!(!peer.has_link());
    }

    #[tokio::test]
    async fn test_close_before_open_fails_connect() {
        let peer = MemoryTransport::manual();
        let client = manager(&peer);
        let closes = counter(&client, "close");

        let mut attempt = tokio_test::task::spawn(client.connect(ConnectOptions::new()));
        assert_pending!(attempt.poll());
        assert!(peer.hang_up());

        match attempt.poll() {
            std::task::Poll::Ready(Err(err)) => assert!(err.is_connection_error()),
            other => panic!("expected connection error, got {other:?}"),
        }
        drop(attempt);

        assert_eq!(client.state(), ConnectionState::Idle);
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_abandoned_connect_returns_to_idle() {
        let peer = MemoryTransport::manual();
        let client = manager(&peer);

        let mut attempt = tokio_test::task::spawn(client.connect(ConnectOptions::new()));
        assert_pending!(attempt.poll());
        drop(attempt);

        assert_eq!(client.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_connect_appends_model() {
        let peer = MemoryTransport::new();
        let client = manager(&peer);

        client
            .connect(ConnectOptions::new().model("gpt-4o-realtime-preview"))
            .await
            .unwrap();

        let url = peer.last_url().unwrap();
        let models: Vec<_> = url.query_pairs().filter(|(k, _)| k == "model").collect();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].1, "gpt-4o-realtime-preview");
        assert!(client.url().query_pairs().all(|(k, _)| k != "model"));
    }

    #[tokio::test]
    async fn test_connect_keeps_model_from_url() {
        let peer = MemoryTransport::new();
        let client = ConnectionManager::builder()
            .url("wss://example.test/v1/realtime?model=fixed")
            .credential("sk-test")
            .transport(peer.clone())
            .build()
            .unwrap();

        client
            .connect(ConnectOptions::new().model("other"))
            .await
            .unwrap();

        let url = peer.last_url().unwrap();
        let models: Vec<_> = url
            .query_pairs()
            .filter(|(k, _)| k == "model")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(models, ["fixed"]);
    }

    // ------------------------------------------------------------------------
    // send
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_send_while_disconnected_is_state_error() {
        let peer = MemoryTransport::new();
        let client = manager(&peer);
        let local = counter(&client, "client.*");

        let err = client
            .send("response.create", Some(json!({ "foo": 1 })))
            .unwrap_err();

        assert!(err.is_state_error());
        assert!(peer.sent().is_empty());
        assert_eq!(local.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_writes_and_dispatches_locally() {
        let (client, peer) = connected().await;
        let exact = capture(&client, "client.response.create");
        let wildcard = counter(&client, "client.*");

        let sent = client
            .send("response.create", Some(json!({ "foo": 1 })))
            .unwrap();

        assert_eq!(sent.event_type(), "response.create");
        assert_eq!(sent.get("foo"), Some(&json!(1)));
        assert!(sent.event_id().is_some_and(|id| id.starts_with("evt_")));

        assert_eq!(*exact.lock(), [sent.clone()]);
        assert_eq!(wildcard.load(Ordering::SeqCst), 1);

        let frames = peer.sent();
        assert_eq!(frames.len(), 1);
        assert_eq!(Event::decode(&frames[0]).unwrap(), sent);
    }

    #[tokio::test]
    async fn test_send_stamps_fresh_ids() {
        let (client, _peer) = connected().await;

        let a = client.send("input_audio_buffer.commit", None).unwrap();
        let b = client.send("input_audio_buffer.commit", None).unwrap();

        assert_ne!(a.event_id(), b.event_id());
    }

    #[tokio::test]
    async fn test_send_rejects_non_object_payload() {
        let (client, peer) = connected().await;

        let err = client.send("response.create", Some(json!([1]))).unwrap_err();

        assert!(err.is_state_error());
        assert!(peer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_send_json_serializes_payload() {
        #[derive(Serialize)]
        struct SessionUpdate<'a> {
            session: Session<'a>,
        }

        #[derive(Serialize)]
        struct Session<'a> {
            voice: &'a str,
        }

        let (client, peer) = connected().await;

        let sent = client
            .send_json(
                "session.update",
                &SessionUpdate {
                    session: Session { voice: "alloy" },
                },
            )
            .unwrap();

        assert_eq!(sent.get("session"), Some(&json!({ "voice": "alloy" })));
        assert_eq!(peer.sent().len(), 1);
    }

    // ------------------------------------------------------------------------
    // receive
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_receive_dispatches_server_event() {
        let peer = MemoryTransport::new();
        let client = manager(&peer);
        let exact = capture(&client, "server.session.created");
        let wildcard = counter(&client, "server.*");

        let event = client
            .receive(r#"{"type":"session.created","event_id":"evt_remote"}"#)
            .unwrap();

        assert_eq!(event.event_id(), Some("evt_remote"));
        assert_eq!(*exact.lock(), [event]);
        assert_eq!(wildcard.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_types_ending_in_star_reach_namespace_wildcards() {
        let (client, _peer) = connected().await;
        let inbound = counter(&client, "server.*");
        let outbound = counter(&client, "client.*");
        let exact = counter(&client, "server.a.*");

        client.receive(r#"{"type":"a.*"}"#).unwrap();
        client.send("b.*", None).unwrap();

        assert_eq!(inbound.load(Ordering::SeqCst), 1);
        assert_eq!(exact.load(Ordering::SeqCst), 1);
        assert_eq!(outbound.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_receive_malformed_is_protocol_error() {
        let peer = MemoryTransport::new();
        let client = manager(&peer);
        let wildcard = counter(&client, "server.*");

        for raw in ["{not json", r#"{"foo":1}"#, "[]"] {
            assert!(client.receive(raw).unwrap_err().is_protocol_error());
        }
        assert_eq!(wildcard.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_inbound_frames_reach_subscribers() {
        let (client, peer) = connected().await;
        let next = client.wait_for_next("server.response.done", WAIT);

        assert!(peer.inject(r#"{"type":"response.done","event_id":"evt_1"}"#));

        let event = next.await.unwrap();
        assert_eq!(event.event_id(), Some("evt_1"));
    }

    #[tokio::test]
    async fn test_malformed_frame_publishes_error_and_stays_open() {
        let (client, peer) = connected().await;
        let error = client.wait_for_next(names::ERROR, WAIT);

        assert!(peer.inject("{not json"));

        let event = error.await.unwrap();
        let detail = event.get("error").unwrap();
        assert_eq!(detail["type"], "protocol_error");
        assert_eq!(detail["raw"], "{not json");
        assert!(client.is_connected());

        let next = client.wait_for_next("server.pong", WAIT);
        assert!(peer.inject(r#"{"type":"pong"}"#));
        assert!(next.await.is_some());
    }

    // ------------------------------------------------------------------------
    // disconnect / teardown
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (client, peer) = connected().await;
        let closes = capture(&client, names::CLOSE);

        client.disconnect();
        client.disconnect();
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        assert_eq!(client.state(), ConnectionState::Idle);
        assert_eq!(peer.close_count(), 1);

        let closes = closes.lock();
        assert_eq!(closes.len(), 1);
        assert_eq!(closes[0].get("error"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn test_disconnect_when_idle_publishes_nothing() {
        let peer = MemoryTransport::new();
        let client = manager(&peer);
        let closes = counter(&client, names::CLOSE);

        client.disconnect();

        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_close_publishes_clean_close() {
        let (client, peer) = connected().await;
        let close = client.wait_for_next(names::CLOSE, WAIT);

        assert!(peer.hang_up());

        let event = close.await.unwrap();
        assert_eq!(event.get("error"), Some(&json!(false)));
        assert_eq!(client.state(), ConnectionState::Idle);
        assert!(client.send("x", None).unwrap_err().is_state_error());
    }

    #[tokio::test]
    async fn test_link_failure_publishes_error_close() {
        let (client, peer) = connected().await;
        let close = client.wait_for_next(names::CLOSE, WAIT);

        assert!(peer.fail("connection reset"));

        let event = close.await.unwrap();
        assert_eq!(event.get("error"), Some(&json!(true)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_reconnect_after_disconnect() {
        let (client, peer) = connected().await;
        let handlers = counter(&client, "server.*");

        client.disconnect();
        client.connect(ConnectOptions::new()).await.unwrap();

        let next = client.wait_for_next("server.ack", WAIT);
        assert!(peer.inject(r#"{"type":"ack"}"#));
        assert!(next.await.is_some());

        assert_eq!(peer.open_count(), 2);
        assert_eq!(handlers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropping_manager_closes_link() {
        let (client, peer) = connected().await;
        let clone = client.clone();

        drop(client);
        assert_eq!(peer.close_count(), 0);

        drop(clone);
        assert_eq!(peer.close_count(), 1);
    }

    #[tokio::test]
    async fn test_debug_output_hides_credential() {
        let peer = MemoryTransport::new();
        let client = manager(&peer);
        assert!(!format!("{client:?}").contains("sk-test"));
    }
}
