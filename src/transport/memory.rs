//! In-process transport.
//!
//! [`MemoryTransport`] never touches the network. The owner plays the remote
//! peer: it decides whether handshakes succeed, injects inbound frames, fails
//! or hangs up the current link, and inspects what was written.
//!
//! ```
//! use realtime_client::transport::MemoryTransport;
//!
//! let transport = MemoryTransport::new();
//! let peer = transport.clone();
//! // hand `transport` to a ConnectionManager, drive the session with `peer`
//! assert!(peer.sent().is_empty());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::http::HeaderMap;
use tracing::trace;
use url::Url;

use crate::error::{Error, Result};

use super::{AuthDecorator, Transport, TransportEvent, TransportHandle, TransportLink};

// ============================================================================
// Shared State
// ============================================================================

/// State shared by the transport, its handles, and the peer side.
#[derive(Default)]
struct MemoryState {
    /// Fail every handshake with this message.
    refuse_with: Option<String>,
    /// Hold `Open` until [`MemoryTransport::accept`] is called.
    manual_accept: bool,
    /// URL of every open attempt.
    urls: Vec<Url>,
    /// Decorated handshake headers of the latest attempt.
    last_headers: Option<HeaderMap>,
    /// Notification channel of the current link.
    current: Option<(u64, mpsc::UnboundedSender<TransportEvent>)>,
    /// Link counter.
    links: u64,
    /// Frames written, across all links.
    sent: Vec<String>,
    /// Number of `close` calls on live links.
    closes: usize,
}

// ============================================================================
// MemoryTransport
// ============================================================================

/// Transport whose remote end is driven by the caller.
///
/// Clones share state, so one clone can be given to the connection manager
/// and another kept as the peer.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// Creates a transport that completes every handshake immediately.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that fails every handshake with `message`.
    #[must_use]
    pub fn refusing(message: impl Into<String>) -> Self {
        let transport = Self::default();
        transport.state.lock().refuse_with = Some(message.into());
        transport
    }

    /// Creates a transport whose handshakes wait for [`accept`](Self::accept).
    #[must_use]
    pub fn manual() -> Self {
        let transport = Self::default();
        transport.state.lock().manual_accept = true;
        transport
    }

    /// Completes the pending handshake. Returns `false` if there is no link.
    pub fn accept(&self) -> bool {
        self.emit(TransportEvent::Open)
    }

    /// Delivers one inbound frame. Returns `false` if there is no link.
    pub fn inject(&self, frame: impl Into<String>) -> bool {
        self.emit(TransportEvent::Message(frame.into()))
    }

    /// Fails the current link with `message`.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        let delivered = self.emit(TransportEvent::Error(message.into()));
        self.state.lock().current = None;
        delivered
    }

    /// Closes the current link from the remote side.
    pub fn hang_up(&self) -> bool {
        let delivered = self.emit(TransportEvent::Closed);
        self.state.lock().current = None;
        delivered
    }

    /// Returns every frame written so far.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// Returns the URL of the latest open attempt.
    #[must_use]
    pub fn last_url(&self) -> Option<Url> {
        self.state.lock().urls.last().cloned()
    }

    /// Returns the number of open attempts.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.state.lock().urls.len()
    }

    /// Returns the decorated headers of the latest open attempt.
    #[must_use]
    pub fn last_headers(&self) -> Option<HeaderMap> {
        self.state.lock().last_headers.clone()
    }

    /// Returns how many live links were closed from the local side.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.lock().closes
    }

    /// Returns `true` while a link is live.
    #[must_use]
    pub fn has_link(&self) -> bool {
        self.state.lock().current.is_some()
    }

    fn emit(&self, event: TransportEvent) -> bool {
        let state = self.state.lock();
        match &state.current {
            Some((_, tx)) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryTransport")
            .field("links", &state.links)
            .field("sent", &state.sent.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, url: &Url, auth: &AuthDecorator) -> Result<TransportLink> {
        let mut headers = HeaderMap::new();
        auth.decorate(&mut headers)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        state.links += 1;
        let link = state.links;
        state.urls.push(url.clone());
        state.last_headers = Some(headers);

        if let Some(message) = state.refuse_with.clone() {
            let _ = event_tx.send(TransportEvent::Error(message));
        } else {
            if !state.manual_accept {
                let _ = event_tx.send(TransportEvent::Open);
            }
            state.current = Some((link, event_tx));
        }

        trace!(link, "Memory link opened");

        Ok(TransportLink {
            handle: Box::new(MemoryHandle {
                link,
                state: Arc::clone(&self.state),
            }),
            events: event_rx,
        })
    }
}

// ============================================================================
// MemoryHandle
// ============================================================================

/// Write side of a memory link.
struct MemoryHandle {
    link: u64,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryHandle {
    fn is_current(state: &MemoryState, link: u64) -> bool {
        matches!(state.current, Some((current, _)) if current == link)
    }
}

impl TransportHandle for MemoryHandle {
    fn send(&self, frame: String) -> Result<()> {
        let mut state = self.state.lock();
        if !Self::is_current(&state, self.link) {
            return Err(Error::ConnectionClosed);
        }
        state.sent.push(frame);
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state.lock();
        if Self::is_current(&state, self.link) {
            state.current = None;
            state.closes += 1;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
