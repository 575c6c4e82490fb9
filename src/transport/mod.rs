//! Transport layer.
//!
//! The connection manager talks to the network only through the
//! [`Transport`] trait, so the choice of socket implementation is made by
//! whoever builds the manager.
//!
//! # Link Lifecycle
//!
//! ```text
//! Transport::open(url, auth) ──► TransportLink { handle, events }
//!                                       │
//!        events: Open ─► Message* ─► (Error | Closed)
//!        handle: send(frame)*, close()
//! ```
//!
//! `open` returns as soon as the attempt has started. The handshake outcome
//! arrives as the first item on `events`: [`TransportEvent::Open`] on success,
//! [`TransportEvent::Error`] or [`TransportEvent::Closed`] on failure.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `auth` | Handshake header decoration |
//! | `memory` | In-process transport for tests and embedding |
//! | `websocket` | `tokio-tungstenite` client transport |

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Handshake authentication.
pub mod auth;

/// In-process transport.
pub mod memory;

/// WebSocket client transport.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use auth::AuthDecorator;
pub use memory::MemoryTransport;
pub use websocket::WebSocketTransport;

// ============================================================================
// Types
// ============================================================================

/// Notification delivered by a transport link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed; frames may flow.
    Open,
    /// One inbound UTF-8 text frame.
    Message(String),
    /// The link failed. No further events follow.
    Error(String),
    /// The link was closed by the remote peer. No further events follow.
    Closed,
}

/// Write side of an open link.
pub trait TransportHandle: Send + Sync {
    /// Queues one text frame for the peer.
    ///
    /// Frames are written in the order they are queued.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the link
    /// is gone.
    fn send(&self, frame: String) -> Result<()>;

    /// Closes the link. Safe to call more than once.
    fn close(&self);
}

/// A started link: its write handle plus its notification stream.
pub struct TransportLink {
    /// Write side.
    pub handle: Box<dyn TransportHandle>,
    /// Notifications, in arrival order.
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl std::fmt::Debug for TransportLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportLink").finish_non_exhaustive()
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Opens links to a remote peer.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Starts opening a link to `url`.
    ///
    /// The transport must call [`AuthDecorator::decorate`] on the handshake
    /// request headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the attempt cannot even be started, for example
    /// when the handshake request cannot be built.
    async fn open(&self, url: &Url, auth: &AuthDecorator) -> Result<TransportLink>;
}
