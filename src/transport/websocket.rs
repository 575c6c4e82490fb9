//! WebSocket client transport.
//!
//! Each link spawns one tokio task that performs the handshake and then
//! runs the I/O loop:
//!
//! - Incoming text frames are forwarded as [`TransportEvent::Message`]
//! - Outgoing frames from [`TransportHandle::send`] are written in order
//! - Close/error on either side ends the loop with a final notification

// ============================================================================
// Imports
// ============================================================================

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{AuthDecorator, Transport, TransportEvent, TransportHandle, TransportLink};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for the opening handshake.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

/// Internal commands for the link task.
enum LinkCommand {
    /// Write one text frame.
    Send(String),
    /// Close the socket and stop.
    Close,
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Transport over `tokio-tungstenite`, supporting `ws://` and `wss://`.
///
/// A handshake that does not finish within the handshake timeout is
/// reported as [`TransportEvent::Error`].
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    handshake_timeout: Duration,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl WebSocketTransport {
    /// Creates a transport with the default 30s handshake timeout.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn handshake_timeout(mut self, limit: Duration) -> Self {
        self.handshake_timeout = limit;
        self
    }

    /// Returns the handshake timeout.
    #[inline]
    #[must_use]
    pub const fn handshake_timeout_duration(&self) -> Duration {
        self.handshake_timeout
    }

    /// Builds the decorated handshake request.
    fn build_request(url: &Url, auth: &AuthDecorator) -> Result<Request> {
        let mut request = url.as_str().into_client_request()?;
        auth.decorate(request.headers_mut())?;
        Ok(request)
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &Url, auth: &AuthDecorator) -> Result<TransportLink> {
        let request = Self::build_request(url, auth)?;
        install_crypto_provider();

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        debug!(host = url.host_str().unwrap_or_default(), "Opening WebSocket link");

        tokio::spawn(run_link(
            request,
            self.handshake_timeout,
            command_rx,
            event_tx,
        ));

        Ok(TransportLink {
            handle: Box::new(WebSocketHandle { command_tx }),
            events: event_rx,
        })
    }
}

/// Installs `ring` as the process-wide rustls provider unless one is set.
///
/// `wss://` handshakes cannot build a TLS config without a provider.
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            trace!("TLS crypto provider already installed");
        }
    });
}

// ============================================================================
// WebSocketHandle
// ============================================================================

/// Write side of a WebSocket link.
struct WebSocketHandle {
    command_tx: mpsc::UnboundedSender<LinkCommand>,
}

impl TransportHandle for WebSocketHandle {
    fn send(&self, frame: String) -> Result<()> {
        self.command_tx
            .send(LinkCommand::Send(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    fn close(&self) {
        let _ = self.command_tx.send(LinkCommand::Close);
    }
}

// ============================================================================
// Link Task
// ============================================================================

/// Handshake, then pump frames until either side stops.
async fn run_link(
    request: Request,
    handshake_timeout: Duration,
    mut command_rx: mpsc::UnboundedReceiver<LinkCommand>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    let ws_stream = match timeout(handshake_timeout, connect_async(request)).await {
        Ok(Ok((stream, response))) => {
            debug!(status = %response.status(), "WebSocket handshake completed");
            stream
        }
        Ok(Err(e)) => {
            warn!(error = %e, "WebSocket handshake failed");
            let _ = event_tx.send(TransportEvent::Error(e.to_string()));
            return;
        }
        Err(_) => {
            let message = format!(
                "handshake timed out after {}ms",
                handshake_timeout.as_millis()
            );
            warn!(%message, "WebSocket handshake failed");
            let _ = event_tx.send(TransportEvent::Error(message));
            return;
        }
    };

    let _ = event_tx.send(TransportEvent::Open);

    let (mut ws_write, mut ws_read) = ws_stream.split();
    run_io_loop(&mut ws_write, &mut ws_read, &mut command_rx, &event_tx).await;

    debug!("WebSocket link terminated");
}

/// Moves frames between the socket and the manager.
async fn run_io_loop(
    ws_write: &mut WsWrite,
    ws_read: &mut WsRead,
    command_rx: &mut mpsc::UnboundedReceiver<LinkCommand>,
    event_tx: &mpsc::UnboundedSender<TransportEvent>,
) {
    loop {
        tokio::select! {
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        trace!(bytes = text.len(), "Frame received");
                        let _ = event_tx.send(TransportEvent::Message(text.as_str().to_owned()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by remote");
                        let _ = event_tx.send(TransportEvent::Closed);
                        break;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                        break;
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        let _ = event_tx.send(TransportEvent::Closed);
                        break;
                    }

                    // Binary frames carry nothing for this protocol; ping/pong
                    // are answered by tungstenite.
                    Some(Ok(_)) => {}
                }
            }

            command = command_rx.recv() => {
                match command {
                    Some(LinkCommand::Send(frame)) => {
                        if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                            error!(error = %e, "Failed to write frame");
                            let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                            break;
                        }
                        trace!("Frame sent");
                    }

                    Some(LinkCommand::Close) | None => {
                        debug!("Closing WebSocket link");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
