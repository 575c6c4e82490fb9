//! Realtime client - Event-driven runtime for bidirectional JSON event sessions.
//!
//! This library maintains one persistent connection to a realtime service,
//! frames every message as a typed JSON event, and routes inbound and
//! outbound events to local subscribers.
//!
//! # Architecture
//!
//! - **Event bus**: named publish/subscribe with namespace wildcards and
//!   one-shot waiters
//! - **Connection manager**: `Idle → Connecting → Connected → Idle` lifecycle,
//!   credential resolution, envelope stamping
//! - **Transport**: pluggable link provider; WebSocket by default
//!
//! Every event is dispatched under a local name:
//!
//! | Local name | Published when |
//! |------------|----------------|
//! | `client.<type>` / `client.*` | an event was sent |
//! | `server.<type>` / `server.*` | an event was received |
//! | `close` | the link ended (`{ error: bool }`) |
//! | `error` | an inbound frame was malformed |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use realtime_client::{ConnectOptions, ConnectionManager, Result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ConnectionManager::builder()
//!         .credential("sk-...")
//!         .build()?;
//!
//!     client.on("server.*", |event| println!("<- {}", event.event_type()));
//!     client.on("close", |event| println!("closed: {:?}", event.get("error")));
//!
//!     client.connect(ConnectOptions::new().model("gpt-4o-realtime-preview")).await?;
//!
//!     let created = client.wait_for_next("server.response.created", Some(Duration::from_secs(10)));
//!     client.send("response.create", Some(json!({ "response": { "modalities": ["text"] } })))?;
//!     println!("created: {:?}", created.await);
//!
//!     client.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bus`] | Publish/subscribe [`EventBus`] |
//! | [`connection`] | [`ConnectionManager`] and configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Event envelope and local names |
//! | [`transport`] | Transport trait and implementations |

// ============================================================================
// Modules
// ============================================================================

/// Publish/subscribe event bus.
///
/// Usable on its own; the connection manager owns one.
pub mod bus;

/// Connection lifecycle and configuration.
///
/// Use [`ConnectionManager::builder()`] to create a configured manager.
pub mod connection;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Event envelope and local event names.
pub mod protocol;

/// Transport layer.
///
/// The [`Transport`] trait plus WebSocket and in-memory implementations.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bus types
pub use bus::{EventBus, Handler};

// Connection types
pub use connection::{
    ConnectOptions, ConnectionBuilder, ConnectionManager, ConnectionState, Runtime,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{EventId, SubscriptionId};

// Protocol types
pub use protocol::Event;

// Transport types
pub use transport::{
    AuthDecorator, MemoryTransport, Transport, TransportEvent, TransportHandle, TransportLink,
    WebSocketTransport,
};
