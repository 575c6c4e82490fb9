//! Error types for the realtime client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use realtime_client::{ConnectionManager, Result};
//!
//! async fn example(client: &ConnectionManager) -> Result<()> {
//!     client.connect(Default::default()).await?;
//!     client.send("response.create", None)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Raised |
//! |----------|----------|--------|
//! | Configuration | [`Error::Config`] | Synchronously by the builder |
//! | State | [`Error::State`] | Synchronously by `connect` / `send` |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] | By `connect` / transport writes |
//! | Protocol | [`Error::Protocol`] | On malformed inbound frames |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] | Wrapped |
//!
//! Transport failures after a successful connect are never returned as
//! errors. They surface as a local `close` event instead.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by [`ConnectionBuilder::build`](crate::ConnectionBuilder::build)
    /// when credentials are missing or conflicting, the browser opt-in is
    /// absent, or the URL is unusable. The manager is not constructed.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// Operation not valid in the current connection state.
    ///
    /// Returned when connecting twice, sending while disconnected, or
    /// sending a payload that is not a JSON object. Recoverable.
    #[error("Invalid state: {message}")]
    State {
        /// Description of the state violation.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport failed to open.
    ///
    /// Returned by `connect` when the transport reports an error or closes
    /// before the handshake completes.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Transport link closed while an operation was using it.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound data violates the wire format.
    ///
    /// Returned when a frame is not a JSON object or lacks a `type`.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a state error.
    #[inline]
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Url(_))
    }

    /// Returns `true` if this is a state error.
    #[inline]
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a protocol error.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
