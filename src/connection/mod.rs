//! Connection management.
//!
//! This module provides the main entry point for a realtime session.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionManager`] | Owns the link, sends and routes events |
//! | [`ConnectionBuilder`] | Fluent configuration builder |
//! | [`ConnectOptions`] | Per-connect options |
//! | [`Runtime`] | Declared host runtime |
//! | [`ConnectionState`] | Lifecycle state |
//!
//! # Example
//!
//! ```no_run
//! use realtime_client::{ConnectOptions, ConnectionManager, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = ConnectionManager::builder()
//!     .url("wss://example.com/v1/realtime?api-key=sk-...")
//!     .build()?;
//!
//! client.connect(ConnectOptions::new()).await?;
//! client.send("response.create", None)?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for connection configuration.
pub mod builder;

/// Core connection manager implementation.
pub mod core;

/// Endpoint and credential resolution.
pub mod credentials;

/// Connection options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{ConnectionManager, ConnectionState};
pub use builder::ConnectionBuilder;
pub use credentials::{CREDENTIAL_PARAM, DEFAULT_URL};
pub use options::{ConnectOptions, Runtime};
