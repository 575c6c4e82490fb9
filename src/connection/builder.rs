//! Builder pattern for connection configuration.
//!
//! Provides a fluent API for configuring and creating [`ConnectionManager`]
//! instances. All validation happens in [`ConnectionBuilder::build`].
//!
//! # Example
//!
//! ```no_run
//! use realtime_client::ConnectionManager;
//!
//! # fn example() -> realtime_client::Result<()> {
//! let client = ConnectionManager::builder()
//!     .url("wss://example.com/v1/realtime")
//!     .credential("sk-...")
//!     .header("OpenAI-Beta", "realtime=v1")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use secrecy::SecretString;

use crate::error::{Error, Result};
use crate::transport::auth::parse_header;
use crate::transport::{AuthDecorator, Transport, WebSocketTransport};

use super::core::ConnectionManager;
use super::credentials;
use super::options::Runtime;

// ============================================================================
// ConnectionBuilder
// ============================================================================

/// Builder for configuring a [`ConnectionManager`].
///
/// Use [`ConnectionManager::builder()`] to create a new builder.
#[derive(Default)]
pub struct ConnectionBuilder {
    /// Target URL. Falls back to the default endpoint.
    url: Option<String>,
    /// Explicit credential.
    credential: Option<SecretString>,
    /// Declared host runtime.
    runtime: Runtime,
    /// Opt-in for credentials in a browser-like runtime.
    allow_credential_in_browser: bool,
    /// Log full event bodies.
    debug: bool,
    /// Extra handshake headers.
    headers: Vec<(String, String)>,
    /// Transport override.
    transport: Option<Arc<dyn Transport>>,
}

// ============================================================================
// ConnectionBuilder Implementation
// ============================================================================

impl ConnectionBuilder {
    /// Creates a builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target URL (`ws://` or `wss://`).
    ///
    /// May carry the credential as an `api-key` query parameter.
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the credential explicitly.
    #[inline]
    #[must_use]
    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(SecretString::from(credential.into()));
        self
    }

    /// Declares the host runtime.
    #[inline]
    #[must_use]
    pub fn runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = runtime;
        self
    }

    /// Accepts that the credential is readable by page scripts.
    ///
    /// Required when the runtime is [`Runtime::Browser`].
    #[inline]
    #[must_use]
    pub fn dangerously_allow_credential_in_browser(mut self, allow: bool) -> Self {
        self.allow_credential_in_browser = allow;
        self
    }

    /// Logs every sent and received event body at `debug` level.
    #[inline]
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Adds a header to the opening handshake.
    #[inline]
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the default [`WebSocketTransport`].
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Validates the configuration and builds the manager.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the URL does not parse
    /// - [`Error::Config`] if the URL is not `ws`/`wss`
    /// - [`Error::Config`] if the URL and explicit credentials differ
    /// - [`Error::Config`] if no credential is configured
    /// - [`Error::Config`] if the runtime is a browser without the opt-in
    /// - [`Error::Config`] if an extra header is invalid
    pub fn build(self) -> Result<ConnectionManager> {
        let endpoint = credentials::resolve(self.url.as_deref(), self.credential.as_ref())?;
        self.validate_runtime()?;
        self.validate_headers()?;

        let auth = AuthDecorator::new(Some(Arc::clone(&endpoint.credential)), self.headers);
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(WebSocketTransport::new()),
        };

        Ok(ConnectionManager::new(
            endpoint.url,
            auth,
            transport,
            self.debug,
        ))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConnectionBuilder {
    /// Refuses to put a credential where page scripts can read it unless
    /// the caller opted in.
    fn validate_runtime(&self) -> Result<()> {
        if self.runtime.exposes_credentials() && !self.allow_credential_in_browser {
            return Err(Error::config(
                "A credential in a browser runtime is visible to page scripts.\n\
                 Use a relay server, or call \
                 .dangerously_allow_credential_in_browser(true) if you understand the risk.",
            ));
        }
        Ok(())
    }

    /// Validates the extra handshake headers.
    fn validate_headers(&self) -> Result<()> {
        for (name, value) in &self.headers {
            parse_header(name, value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBuilder")
            .field("url", &self.url.as_ref().map(|_| "[SET]"))
            .field("credential", &self.credential.as_ref().map(|_| "[REDACTED]"))
            .field("runtime", &self.runtime)
            .field("allow_credential_in_browser", &self.allow_credential_in_browser)
            .field("debug", &self.debug)
            .field("headers", &self.headers.len())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
