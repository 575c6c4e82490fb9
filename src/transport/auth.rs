//! Handshake authentication.
//!
//! The [`AuthDecorator`] is handed to [`Transport::open`](super::Transport::open)
//! and applied by the transport while it builds the handshake request, so
//! callers never assemble credential headers themselves.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Error, Result};

// ============================================================================
// AuthDecorator
// ============================================================================

/// Adds credential and protocol headers to a handshake request.
///
/// Produces `Authorization: Bearer <credential>` (marked sensitive) followed
/// by any extra headers configured on the connection.
#[derive(Clone, Default)]
pub struct AuthDecorator {
    /// Credential sent as a bearer token.
    credential: Option<Arc<SecretString>>,
    /// Extra headers, applied in order.
    headers: Vec<(String, String)>,
}

impl AuthDecorator {
    /// Creates a decorator for the given credential and extra headers.
    #[must_use]
    pub fn new(credential: Option<Arc<SecretString>>, headers: Vec<(String, String)>) -> Self {
        Self {
            credential,
            headers,
        }
    }

    /// Returns `true` if a credential will be attached.
    #[inline]
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Applies the decoration to `headers`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the credential or an extra header is not a valid
    /// HTTP header.
    pub fn decorate(&self, headers: &mut HeaderMap) -> Result<()> {
        if let Some(credential) = &self.credential {
            let mut value =
                HeaderValue::from_str(&format!("Bearer {}", credential.expose_secret()))
                    .map_err(|_| Error::config("credential is not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        for (name, value) in &self.headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }

        Ok(())
    }
}

impl fmt::Debug for AuthDecorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("AuthDecorator")
            .field("credential", &self.credential.as_ref().map(|_| "[REDACTED]"))
            .field("headers", &names)
            .finish()
    }
}

/// Validates a header pair.
///
/// # Errors
///
/// [`Error::Config`] if either part is not valid HTTP.
pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::config(format!("invalid header name: {name:?}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|_| Error::config(format!("invalid value for header {name:?}")))?;
    Ok((header_name, header_value))
}

// ============================================================================
// Tests
// ============================================================================
