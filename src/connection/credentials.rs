//! Endpoint and credential resolution.
//!
//! Three sources can supply the credential: an explicit value, an `api-key`
//! query parameter already in the URL, or neither (an error).
//!
//! | URL `api-key` | Explicit | Result |
//! |---------------|----------|--------|
//! | `X` | `X` | credential `X`, URL unchanged |
//! | `X` | `Y` | configuration error |
//! | `X` | none | credential `X`, URL unchanged |
//! | none | `Y` | credential `Y`, `api-key=Y` appended to URL |
//! | none | none | configuration error |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Endpoint used when no URL is configured.
pub const DEFAULT_URL: &str = "wss://api.openai.com/v1/realtime";

/// Query parameter carrying the credential.
pub const CREDENTIAL_PARAM: &str = "api-key";

// ============================================================================
// ResolvedEndpoint
// ============================================================================

/// A validated URL plus the credential it was resolved with.
pub(crate) struct ResolvedEndpoint {
    /// URL with the credential in its query string.
    pub url: Url,
    /// The resolved credential.
    pub credential: Arc<SecretString>,
}

/// Resolves the final endpoint.
///
/// # Errors
///
/// [`Error::Url`] if the URL does not parse. [`Error::Config`] if it is not
/// `ws`/`wss`, if the URL and explicit credentials disagree, or if no
/// credential is available.
pub(crate) fn resolve(url: Option<&str>, explicit: Option<&SecretString>) -> Result<ResolvedEndpoint> {
    let mut url = Url::parse(url.unwrap_or(DEFAULT_URL))?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(Error::config(format!(
            "URL scheme must be ws or wss, got {:?}",
            url.scheme()
        )));
    }

    let embedded = embedded_credential(&url);
    let explicit = explicit
        .map(|secret| secret.expose_secret())
        .filter(|value| !value.is_empty());

    let credential = match (embedded, explicit) {
        (Some(embedded), Some(explicit)) if embedded != explicit => {
            return Err(Error::config(format!(
                "URL {CREDENTIAL_PARAM} does not match the explicit credential"
            )));
        }
        (Some(embedded), _) => embedded,
        (None, Some(explicit)) => {
            let explicit = explicit.to_string();
            url.query_pairs_mut()
                .append_pair(CREDENTIAL_PARAM, &explicit);
            explicit
        }
        (None, None) => {
            return Err(Error::config(format!(
                "credential required: pass one explicitly or set {CREDENTIAL_PARAM} in the URL"
            )));
        }
    };

    Ok(ResolvedEndpoint {
        url,
        credential: Arc::new(SecretString::from(credential)),
    })
}

/// Returns the non-empty `api-key` query value, if any.
fn embedded_credential(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == CREDENTIAL_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Returns `url` with the credential value masked, for logs.
#[must_use]
pub(crate) fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == CREDENTIAL_PARAM {
                "REDACTED".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    if pairs.is_empty() {
        return redacted.to_string();
    }

    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

// ============================================================================
// Tests
// ============================================================================
