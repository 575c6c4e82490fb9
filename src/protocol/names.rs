//! Local event-name namespace.
//!
//! Names are dotted strings. The segment before the first `.` is the
//! namespace, and `<namespace>.*` is the wildcard that matches every name in
//! that namespace.

// ============================================================================
// Constants
// ============================================================================

/// Namespace for events this side sent.
pub const CLIENT_NAMESPACE: &str = "client";

/// Namespace for events the remote peer sent.
pub const SERVER_NAMESPACE: &str = "server";

/// Wildcard for every outbound event.
pub const CLIENT_ALL: &str = "client.*";

/// Wildcard for every inbound event.
pub const SERVER_ALL: &str = "server.*";

/// Synthetic event published on every transport teardown.
pub const CLOSE: &str = "close";

/// Synthetic event published for malformed inbound frames.
pub const ERROR: &str = "error";

/// Suffix that marks a wildcard name.
const WILDCARD_SUFFIX: &str = ".*";

// ============================================================================
// Helpers
// ============================================================================

/// Local name for an outbound event type, e.g. `client.response.create`.
#[inline]
#[must_use]
pub fn client(event_type: &str) -> String {
    format!("{CLIENT_NAMESPACE}.{event_type}")
}

/// Local name for an inbound event type, e.g. `server.session.created`.
#[inline]
#[must_use]
pub fn server(event_type: &str) -> String {
    format!("{SERVER_NAMESPACE}.{event_type}")
}

/// Returns `true` if `name` is a wildcard such as `server.*`.
#[inline]
#[must_use]
pub fn is_wildcard(name: &str) -> bool {
    name.ends_with(WILDCARD_SUFFIX)
}

/// Returns the wildcard that also receives `name`, if any.
///
/// `server.response.done` → `server.*`, and `server.a.*` → `server.*`.
/// Names without a namespace and namespace wildcards themselves have none.
#[must_use]
pub fn wildcard_for(name: &str) -> Option<String> {
    let (namespace, _) = name.split_once('.')?;
    let wildcard = format!("{namespace}{WILDCARD_SUFFIX}");
    (wildcard != name).then_some(wildcard)
}

// ============================================================================
// Tests
// ============================================================================
