//! Type-safe identifiers.
//!
//! Newtype wrappers keep event ids and subscription handles from being mixed
//! up with plain strings and integers.
//!
//! | Type | Wraps | Source |
//! |------|-------|--------|
//! | [`EventId`] | `String` | Stamped on outbound events, copied from inbound |
//! | [`SubscriptionId`] | `u64` | Returned by event bus registrations |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Prefix for locally generated event ids.
const EVENT_ID_PREFIX: &str = "evt_";

/// Number of random hex characters after the prefix.
const EVENT_ID_RANDOM_LEN: usize = 21;

// ============================================================================
// EventId
// ============================================================================

/// Identifier carried in an event's `event_id` field.
///
/// Outbound ids look like `evt_3f9a0c...`. Inbound ids are whatever the
/// remote peer assigned and are never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Generates a fresh, unique event id.
    #[must_use]
    pub fn generate() -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{EVENT_ID_PREFIX}{}",
            &random[..EVENT_ID_RANDOM_LEN]
        ))
    }

    /// Wraps an existing id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EventId> for String {
    fn from(id: EventId) -> Self {
        id.0
    }
}

// ============================================================================
// SubscriptionId
// ============================================================================

/// Global counter for subscription handles.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned when registering on an event bus.
///
/// Pass it to `off` to remove exactly that registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates the next subscription id.
    #[inline]
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
