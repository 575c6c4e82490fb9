//! Event envelope.
//!
//! An [`Event`] is a flat JSON object carrying at least a non-empty `type`.
//! Outbound events also carry a freshly stamped `event_id`:
//!
//! ```json
//! {
//!   "event_id": "evt_5b0f2c1d9e8a7b6c5d4e3",
//!   "type": "response.create",
//!   "response": { ... }
//! }
//! ```
//!
//! Events are immutable once built and cheap to clone, so one inbound frame
//! can be handed to any number of handlers and waiters.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::EventId;

// ============================================================================
// Constants
// ============================================================================

/// Envelope field holding the event id.
pub const EVENT_ID_FIELD: &str = "event_id";

/// Envelope field holding the event type.
pub const TYPE_FIELD: &str = "type";

// ============================================================================
// Event
// ============================================================================

/// A typed, flat JSON record exchanged over the connection.
#[derive(Clone, PartialEq)]
pub struct Event {
    fields: Arc<Map<String, Value>>,
}

impl Event {
    /// Wraps `payload` in an outbound envelope.
    ///
    /// Stamps a fresh `event_id` and the given `type` onto the payload's
    /// top-level fields. Stamped fields replace same-named payload fields.
    ///
    /// # Errors
    ///
    /// - [`Error::State`] if `event_type` is empty
    /// - [`Error::State`] if `payload` is present but not a JSON object
    pub fn envelope(event_type: &str, payload: Option<Value>) -> Result<Self> {
        if event_type.is_empty() {
            return Err(Error::state("event type must not be empty"));
        }

        let mut fields = match payload {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(Error::state(format!(
                    "payload must be a JSON object, got {}",
                    json_kind(&other)
                )));
            }
        };

        fields.insert(
            EVENT_ID_FIELD.to_string(),
            Value::String(EventId::generate().into()),
        );
        fields.insert(TYPE_FIELD.to_string(), Value::String(event_type.to_string()));

        Ok(Self {
            fields: Arc::new(fields),
        })
    }

    /// Decodes one inbound text frame.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if `raw` is not a JSON object with a non-empty
    /// string `type`.
    pub fn decode(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::protocol(format!("inbound frame is not valid JSON: {e}")))?;

        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(Error::protocol(format!(
                "inbound frame must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Builds an event from an existing map, keeping its `event_id` as is.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if `type` is missing, not a string, or empty.
    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        match map.get(TYPE_FIELD) {
            Some(Value::String(t)) if !t.is_empty() => Ok(Self {
                fields: Arc::new(map),
            }),
            Some(Value::String(_)) => Err(Error::protocol("event `type` is empty")),
            Some(_) => Err(Error::protocol("event `type` is not a string")),
            None => Err(Error::protocol("event is missing `type`")),
        }
    }

    /// Builds a locally generated event that never goes on the wire.
    pub(crate) fn synthetic(event_type: &str, mut fields: Map<String, Value>) -> Self {
        fields.insert(
            EVENT_ID_FIELD.to_string(),
            Value::String(EventId::generate().into()),
        );
        fields.insert(TYPE_FIELD.to_string(), Value::String(event_type.to_string()));
        Self {
            fields: Arc::new(fields),
        }
    }

    /// Serializes the event as a single text frame.
    ///
    /// # Errors
    ///
    /// [`Error::Json`] if serialization fails.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self.fields.as_ref())?)
    }

    /// Returns the event type.
    #[inline]
    #[must_use]
    pub fn event_type(&self) -> &str {
        self.fields
            .get(TYPE_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Returns the event id, if the event carries one.
    #[inline]
    #[must_use]
    pub fn event_id(&self) -> Option<&str> {
        self.fields.get(EVENT_ID_FIELD).and_then(Value::as_str)
    }

    /// Returns a field by name.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns all fields.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Returns the event as an owned JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.as_ref().clone())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type())
            .field("event_id", &self.event_id())
            .field("fields", &self.fields.len())
            .finish()
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Names the JSON kind of a value for error messages.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
