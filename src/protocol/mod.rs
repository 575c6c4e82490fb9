//! Wire protocol types.
//!
//! Every message in both directions is one JSON object per text frame with a
//! required `type` field. Outbound messages also carry a fresh `event_id`.
//!
//! # Protocol Overview
//!
//! | Direction | Local event name | Example |
//! |-----------|------------------|---------|
//! | Local → Remote | `client.<type>` | `client.response.create` |
//! | Remote → Local | `server.<type>` | `server.session.created` |
//! | Synthetic | `close` | `{ "error": false }` |
//! | Synthetic | `error` | malformed inbound frame |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | The [`Event`] envelope |
//! | `names` | Local event-name namespace helpers |

// ============================================================================
// Submodules
// ============================================================================

/// Event envelope type.
pub mod event;

/// Local event-name namespace.
pub mod names;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::Event;
