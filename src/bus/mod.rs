//! Publish/subscribe event bus.
//!
//! Decouples producers of named events from any number of consumers.
//!
//! # Matching
//!
//! | Registered under | Receives |
//! |------------------|----------|
//! | `server.error` | dispatches of exactly `server.error` |
//! | `server.*` | every dispatch whose name starts with `server.` |
//! | `close` | dispatches of exactly `close` |
//!
//! # Subscription Kinds
//!
//! | Method | Kind | Lifetime |
//! |--------|------|----------|
//! | [`EventBus::on`] | Persistent | Until `off` / `clear` |
//! | [`EventBus::once`] | Once | Until first match |
//! | [`EventBus::wait_for_next`] | Waiter | Until first match, timeout, or drop |

// ============================================================================
// Submodules
// ============================================================================

/// Event bus and dispatch logic.
pub mod core;

/// Subscription records.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::EventBus;
pub use subscription::Handler;
