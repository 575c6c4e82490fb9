//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Endpoint and credential lookup

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Environment variable holding the endpoint URL.
pub const URL_VAR: &str = "REALTIME_URL";

/// Environment variable holding the credential.
pub const KEY_VAR: &str = "REALTIME_API_KEY";

/// Model requested when `--model` is absent.
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    pub debug: bool,
    pub offline: bool,
    pub model: String,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let model = args
            .iter()
            .position(|a| a == "--model")
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            offline: args.iter().any(|a| a == "--offline"),
            model,
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        "realtime_client=debug"
    } else {
        "realtime_client=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Endpoint URL from the environment, if set.
pub fn endpoint_url() -> Option<String> {
    std::env::var(URL_VAR).ok().filter(|v| !v.is_empty())
}

/// Credential from the environment, if set.
pub fn credential() -> Option<String> {
    std::env::var(KEY_VAR).ok().filter(|v| !v.is_empty())
}
