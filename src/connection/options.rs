//! Connection options.
//!
//! [`Runtime`] is fixed at construction; [`ConnectOptions`] applies to a
//! single `connect` call.

// ============================================================================
// Constants
// ============================================================================

/// Query parameter naming the model to open a session with.
pub const MODEL_PARAM: &str = "model";

// ============================================================================
// Runtime
// ============================================================================

/// Where the client runs.
///
/// Declared by the caller; the crate never inspects its environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Runtime {
    /// Native process. Credentials are private to the process.
    #[default]
    Native,
    /// Browser-like host where page scripts can read the credential.
    ///
    /// Requires an explicit opt-in when a credential is configured.
    Browser,
}

impl Runtime {
    /// Returns `true` if credentials would be visible to untrusted scripts.
    #[inline]
    #[must_use]
    pub const fn exposes_credentials(self) -> bool {
        matches!(self, Self::Browser)
    }
}

// ============================================================================
// ConnectOptions
// ============================================================================

/// Options for one `connect` call.
///
/// # Example
///
/// ```
/// use realtime_client::ConnectOptions;
///
/// let options = ConnectOptions::new().model("gpt-4o-realtime-preview");
/// assert_eq!(options.model_name(), Some("gpt-4o-realtime-preview"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Model to request, sent as the `model` query parameter.
    model: Option<String>,
}

impl ConnectOptions {
    /// Creates empty options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a model.
    ///
    /// Ignored when the configured URL already names one.
    #[inline]
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Returns the requested model.
    #[inline]
    #[must_use]
    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref()
    }
}

// ============================================================================
// Tests
// ============================================================================
