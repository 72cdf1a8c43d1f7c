//! Session configuration.

use std::time::Duration;

use conduit_settings::ConnectionSettings;

/// What to do when the connection is lost or cannot be opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Treat loss as fatal and ask the host to shut down.
    Strict,
    /// Retry once after the reconnect delay, indefinitely.
    Lenient,
}

/// Controller endpoint and connection behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// WebSocket URL.
    pub url: String,
    /// Bearer token.
    pub token: String,
    /// `Origin` header; `None` refuses to connect.
    pub origin: Option<String>,
    /// Failure policy.
    pub policy: FailurePolicy,
    /// Fixed delay before a lenient reconnect.
    pub reconnect_delay: Duration,
    /// Handshake timeout.
    pub connect_timeout: Duration,
}

impl SessionConfig {
    /// Build from loaded settings. An empty origin becomes `None`.
    pub fn from_settings(settings: &ConnectionSettings) -> Self {
        let origin = settings.origin.trim();
        Self {
            url: settings.server_url.clone(),
            token: settings.jwt_token.clone(),
            origin: (!origin.is_empty()).then(|| origin.to_string()),
            policy: if settings.strict_mode {
                FailurePolicy::Strict
            } else {
                FailurePolicy::Lenient
            },
            reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_settings(&ConnectionSettings::default())
    }
}
