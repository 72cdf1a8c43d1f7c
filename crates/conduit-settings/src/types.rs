//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a partial
//! JSON file only needs the keys it overrides.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the bridge.
///
/// ```json
/// {
///   "connection": { "serverUrl": "wss://controller.example:8082", "origin": "lobby-1" },
///   "commands": { "file": "config/custom_commands.json" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConduitSettings {
    /// Controller connection.
    pub connection: ConnectionSettings,
    /// Custom command persistence.
    pub commands: CommandSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl ConduitSettings {
    /// Reject values that would make the bridge misbehave at runtime.
    ///
    /// An empty `origin` is allowed here; the session refuses to connect
    /// without one.
    pub fn validate(&self) -> Result<()> {
        let url = &self.connection.server_url;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(SettingsError::invalid(
                "connection.serverUrl",
                format!("must use ws:// or wss://, got '{url}'"),
            ));
        }
        if self.connection.reconnect_delay_ms == 0 {
            return Err(SettingsError::invalid("connection.reconnectDelayMs", "must be > 0"));
        }
        if self.connection.connect_timeout_ms == 0 {
            return Err(SettingsError::invalid("connection.connectTimeoutMs", "must be > 0"));
        }
        if self.commands.file.trim().is_empty() {
            return Err(SettingsError::invalid("commands.file", "must not be empty"));
        }
        Ok(())
    }
}

/// Controller connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// WebSocket endpoint of the controller.
    pub server_url: String,
    /// Bearer token sent in the `Authorization` header.
    pub jwt_token: String,
    /// Value of the `Origin` header. Required to connect.
    pub origin: String,
    /// Treat a lost connection as fatal and stop the host.
    pub strict_mode: bool,
    /// Fixed delay before a lenient reconnect attempt.
    pub reconnect_delay_ms: u64,
    /// Upper bound on the WebSocket handshake.
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:8082".to_string(),
            jwt_token: String::new(),
            origin: String::new(),
            strict_mode: true,
            reconnect_delay_ms: 1000,
            connect_timeout_ms: 5000,
        }
    }
}

/// Custom command persistence settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandSettings {
    /// Registry file path.
    pub file: String,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            file: "custom_commands.json".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
