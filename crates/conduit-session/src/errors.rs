//! Session error types.

use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors from opening the controller connection.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No `Origin` configured; no attempt was made.
    #[error("origin is not configured, refusing to connect")]
    MissingOrigin,

    /// URL or header values could not form a handshake request.
    #[error("invalid connection request: {0}")]
    InvalidRequest(String),

    /// Handshake failed.
    #[error("connection failed: {0}")]
    Connect(#[from] tungstenite::Error),

    /// Handshake did not finish in time.
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    /// The session was shut down.
    #[error("session is shut down")]
    ShutDown,
}
