//! Protocol error type returned by message handlers.

use conduit_commands::StoreError;
use conduit_core::HostError;

/// Payload does not have the shape the handler expects.
pub const INVALID_DATA: &str = "INVALID_DATA";
/// The envelope `type` has no handler.
pub const UNKNOWN_TYPE: &str = "UNKNOWN_TYPE";
/// The host rejected or dropped the call.
pub const HOST_ERROR: &str = "HOST_ERROR";
/// The command store rejected the change.
pub const STORE_ERROR: &str = "STORE_ERROR";

/// Per-message failure. Reported in the response `error` field; never
/// closes the connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// `data` is missing or has the wrong shape.
    #[error("{message}")]
    InvalidData {
        /// Description of what is wrong.
        message: String,
    },

    /// Unrecognized message type.
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// Host call failed.
    #[error(transparent)]
    Host(#[from] HostError),

    /// Store rejected the change.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProtocolError {
    /// Machine-readable error code for metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidData { .. } => INVALID_DATA,
            Self::UnknownType(_) => UNKNOWN_TYPE,
            Self::Host(_) => HOST_ERROR,
            Self::Store(_) => STORE_ERROR,
        }
    }
}
