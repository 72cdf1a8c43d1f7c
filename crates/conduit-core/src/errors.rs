//! Error types shared across the bridge.

use thiserror::Error;

/// Failure of a call into the host process.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host is not running (not yet started, or already stopping).
    #[error("host is not running")]
    NotRunning,

    /// The host loop dropped the task before replying.
    #[error("host dropped the request")]
    Dropped,

    /// The host rejected the request.
    #[error("{0}")]
    Rejected(String),
}

/// Structural problem in a [`CommandSpec`](crate::CommandSpec).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    /// Command or subcommand name is empty.
    #[error("command name must not be empty")]
    EmptyName,

    /// Name contains whitespace and could never be typed as one token.
    #[error("name '{0}' must not contain whitespace")]
    InvalidName(String),

    /// Argument name is empty.
    #[error("argument name must not be empty in '{command}'")]
    EmptyArgumentName {
        /// Owning command path.
        command: String,
    },

    /// Two arguments on the same chain share a name.
    #[error("duplicate argument '{argument}' in '{command}'")]
    DuplicateArgument {
        /// Owning command path.
        command: String,
        /// Repeated argument name.
        argument: String,
    },

    /// Two subcommands share a name.
    #[error("duplicate subcommand '{subcommand}' in '{command}'")]
    DuplicateSubcommand {
        /// Parent command.
        command: String,
        /// Repeated subcommand name.
        subcommand: String,
    },
}

/// Inbound payload that is not a usable message envelope.
///
/// No response can be sent for these: without an `id` there is nothing to
/// correlate with.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Message text was empty or whitespace.
    #[error("empty message")]
    Empty,

    /// Message text was not JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Message was JSON but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// A required field was absent or null.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// A required field had the wrong JSON type.
    #[error("field '{0}' has an invalid type")]
    InvalidField(&'static str),
}
