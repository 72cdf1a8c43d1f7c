//! Error types for compiling, interpreting, and storing commands.

use conduit_core::SpecError;
use thiserror::Error;

/// Failure to extract one typed argument from an invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// No value was parsed under this name.
    #[error("argument '{0}' was not supplied")]
    Missing(String),

    /// A value exists but has a different type.
    #[error("argument '{name}' is not a {expected}")]
    TypeMismatch {
        /// Argument name.
        name: String,
        /// Requested type.
        expected: &'static str,
    },
}

/// Failure to parse an input line against the installed command tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpretError {
    /// First token matches no installed root.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Input ended at a node with no executable.
    #[error("Incomplete command: {0}")]
    Incomplete(String),

    /// Input continues past a node that accepts nothing further.
    #[error("Unexpected input at position {position}: {remaining}")]
    TrailingInput {
        /// Byte offset of the unconsumed input.
        position: usize,
        /// Unconsumed input.
        remaining: String,
    },

    /// A token did not parse or resolve as the expected argument type.
    #[error("Invalid value for '{argument}': {reason}")]
    InvalidArgument {
        /// Argument name.
        argument: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors from the command specification store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the registry file failed.
    #[error("registry I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Registry contents could not be (de)serialized.
    #[error("registry JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A spec failed structural validation.
    #[error("invalid command spec: {0}")]
    InvalidSpec(#[from] SpecError),
}
