//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings file {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The settings file, or the merged layers, are not valid settings JSON.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A merged value would make the bridge misbehave at runtime.
    #[error("invalid setting `{key}`: {reason}")]
    InvalidValue {
        /// Dotted camelCase path as written in the settings file.
        key: &'static str,
        /// What is wrong with the value.
        reason: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            reason: reason.into(),
        }
    }

    /// Settings key at fault, for validation errors.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            Self::InvalidValue { key, .. } => Some(*key),
            Self::Read { .. } | Self::Json(_) => None,
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err = SettingsError::Json(json_err);
        assert!(err.to_string().contains("parse settings JSON"));
        assert_eq!(err.key(), None);
    }

    #[test]
    fn invalid_value_names_the_key() {
        let err = SettingsError::invalid("connection.reconnectDelayMs", "must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid setting `connection.reconnectDelayMs`: must be > 0"
        );
        assert_eq!(err.key(), Some("connection.reconnectDelayMs"));
    }

    #[test]
    fn read_error_names_the_file() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/conduit.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(
            err.to_string(),
            "failed to read settings file /etc/conduit.json: denied"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
