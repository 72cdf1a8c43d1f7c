//! Wire-format types for the controller connection.
//!
//! Inbound: `{ "id": string, "type": string, "data": any }`
//! Outbound response: `{ "id": string, "result"?: string, "error"?: string }`
//! Outbound event: `{ "eventType": string, "data": object|null }`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::EnvelopeError;

/// Well-known outbound event types.
pub mod event_types {
    /// A compiled custom command was invoked in the host.
    pub const CUSTOM_COMMAND_EXECUTED: &str = "custom_command_executed";
    /// The host finished starting.
    pub const SERVER_STARTED: &str = "server_started";
    /// The host is shutting down.
    pub const SERVER_STOPPING: &str = "server_stopping";
}

/// A request from the controller.
#[derive(Clone, Debug, PartialEq)]
pub struct InboundMessage {
    /// Correlation id echoed in the response.
    pub id: String,
    /// Message type tag (e.g. `register_command`).
    pub message_type: String,
    /// Type-specific payload; `Null` when absent.
    pub data: Value,
}

impl InboundMessage {
    /// Parse one complete message text.
    ///
    /// `id` may be a JSON string or number (numbers are stringified); `type`
    /// must be a string.
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        if raw.trim().is_empty() {
            return Err(EnvelopeError::Empty);
        }

        let Value::Object(mut map) = serde_json::from_str::<Value>(raw)? else {
            return Err(EnvelopeError::NotAnObject);
        };

        let id = match map.remove("id") {
            None | Some(Value::Null) => return Err(EnvelopeError::MissingField("id")),
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(EnvelopeError::InvalidField("id")),
        };

        let message_type = match map.remove("type") {
            None | Some(Value::Null) => return Err(EnvelopeError::MissingField("type")),
            Some(Value::String(s)) => s,
            Some(_) => return Err(EnvelopeError::InvalidField("type")),
        };

        Ok(Self {
            id,
            message_type,
            data: map.remove("data").unwrap_or(Value::Null),
        })
    }
}

/// Response correlated to exactly one [`InboundMessage`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundResponse {
    /// Echoed request id.
    pub id: String,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Failure description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OutboundResponse {
    /// Build a success response.
    pub fn success(id: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: Some(result.into()),
            error: None,
        }
    }

    /// Build an error response.
    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    /// Whether this response carries an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One-way, uncorrelated event pushed to the controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    /// Event type (see [`event_types`]).
    #[serde(rename = "eventType")]
    pub event_type: String,
    /// Event payload, serialized as `null` when absent.
    pub data: Option<Value>,
}

impl OutboundEvent {
    /// Create an event.
    pub fn new(event_type: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            data,
        }
    }
}

/// Fire-and-forget event emitter.
///
/// Implementations never report failure: an event that cannot be delivered
/// (no live connection, full queue) is dropped.
pub trait EventSink: Send + Sync {
    /// Emit an event.
    fn emit(&self, event: OutboundEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn parse_full_envelope() {
        let msg = InboundMessage::parse(r#"{"id":"1","type":"chat","data":"hi"}"#).unwrap();
        assert_eq!(msg.id, "1");
        assert_eq!(msg.message_type, "chat");
        assert_eq!(msg.data, json!("hi"));
    }

    #[test]
    fn parse_numeric_id() {
        let msg = InboundMessage::parse(r#"{"id":42,"type":"clear_commands"}"#).unwrap();
        assert_eq!(msg.id, "42");
        assert!(msg.data.is_null());
    }

    #[test]
    fn parse_rejects_empty() {
        assert_matches!(InboundMessage::parse("   "), Err(EnvelopeError::Empty));
    }

    #[test]
    fn parse_rejects_bare_string() {
        assert_matches!(
            InboundMessage::parse(r#""hello""#),
            Err(EnvelopeError::NotAnObject)
        );
    }

    #[test]
    fn parse_rejects_array() {
        assert_matches!(InboundMessage::parse("[1,2]"), Err(EnvelopeError::NotAnObject));
    }

    #[test]
    fn parse_rejects_non_json() {
        assert_matches!(InboundMessage::parse("not json"), Err(EnvelopeError::Json(_)));
    }

    #[test]
    fn parse_requires_id() {
        assert_matches!(
            InboundMessage::parse(r#"{"type":"chat"}"#),
            Err(EnvelopeError::MissingField("id"))
        );
        assert_matches!(
            InboundMessage::parse(r#"{"id":null,"type":"chat"}"#),
            Err(EnvelopeError::MissingField("id"))
        );
    }

    #[test]
    fn parse_requires_type() {
        assert_matches!(
            InboundMessage::parse(r#"{"id":"1"}"#),
            Err(EnvelopeError::MissingField("type"))
        );
        assert_matches!(
            InboundMessage::parse(r#"{"id":"1","type":7}"#),
            Err(EnvelopeError::InvalidField("type"))
        );
    }

    #[test]
    fn success_response_has_no_error_field() {
        let resp = OutboundResponse::success("1", "ok");
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v, json!({"id": "1", "result": "ok"}));
        assert!(!resp.is_error());
    }

    #[test]
    fn failure_response_has_no_result_field() {
        let resp = OutboundResponse::failure("2", "boom");
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v, json!({"id": "2", "error": "boom"}));
        assert!(resp.is_error());
    }

    #[test]
    fn event_without_data_serializes_null() {
        let event = OutboundEvent::new(event_types::SERVER_STARTED, None);
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v, json!({"eventType": "server_started", "data": null}));
    }

    #[test]
    fn event_with_data() {
        let event = OutboundEvent::new("x", Some(json!({"a": 1})));
        let text = serde_json::to_string(&event).unwrap();
        assert!(text.contains(r#""eventType":"x""#));
        assert!(text.contains(r#""data":{"a":1}"#));
    }
}
