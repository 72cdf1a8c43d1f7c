//! Message handler table and async dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_core::{InboundMessage, OutboundResponse};
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::warn;

use crate::context::ProtocolContext;
use crate::errors::{ProtocolError, UNKNOWN_TYPE};
use crate::types::MessageType;

/// Trait implemented by every message handler.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle the message payload. `Ok` text becomes the response `result`.
    async fn handle(&self, data: Value, ctx: &ProtocolContext) -> Result<String, ProtocolError>;
}

/// Table mapping message types to handlers.
pub struct HandlerTable {
    handlers: HashMap<MessageType, Arc<dyn MessageHandler>>,
}

impl HandlerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a message type.
    pub fn register(&mut self, kind: MessageType, handler: impl MessageHandler + 'static) {
        let _ = self.handlers.insert(kind, Arc::new(handler));
    }

    /// Dispatch a message to its handler. Always returns a response for the
    /// message id.
    pub async fn dispatch(&self, message: InboundMessage, ctx: &ProtocolContext) -> OutboundResponse {
        let tag = message.message_type.clone();
        counter!("conduit_messages_total", "type" => tag.clone()).increment(1);

        let Some(handler) = MessageType::parse(&tag).and_then(|kind| self.handlers.get(&kind)) else {
            counter!("conduit_message_errors_total", "type" => tag.clone(), "error_type" => UNKNOWN_TYPE).increment(1);
            warn!(message_type = %tag, id = %message.id, "unknown message type");
            return OutboundResponse::failure(message.id, ProtocolError::UnknownType(tag).to_string());
        };

        let start = std::time::Instant::now();
        let response = match handler.handle(message.data, ctx).await {
            Ok(result) => OutboundResponse::success(message.id, result),
            Err(err) => {
                counter!("conduit_message_errors_total", "type" => tag.clone(), "error_type" => err.code()).increment(1);
                warn!(message_type = %tag, id = %message.id, error = %err, "message handler failed");
                OutboundResponse::failure(message.id, err.to_string())
            }
        };

        histogram!("conduit_message_duration_seconds", "type" => tag)
            .record(start.elapsed().as_secs_f64());

        response
    }

    /// List all registered message types (sorted by tag).
    pub fn message_types(&self) -> Vec<MessageType> {
        let mut kinds: Vec<MessageType> = self.handlers.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    /// Check whether a message type has a handler.
    pub fn has_handler(&self, kind: MessageType) -> bool {
        self.handlers.contains_key(&kind)
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}
