//! `chat`: host-wide broadcast.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::context::ProtocolContext;
use crate::errors::ProtocolError;
use crate::handlers::require_string_data;
use crate::registry::MessageHandler;

/// Result text of a successful broadcast.
pub const BROADCAST_RESULT: &str = "Message broadcasted";

/// Broadcasts `data` (a chat line) to everyone on the host.
pub struct ChatHandler;

#[async_trait]
impl MessageHandler for ChatHandler {
    #[instrument(skip(self, data, ctx), fields(message_type = "chat"))]
    async fn handle(&self, data: Value, ctx: &ProtocolContext) -> Result<String, ProtocolError> {
        let message = require_string_data(&data, "a chat message")?;
        ctx.host.broadcast(&message).await?;
        Ok(BROADCAST_RESULT.to_string())
    }
}
