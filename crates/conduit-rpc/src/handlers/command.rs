//! `command`: run a host command as the console.

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::context::ProtocolContext;
use crate::errors::ProtocolError;
use crate::handlers::require_string_data;
use crate::registry::MessageHandler;

/// Runs `data` (a command line) and returns the captured output.
pub struct CommandHandler;

#[async_trait]
impl MessageHandler for CommandHandler {
    #[instrument(skip(self, ctx), fields(message_type = "command"))]
    async fn handle(&self, data: Value, ctx: &ProtocolContext) -> Result<String, ProtocolError> {
        let command = require_string_data(&data, "a command line")?;
        Ok(ctx.host.execute(&command).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::make_test_context;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn returns_captured_output() {
        let (ctx, host, _dir) = make_test_context();
        let out = CommandHandler.handle(json!("list"), &ctx).await.unwrap();
        assert_eq!(out, "ran list");
        assert_eq!(host.executed.lock().as_slice(), ["list"]);
    }

    #[tokio::test]
    async fn host_rejection_is_error() {
        let (ctx, _host, _dir) = make_test_context();
        let err = CommandHandler.handle(json!("fail"), &ctx).await.unwrap_err();
        assert_matches!(err, ProtocolError::Host(_));
        assert_eq!(err.to_string(), "Unknown command: fail");
    }

    #[tokio::test]
    async fn non_string_data_is_invalid() {
        let (ctx, host, _dir) = make_test_context();
        let err = CommandHandler.handle(json!({"cmd": "list"}), &ctx).await.unwrap_err();
        assert_matches!(err, ProtocolError::InvalidData { .. });
        assert!(host.executed.lock().is_empty());
    }
}
