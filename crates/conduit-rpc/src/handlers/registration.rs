//! Custom command registration handlers.
//!
//! Changes take full effect after a host restart; a live host only gets a
//! placeholder for new or changed commands.

use async_trait::async_trait;
use conduit_core::CommandSpec;
use serde_json::Value;
use tracing::{info, instrument};

use crate::context::ProtocolContext;
use crate::errors::ProtocolError;
use crate::handlers::require_string_data;
use crate::registry::MessageHandler;

/// Result text of `register_command`.
pub const REGISTERED: &str = "Command registered. Restart the server to apply changes.";
/// Result text of `unregister_command`.
pub const UNREGISTERED: &str = "Command unregistered. Restart the server to apply changes.";
/// Result text of `clear_commands`.
pub const CLEARED: &str = "All custom commands cleared. Restart the server to apply changes.";

/// Stores a `CommandSpec`. The first registration after a reconnect resets
/// the registry so the controller's replay defines it.
pub struct RegisterCommandHandler;

#[async_trait]
impl MessageHandler for RegisterCommandHandler {
    #[instrument(skip(self, data, ctx), fields(message_type = "register_command"))]
    async fn handle(&self, data: Value, ctx: &ProtocolContext) -> Result<String, ProtocolError> {
        if ctx.store.reconcile_confirm() {
            info!("first registration since reconnect, registry reset for replay");
        }

        let spec: CommandSpec =
            serde_json::from_value(data).map_err(|e| ProtocolError::InvalidData {
                message: format!("Invalid command spec: {e}"),
            })?;
        let name = spec.name.clone();
        let outcome = ctx.store.register(spec, Some(ctx.registrar.as_ref()))?;
        info!(name, ?outcome, "command registered");
        Ok(REGISTERED.to_string())
    }
}

/// Removes a stored spec by name (`data` is the name string).
pub struct UnregisterCommandHandler;

#[async_trait]
impl MessageHandler for UnregisterCommandHandler {
    #[instrument(skip(self, ctx), fields(message_type = "unregister_command"))]
    async fn handle(&self, data: Value, ctx: &ProtocolContext) -> Result<String, ProtocolError> {
        let name = require_string_data(&data, "a command name")?;
        let existed = ctx.store.unregister(&name);
        info!(name, existed, "command unregistered");
        Ok(UNREGISTERED.to_string())
    }
}

/// Removes every stored spec.
pub struct ClearCommandsHandler;

#[async_trait]
impl MessageHandler for ClearCommandsHandler {
    #[instrument(skip(self, _data, ctx), fields(message_type = "clear_commands"))]
    async fn handle(&self, _data: Value, ctx: &ProtocolContext) -> Result<String, ProtocolError> {
        ctx.store.clear();
        info!("all custom commands cleared");
        Ok(CLEARED.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_helpers::make_test_context;
    use assert_matches::assert_matches;
    use conduit_commands::{Executable, PLACEHOLDER_FEEDBACK};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn heal() -> Value {
        json!({"name": "heal", "arguments": [{"name": "target", "type": "player"}]})
    }

    #[tokio::test]
    async fn register_stores_and_installs_placeholder() {
        let (ctx, host, _dir) = make_test_context();
        let out = RegisterCommandHandler.handle(heal(), &ctx).await.unwrap();
        assert_eq!(out, REGISTERED);
        assert!(ctx.store.get("heal").is_some());

        let installed = host.installed.lock();
        assert_eq!(installed.len(), 1);
        assert_eq!(
            installed[0].executes,
            Some(Executable::Feedback(PLACEHOLDER_FEEDBACK.to_string()))
        );
    }

    #[tokio::test]
    async fn register_twice_installs_once() {
        let (ctx, host, _dir) = make_test_context();
        let _ = RegisterCommandHandler.handle(heal(), &ctx).await.unwrap();
        let _ = RegisterCommandHandler.handle(heal(), &ctx).await.unwrap();
        assert_eq!(host.installed.lock().len(), 1);
        assert_eq!(ctx.store.len(), 1);
    }

    #[tokio::test]
    async fn register_while_host_not_live_only_stores() {
        let (ctx, host, _dir) = make_test_context();
        host.live.store(false, Ordering::SeqCst);
        let _ = RegisterCommandHandler.handle(heal(), &ctx).await.unwrap();
        assert!(host.installed.lock().is_empty());
        assert!(ctx.store.get("heal").is_some());
    }

    #[tokio::test]
    async fn register_rejects_malformed_spec() {
        let (ctx, _host, _dir) = make_test_context();
        let err = RegisterCommandHandler
            .handle(json!({"arguments": []}), &ctx)
            .await
            .unwrap_err();
        assert_matches!(err, ProtocolError::InvalidData { .. });
        assert!(err.to_string().starts_with("Invalid command spec"));
    }

    #[tokio::test]
    async fn register_rejects_structurally_invalid_spec() {
        let (ctx, _host, _dir) = make_test_context();
        let err = RegisterCommandHandler
            .handle(
                json!({"name": "give", "arguments": [{"name": "x"}, {"name": "x"}]}),
                &ctx,
            )
            .await
            .unwrap_err();
        assert_matches!(err, ProtocolError::Store(_));
        assert!(ctx.store.is_empty());
    }

    #[tokio::test]
    async fn first_register_after_reconnect_replaces_registry() {
        let (ctx, host, _dir) = make_test_context();
        let _ = RegisterCommandHandler.handle(heal(), &ctx).await.unwrap();
        let _ = RegisterCommandHandler
            .handle(json!({"name": "ping"}), &ctx)
            .await
            .unwrap();
        host.installed.lock().clear();

        ctx.store.reconcile_begin();
        let _ = RegisterCommandHandler.handle(heal(), &ctx).await.unwrap();

        assert!(ctx.store.get("ping").is_none());
        assert!(ctx.store.get("heal").is_some());
        assert!(host.installed.lock().is_empty());
    }

    #[tokio::test]
    async fn unregister_removes() {
        let (ctx, _host, _dir) = make_test_context();
        let _ = RegisterCommandHandler.handle(heal(), &ctx).await.unwrap();
        let out = UnregisterCommandHandler.handle(json!("heal"), &ctx).await.unwrap();
        assert_eq!(out, UNREGISTERED);
        assert!(ctx.store.is_empty());
    }

    #[tokio::test]
    async fn unregister_unknown_name_still_succeeds() {
        let (ctx, _host, _dir) = make_test_context();
        let out = UnregisterCommandHandler.handle(json!("ghost"), &ctx).await.unwrap();
        assert_eq!(out, UNREGISTERED);
    }

    #[tokio::test]
    async fn unregister_requires_string() {
        let (ctx, _host, _dir) = make_test_context();
        let err = UnregisterCommandHandler
            .handle(json!({"name": "heal"}), &ctx)
            .await
            .unwrap_err();
        assert_matches!(err, ProtocolError::InvalidData { .. });
    }

    #[tokio::test]
    async fn clear_empties_registry() {
        let (ctx, _host, _dir) = make_test_context();
        let _ = RegisterCommandHandler.handle(heal(), &ctx).await.unwrap();
        let out = ClearCommandsHandler.handle(Value::Null, &ctx).await.unwrap();
        assert_eq!(out, CLEARED);
        assert!(ctx.store.is_empty());
        let file = std::fs::read_to_string(ctx.store.path()).unwrap();
        assert_eq!(serde_json::from_str::<Value>(&file).unwrap(), json!([]));
    }
}
