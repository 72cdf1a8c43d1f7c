//! Text message dispatch: parses one complete message and routes it through
//! the [`HandlerTable`].

use conduit_core::{InboundMessage, OutboundResponse};
use tracing::{debug, instrument, warn};

use crate::context::ProtocolContext;
use crate::registry::HandlerTable;

/// Handle one complete inbound text message.
///
/// Returns `None` for envelope defects (empty, not JSON, not an object,
/// missing or mistyped `id`/`type`); those are logged and dropped since
/// there is no id to answer.
#[instrument(skip_all, fields(message_type, id))]
pub async fn handle_message(
    text: &str,
    table: &HandlerTable,
    ctx: &ProtocolContext,
) -> Option<OutboundResponse> {
    let message = match InboundMessage::parse(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, len = text.len(), "dropping malformed message");
            return None;
        }
    };

    let span = tracing::Span::current();
    let _ = span.record("message_type", message.message_type.as_str());
    let _ = span.record("id", message.id.as_str());
    debug!("dispatching message");

    Some(table.dispatch(message, ctx).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::register_all;
    use crate::handlers::registration::{REGISTERED, UNREGISTERED};
    use crate::handlers::test_helpers::make_test_context;
    use serde_json::{Value, json};

    fn table() -> HandlerTable {
        let mut table = HandlerTable::new();
        register_all(&mut table);
        table
    }

    #[tokio::test]
    async fn empty_message_is_dropped() {
        let (ctx, _host, _dir) = make_test_context();
        assert!(handle_message("", &table(), &ctx).await.is_none());
    }

    #[tokio::test]
    async fn invalid_json_is_dropped() {
        let (ctx, _host, _dir) = make_test_context();
        assert!(handle_message("{not json", &table(), &ctx).await.is_none());
    }

    #[tokio::test]
    async fn missing_type_is_dropped() {
        let (ctx, _host, _dir) = make_test_context();
        assert!(handle_message(r#"{"id":"1"}"#, &table(), &ctx).await.is_none());
    }

    #[tokio::test]
    async fn chat_round_trip() {
        let (ctx, host, _dir) = make_test_context();
        let resp = handle_message(r#"{"id":"7","type":"chat","data":"hello"}"#, &table(), &ctx)
            .await
            .unwrap();
        assert_eq!(resp, OutboundResponse::success("7", "Message broadcasted"));
        assert_eq!(host.broadcasts.lock().as_slice(), ["hello"]);
    }

    #[tokio::test]
    async fn unknown_type_gets_error_response() {
        let (ctx, _host, _dir) = make_test_context();
        let resp = handle_message(r#"{"id":"9","type":"teleport","data":{}}"#, &table(), &ctx)
            .await
            .unwrap();
        assert_eq!(resp.id, "9");
        assert_eq!(resp.error.as_deref(), Some("Unknown message type: teleport"));
    }

    #[tokio::test]
    async fn unregister_round_trip_rewrites_registry_file() {
        let (ctx, _host, _dir) = make_test_context();
        let table = table();
        let register = json!({
            "id": "0",
            "type": "register_command",
            "data": {"name": "heal", "arguments": [{"name": "target", "type": "player"}]}
        });
        let resp = handle_message(&register.to_string(), &table, &ctx).await.unwrap();
        assert_eq!(resp, OutboundResponse::success("0", REGISTERED));
        let ping = r#"{"id":"p","type":"register_command","data":{"name":"ping"}}"#;
        let _ = handle_message(ping, &table, &ctx).await.unwrap();

        let unregister = r#"{"id":"1","type":"unregister_command","data":"heal"}"#;
        let resp = handle_message(unregister, &table, &ctx).await.unwrap();
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"id": "1", "result": UNREGISTERED})
        );

        let file = std::fs::read_to_string(ctx.store.path()).unwrap();
        let file: Value = serde_json::from_str(&file).unwrap();
        let names: Vec<&str> = file
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|spec| spec["name"].as_str())
            .collect();
        assert_eq!(names, ["ping"]);
    }
}
