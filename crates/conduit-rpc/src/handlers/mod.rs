//! Message handler modules and registration.

pub mod chat;
pub mod command;
pub mod registration;

use serde_json::Value;

use crate::errors::ProtocolError;
use crate::registry::HandlerTable;
use crate::types::MessageType;

/// Register every message handler with the table.
pub fn register_all(table: &mut HandlerTable) {
    table.register(MessageType::Command, command::CommandHandler);
    table.register(MessageType::Chat, chat::ChatHandler);
    table.register(MessageType::RegisterCommand, registration::RegisterCommandHandler);
    table.register(MessageType::UnregisterCommand, registration::UnregisterCommandHandler);
    table.register(MessageType::ClearCommands, registration::ClearCommandsHandler);
}

/// Require `data` to be a JSON string.
pub(crate) fn require_string_data(data: &Value, what: &str) -> Result<String, ProtocolError> {
    data.as_str()
        .map(ToOwned::to_owned)
        .ok_or_else(|| ProtocolError::InvalidData {
            message: format!("Expected {what} as a string"),
        })
}
