//! Inbound message type tags.

use std::fmt;

/// Recognized values of the envelope `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Run a host command string and return its output.
    Command,
    /// Broadcast a chat message host-wide.
    Chat,
    /// Store a `CommandSpec`.
    RegisterCommand,
    /// Remove a stored spec by name.
    UnregisterCommand,
    /// Remove every stored spec.
    ClearCommands,
}

impl MessageType {
    /// Every recognized type.
    pub const ALL: [MessageType; 5] = [
        Self::Command,
        Self::Chat,
        Self::RegisterCommand,
        Self::UnregisterCommand,
        Self::ClearCommands,
    ];

    /// Parse a wire tag. `None` for unrecognized tags.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "command" => Some(Self::Command),
            "chat" => Some(Self::Chat),
            "register_command" => Some(Self::RegisterCommand),
            "unregister_command" => Some(Self::UnregisterCommand),
            "clear_commands" => Some(Self::ClearCommands),
            _ => None,
        }
    }

    /// Wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Chat => "chat",
            Self::RegisterCommand => "register_command",
            Self::UnregisterCommand => "unregister_command",
            Self::ClearCommands => "clear_commands",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
