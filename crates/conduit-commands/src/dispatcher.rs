//! Execution of matched command leaves.
//!
//! Every invocation of a compiled leaf produces exactly one
//! `custom_command_executed` event and the fixed success status. Arguments
//! that cannot be extracted are left out of the event instead of failing the
//! command.

use std::sync::Arc;

use conduit_core::{EventSink, OutboundEvent, event_types};
use metrics::counter;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::ArgumentError;
use crate::node::{Leaf, ParameterType};

/// Status returned by every dispatched command.
pub const COMMAND_SUCCESS: i32 = 1;

/// Who ran a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    /// An in-game player.
    Player,
    /// Server console or any non-player source.
    Console,
}

/// Accessors over one parsed command invocation.
pub trait Invocation {
    /// Display name of the sender.
    fn sender_name(&self) -> &str;

    /// Sender classification.
    fn sender_kind(&self) -> SenderKind;

    /// A `string` argument.
    fn string(&self, name: &str) -> Result<String, ArgumentError>;

    /// An `integer` argument.
    fn integer(&self, name: &str) -> Result<i32, ArgumentError>;

    /// A `player` argument, as the resolved player name.
    fn player(&self, name: &str) -> Result<String, ArgumentError>;

    /// An `item` argument, as the item's translation key.
    fn item(&self, name: &str) -> Result<String, ArgumentError>;

    /// A `word` argument (also used for unrecognized types).
    fn word(&self, name: &str) -> Result<String, ArgumentError>;
}

/// Payload of a `custom_command_executed` event.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Top-level command name.
    pub command: String,
    /// Subcommand name, if the leaf sits under one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<String>,
    /// Sender display name.
    pub sender: String,
    /// `player` or `console`.
    pub sender_type: SenderKind,
    /// Extracted argument values, present when the spec declared a list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Map<String, Value>>,
}

/// Runs leaves and reports them to the controller.
#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn EventSink>,
}

impl Dispatcher {
    /// Create a dispatcher emitting through `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Build the execution record for a leaf.
    pub fn record(leaf: &Leaf, invocation: &dyn Invocation) -> ExecutionRecord {
        ExecutionRecord {
            command: leaf.command.clone(),
            subcommand: leaf.subcommand.clone(),
            sender: invocation.sender_name().to_string(),
            sender_type: invocation.sender_kind(),
            arguments: leaf
                .arguments
                .as_deref()
                .map(|declared| extract_arguments(declared, invocation)),
        }
    }

    /// Execute a leaf: emit one event, return [`COMMAND_SUCCESS`].
    pub fn execute(&self, leaf: &Leaf, invocation: &dyn Invocation) -> i32 {
        let record = Self::record(leaf, invocation);
        counter!("conduit_custom_commands_total", "command" => leaf.command.clone()).increment(1);

        match serde_json::to_value(&record) {
            Ok(data) => self
                .sink
                .emit(OutboundEvent::new(event_types::CUSTOM_COMMAND_EXECUTED, Some(data))),
            Err(e) => warn!(command = %leaf.command, error = %e, "failed to serialize execution record"),
        }
        COMMAND_SUCCESS
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

fn extract_arguments(
    declared: &[conduit_core::ArgumentSpec],
    invocation: &dyn Invocation,
) -> Map<String, Value> {
    let mut values = Map::new();
    for arg in declared {
        let name = arg.name.as_str();
        let value = match ParameterType::from(&arg.kind) {
            ParameterType::String => invocation.string(name).map(Value::from),
            ParameterType::Integer => invocation.integer(name).map(Value::from),
            ParameterType::Player => invocation.player(name).map(Value::from),
            ParameterType::Item => invocation.item(name).map(Value::from),
            ParameterType::Word => invocation.word(name).map(Value::from),
        };
        match value {
            Ok(v) => {
                let _ = values.insert(arg.name.clone(), v);
            }
            Err(e) => debug!(argument = name, error = %e, "skipping argument"),
        }
    }
    values
}
