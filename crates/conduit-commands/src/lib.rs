//! # conduit-commands
//!
//! Declarative commands, from JSON to a running parse tree.
//!
//! - [`compiler`] turns a [`CommandSpec`](conduit_core::CommandSpec) into a
//!   [`CommandNode`] tree
//! - [`dispatcher`] runs a matched leaf and emits `custom_command_executed`
//! - [`interpreter`] is the host-side tree walker that owns installed roots
//! - [`store`] persists the registry and reconciles it across reconnects

#![deny(unsafe_code)]

pub mod compiler;
pub mod dispatcher;
pub mod errors;
pub mod interpreter;
pub mod node;
pub mod registrar;
pub mod store;

pub use compiler::{PLACEHOLDER_FEEDBACK, compile, placeholder};
pub use dispatcher::{COMMAND_SUCCESS, Dispatcher, ExecutionRecord, Invocation, SenderKind};
pub use errors::{ArgumentError, InterpretError, StoreError};
pub use interpreter::{ArgumentResolver, Interpreter, ItemRef, Outcome, Sender};
pub use node::{CommandNode, Executable, Leaf, NodeKind, ParameterType};
pub use registrar::CommandRegistrar;
pub use store::{CommandStore, RegisterOutcome};
