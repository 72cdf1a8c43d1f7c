//! Shared dependencies for message handlers.

use std::sync::Arc;

use conduit_commands::{CommandRegistrar, CommandStore};

use crate::host::Host;

/// Everything a handler may touch.
#[derive(Clone)]
pub struct ProtocolContext {
    /// Host command execution and broadcast.
    pub host: Arc<dyn Host>,
    /// Host interpreter registration.
    pub registrar: Arc<dyn CommandRegistrar>,
    /// Persistent custom command registry.
    pub store: Arc<CommandStore>,
}

impl std::fmt::Debug for ProtocolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolContext")
            .field("store", &self.store.path())
            .finish_non_exhaustive()
    }
}
