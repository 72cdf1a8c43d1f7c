//! Seam to the host interpreter's registration API.

use crate::node::CommandNode;

/// Installs compiled roots into a running host interpreter.
///
/// `register` must not block: implementations hand the node to the host's
/// own loop and return.
pub trait CommandRegistrar: Send + Sync {
    /// Whether the host interpreter is up and accepting registrations.
    fn is_live(&self) -> bool;

    /// Install (or merge) a root literal.
    fn register(&self, node: CommandNode);
}
