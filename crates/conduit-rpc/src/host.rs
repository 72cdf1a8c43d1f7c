//! Seam to the host process.

use async_trait::async_trait;
use conduit_core::HostError;

/// Host operations the protocol layer needs.
///
/// Implementations hand work to the host's own loop; every method is safe to
/// call from the network task.
#[async_trait]
pub trait Host: Send + Sync {
    /// Run a command string as the console and return its captured output.
    async fn execute(&self, command: &str) -> Result<String, HostError>;

    /// Broadcast a chat message to everyone on the host.
    async fn broadcast(&self, message: &str) -> Result<(), HostError>;

    /// Ask the host to stop. Returns immediately.
    fn shutdown(&self);
}
