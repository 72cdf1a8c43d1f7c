//! Outbound queue to the live connection's writer task.

use conduit_core::{EventSink, OutboundEvent, OutboundResponse};
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Writer queue capacity per connection.
pub const OUTBOX_CAPACITY: usize = 256;

struct Attached {
    generation: u64,
    tx: mpsc::Sender<String>,
}

/// Hands serialized frames to whichever connection is live.
///
/// Events are best-effort: dropped when no connection is attached or the
/// queue is full. Responses wait for queue space but are dropped if the
/// connection has gone away.
#[derive(Default)]
pub struct Outbox {
    attached: Mutex<Option<Attached>>,
}

impl Outbox {
    /// Create a detached outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route frames to a new connection's writer.
    pub fn attach(&self, generation: u64, tx: mpsc::Sender<String>) {
        *self.attached.lock() = Some(Attached { generation, tx });
    }

    /// Detach if `generation` is still the attached connection.
    pub fn detach(&self, generation: u64) {
        let mut attached = self.attached.lock();
        if attached.as_ref().is_some_and(|a| a.generation == generation) {
            *attached = None;
        }
    }

    /// Detach whatever is attached.
    pub fn detach_all(&self) {
        *self.attached.lock() = None;
    }

    /// Whether a connection is attached.
    pub fn is_attached(&self) -> bool {
        self.attached.lock().as_ref().is_some_and(|a| !a.tx.is_closed())
    }

    fn sender(&self) -> Option<mpsc::Sender<String>> {
        self.attached.lock().as_ref().map(|a| a.tx.clone())
    }

    /// Queue a response. Dropped if no connection is open.
    pub async fn send_response(&self, response: &OutboundResponse) {
        let Some(tx) = self.sender() else {
            debug!(id = %response.id, "connection closed, dropping response");
            return;
        };
        let text = match serde_json::to_string(response) {
            Ok(t) => t,
            Err(e) => {
                warn!(id = %response.id, error = %e, "failed to serialize response");
                return;
            }
        };
        if tx.send(text).await.is_err() {
            debug!(id = %response.id, "connection closed, dropping response");
        }
    }
}

impl EventSink for Outbox {
    fn emit(&self, event: OutboundEvent) {
        let Some(tx) = self.sender() else {
            counter!("conduit_events_dropped_total", "reason" => "disconnected").increment(1);
            debug!(event_type = %event.event_type, "no connection, dropping event");
            return;
        };
        let text = match serde_json::to_string(&event) {
            Ok(t) => t,
            Err(e) => {
                warn!(event_type = %event.event_type, error = %e, "failed to serialize event");
                return;
            }
        };
        if tx.try_send(text).is_err() {
            counter!("conduit_events_dropped_total", "reason" => "queue").increment(1);
            debug!(event_type = %event.event_type, "writer queue unavailable, dropping event");
        }
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("attached", &self.is_attached())
            .finish()
    }
}
