use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Domain events surfaced to the UI, fire-and-forget.
///
/// Payload shapes are fixed: consumers must not rely on any other fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DomainEvent {
    WalletConnected { account: String },
    AccountChanged { account: Option<String> },
    NoProvider,
    NetworkChanged { chain_id: String },
}

/// Typed event channel between the connection layer and its consumers.
///
/// Subscribers register by event stream rather than by string name; a bus
/// with no subscribers silently drops events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: DomainEvent) {
        debug!(?event, "emitting domain event");
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}
