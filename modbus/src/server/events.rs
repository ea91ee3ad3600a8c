use tokio::sync::broadcast;

const EVENTS_CAPACITY: usize = 256;

/// Notifications for observers of the slave (displays, loggers).
/// Addresses are bank slots, i.e. protocol address + 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent {
    CoilsChanged { address: usize, count: usize },
    HoldingRegistersChanged { address: usize, count: usize },
    NumberOfConnectedClientsChanged(usize),
    LogDataChanged,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<ServerEvent>,
}

impl Default for Notifier {
    fn default() -> Self {
        Notifier::new()
    }
}

impl Notifier {
    pub fn new() -> Notifier {
        let (tx, _) = broadcast::channel(EVENTS_CAPACITY);
        Notifier { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }

    /// Having no subscribers is fine.
    pub fn notify(&self, event: ServerEvent) {
        let _ = self.tx.send(event);
    }
}
