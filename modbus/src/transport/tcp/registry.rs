use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(4);

/// Last activity per TCP peer. Used for the connected clients count only;
/// evicting an entry does not close its socket.
#[derive(Debug)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<SocketAddr, Instant>>,
    idle: Duration,
}

impl Default for ClientRegistry {
    fn default() -> Self {
        ClientRegistry::new(IDLE_TIMEOUT)
    }
}

impl ClientRegistry {
    pub fn new(idle: Duration) -> ClientRegistry {
        ClientRegistry {
            clients: Mutex::new(HashMap::new()),
            idle,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SocketAddr, Instant>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn touch(&self, peer: SocketAddr, now: Instant) {
        self.lock().insert(peer, now);
    }

    pub fn remove(&self, peer: &SocketAddr) {
        self.lock().remove(peer);
    }

    /// Marks `peer` active, drops idle entries and returns the remaining count.
    pub fn on_read(&self, peer: SocketAddr, now: Instant) -> usize {
        let mut clients = self.lock();
        clients.insert(peer, now);
        clients.retain(|_, last| now.saturating_duration_since(*last) <= self.idle);
        clients.len()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}
