use crate::data::prelude::*;
use crate::frame::prelude::*;
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

pub const EXCHANGE_LOG_SIZE: usize = 50;

/// One processed request and what was sent back.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub timestamp: SystemTime,
    pub kind: TransportKind,
    pub slave: u8,
    pub function: u8,
    pub request: Vec<u8>,
    pub response: Option<Vec<u8>>,
    pub exception: Option<Code>,
}

#[derive(Debug)]
pub struct ExchangeLog {
    queue: Mutex<FixedQueue<Exchange>>,
}

impl Default for ExchangeLog {
    fn default() -> Self {
        ExchangeLog::new(EXCHANGE_LOG_SIZE)
    }
}

impl ExchangeLog {
    pub fn new(limit: usize) -> ExchangeLog {
        ExchangeLog {
            queue: Mutex::new(FixedQueue::new(limit)),
        }
    }

    pub fn push(&self, exchange: Exchange) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_replace(exchange);
    }

    /// Newest first.
    pub fn snapshot(&self) -> Vec<Exchange> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
