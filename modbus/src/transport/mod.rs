pub mod builder;
pub mod context;
pub mod event;
pub mod rtu;
pub mod settings;
pub mod tcp;
pub mod udp;

use crate::frame::prelude::*;
use crate::server::events::Notifier;
use tcp::registry::ClientRegistry;

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug)]
pub struct Request {
    pub uuid: Uuid,
    pub kind: TransportKind,
    pub frame: RequestFrame,
    /// ADU exactly as received
    pub raw: Vec<u8>,
    /// Sender of a network request
    pub peer: Option<SocketAddr>,
    pub response_tx: Option<mpsc::UnboundedSender<Response>>,
}

#[derive(Debug)]
pub struct Response {
    pub uuid: Uuid,
    pub frame: ResponseFrame,
    pub peer: Option<SocketAddr>,
    response_tx: Option<mpsc::UnboundedSender<Response>>,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "response id:{} slave:{} pdu:{:?}",
            self.uuid, self.frame.slave, self.frame.pdu
        )
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "request id:{} slave:{} pdu:{:?}",
            self.uuid, self.frame.slave, self.frame.pdu
        )
    }
}

impl Response {
    pub fn make(mut request: Request, frame: ResponseFrame) -> Response {
        Response {
            uuid: request.uuid,
            frame,
            peer: request.peer,
            response_tx: request.response_tx.take(),
        }
    }

    /// Returns false if the transport is already gone.
    pub fn send(mut self) -> bool {
        match self.response_tx.take() {
            Some(tx) => tx.send(self).is_ok(),
            None => false,
        }
    }
}

pub struct Handler {
    pub request_rx: mpsc::UnboundedReceiver<Request>,
    /// Bound address for network transports
    pub local_addr: Option<SocketAddr>,
    /// Transport task, ends once the shared token is cancelled
    pub task: JoinHandle<()>,
}

/// State shared by every transport of one server.
#[derive(Clone)]
pub struct Shared {
    pub token: CancellationToken,
    pub registry: Arc<ClientRegistry>,
    pub notifier: Notifier,
}

impl Shared {
    pub fn new(notifier: Notifier) -> Shared {
        Shared {
            token: CancellationToken::new(),
            registry: Arc::new(ClientRegistry::default()),
            notifier,
        }
    }
}

pub mod prelude {
    pub use super::context::IoContext;
    pub use super::settings::{Settings, TransportAddress};
    pub use super::Handler;
    pub use super::Request;
    pub use super::Response;
    pub use super::Shared;
}
