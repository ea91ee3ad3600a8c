//! Slave runtime: transports feed one request queue, a single task drains it
//! through the dispatcher and routes the responses back.

pub mod config;
pub mod dispatcher;
pub mod events;
pub mod exchange;

use crate::codec::slave::SlaveCodec;
use crate::frame::prelude::*;
use crate::store::Store;
use crate::transport::{builder, prelude::*};
use bytes::BytesMut;
use config::ServerConfig;
use dispatcher::Dispatcher;
use events::{Notifier, ServerEvent};
use exchange::{Exchange, ExchangeLog};
use futures::stream::{self, StreamExt};
use log::{debug, info};
use std::io::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::codec::Encoder;
use tokio_util::sync::CancellationToken;

pub struct Server {
    config: ServerConfig,
    store: Arc<Store>,
    shared: Shared,
    log: Arc<ExchangeLog>,
}

/// Running server. Dropping it leaves the server running; call `stop`.
pub struct ServerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
    transports: Vec<JoinHandle<()>>,
    local_addrs: Vec<SocketAddr>,
}

impl ServerHandle {
    /// Bound addresses of the network transports, in start order.
    pub fn local_addrs(&self) -> &[SocketAddr] {
        &self.local_addrs
    }

    /// Closes every transport. The request in hand is answered first.
    /// Listening sockets are closed when this returns.
    pub async fn stop(self) {
        self.token.cancel();
        let _ = self.task.await;
        futures::future::join_all(self.transports).await;
    }
}

impl Server {
    pub fn new(config: ServerConfig) -> Server {
        Server::with_store(config, Arc::new(Store::new()))
    }

    pub fn with_store(config: ServerConfig, store: Arc<Store>) -> Server {
        Server {
            config,
            store,
            shared: Shared::new(Notifier::new()),
            log: Arc::new(ExchangeLog::default()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.shared.notifier.subscribe()
    }

    /// Last exchanges, newest first.
    pub fn log(&self) -> Vec<Exchange> {
        self.log.snapshot()
    }

    pub fn connected_clients(&self) -> usize {
        self.shared.registry.count()
    }

    /// Starts a transport per entry of `settings` and the dispatch task.
    pub async fn start(&self, settings: &[Settings]) -> Result<ServerHandle, Error> {
        let shared = Shared {
            token: self.shared.token.child_token(),
            ..self.shared.clone()
        };

        let mut local_addrs = Vec::new();
        let mut transports = Vec::new();
        let mut streams = Vec::new();
        for item in settings {
            let handler = match builder::build(item.clone(), shared.clone()).await {
                Ok(handler) => handler,
                Err(e) => {
                    shared.token.cancel();
                    return Err(e);
                }
            };
            local_addrs.extend(handler.local_addr);
            transports.push(handler.task);
            streams.push(UnboundedReceiverStream::new(handler.request_rx).boxed());
        }

        let mut requests = stream::select_all(streams);
        let dispatcher = Dispatcher::new(
            self.config,
            self.store.clone(),
            shared.notifier.clone(),
        );
        let log = self.log.clone();
        let notifier = shared.notifier.clone();
        let token = shared.token.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    request = requests.next() => match request {
                        Some(request) => on_request(&dispatcher, &log, &notifier, request),
                        None => break,
                    }
                }
            }
            info!("server stopped");
        });

        Ok(ServerHandle {
            token: shared.token,
            task,
            transports,
            local_addrs,
        })
    }
}

fn encode_response(kind: TransportKind, frame: &ResponseFrame) -> Option<Vec<u8>> {
    let mut buffer = BytesMut::new();
    SlaveCodec::for_kind(kind)
        .encode(frame.clone(), &mut buffer)
        .ok()
        .map(|_| buffer.to_vec())
}

fn on_request(dispatcher: &Dispatcher, log: &ExchangeLog, notifier: &Notifier, request: Request) {
    let response = dispatcher.process(&request.frame);

    let exchange = Exchange {
        timestamp: SystemTime::now(),
        kind: request.kind,
        slave: request.frame.slave,
        function: request.frame.pdu.func(),
        request: request.raw.clone(),
        response: response
            .as_ref()
            .and_then(|frame| encode_response(request.kind, frame)),
        exception: response.as_ref().and_then(|frame| frame.pdu.exception_code()),
    };
    log.push(exchange);
    notifier.notify(ServerEvent::LogDataChanged);

    match response {
        Some(frame) => {
            if !Response::make(request, frame).send() {
                debug!("transport closed before the response");
            }
        }
        None => debug!("no response for {}", request),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn request(kind: TransportKind, frame: RequestFrame) -> (Request, mpsc::UnboundedReceiver<Response>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let request = Request {
            uuid: Uuid::new_v4(),
            kind,
            frame,
            raw: vec![0xAA],
            peer: None,
            response_tx: Some(tx),
        };
        (request, rx)
    }

    #[test]
    fn request_is_logged() {
        let notifier = Notifier::new();
        let mut events = notifier.subscribe();
        let store = Arc::new(Store::new());
        let dispatcher = Dispatcher::new(ServerConfig::default(), store, notifier.clone());
        let log = ExchangeLog::default();

        let frame = RequestFrame::from_parts(1, 1, RequestPdu::read_holding_registers(0, 0));
        let (req, mut rx) = request(TransportKind::Rtu, frame);
        on_request(&dispatcher, &log, &notifier, req);

        let response = rx.try_recv().unwrap();
        assert_eq!(response.frame.pdu.exception_code(), Some(Code::IllegalDataValue));
        assert_eq!(events.try_recv().unwrap(), ServerEvent::LogDataChanged);

        let exchange = &log.snapshot()[0];
        assert_eq!(exchange.kind, TransportKind::Rtu);
        assert_eq!(exchange.function, 0x3);
        assert_eq!(exchange.request, vec![0xAA]);
        assert_eq!(exchange.response, Some(vec![0x01, 0x83, 0x03, 0x01, 0x31]));
        assert_eq!(exchange.exception, Some(Code::IllegalDataValue));
    }

    #[test]
    fn dropped_request_is_logged() {
        let notifier = Notifier::new();
        let dispatcher = Dispatcher::new(
            ServerConfig::default(),
            Arc::new(Store::new()),
            notifier.clone(),
        );
        let log = ExchangeLog::default();

        let frame = RequestFrame::from_parts(1, 9, RequestPdu::read_coils(0, 1));
        let (req, mut rx) = request(TransportKind::Tcp, frame);
        on_request(&dispatcher, &log, &notifier, req);

        assert!(rx.try_recv().is_err());
        let exchange = &log.snapshot()[0];
        assert_eq!(exchange.slave, 9);
        assert!(exchange.response.is_none());
        assert!(exchange.exception.is_none());
    }

    #[tokio::test]
    async fn tcp_round_trip() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let server = Server::new(ServerConfig::default());
        server.store().set_holding_float(0, 3.14);
        let handle = server
            .start(&[Settings::new(TransportAddress::Tcp("127.0.0.1:0".to_owned()))])
            .await
            .unwrap();
        let address = handle.local_addrs()[0];

        let mut stream = tokio::net::TcpStream::connect(address).await.unwrap();
        let request = [0x00, 0x07, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02];
        stream.write_all(&request).await.unwrap();

        let mut response = [0u8; 13];
        stream.read_exact(&mut response).await.unwrap();
        assert_eq!(
            response,
            [0x00, 0x07, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04, 0xF5, 0xC3, 0x40, 0x48]
        );
        assert_eq!(server.connected_clients(), 1);
        assert_eq!(server.log().len(), 1);

        handle.stop().await;
    }

    fn write_register_frame(id: u16, address: u16, value: u16) -> Vec<u8> {
        let mut frame = vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06];
        frame[..2].copy_from_slice(&id.to_be_bytes());
        frame.extend_from_slice(&address.to_be_bytes());
        frame.extend_from_slice(&value.to_be_bytes());
        frame
    }

    #[tokio::test]
    async fn pipelined_requests_are_all_answered() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let server = Server::new(ServerConfig::default());
        let handle = server
            .start(&[Settings::new(TransportAddress::Tcp("127.0.0.1:0".to_owned()))])
            .await
            .unwrap();
        let mut stream = tokio::net::TcpStream::connect(handle.local_addrs()[0])
            .await
            .unwrap();

        let frames: Vec<Vec<u8>> = (0..40u16)
            .map(|id| write_register_frame(id, id, 100 + id))
            .collect();
        stream.write_all(&frames.concat()).await.unwrap();

        let mut response = vec![0u8; 12 * frames.len()];
        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            stream.read_exact(&mut response),
        )
        .await
        .unwrap()
        .unwrap();

        for (id, (frame, answer)) in frames.iter().zip(response.chunks(12)).enumerate() {
            assert_eq!(frame.as_slice(), answer);
            let slot = id + 1;
            assert_eq!(
                server.store().get(crate::store::BankKind::HoldingRegisters, slot),
                100 + id as u16
            );
        }

        handle.stop().await;
    }

    #[tokio::test]
    async fn udp_requests_are_all_answered() {
        let server = Server::new(ServerConfig::default());
        let handle = server
            .start(&[Settings::new(TransportAddress::Udp("127.0.0.1:0".to_owned()))])
            .await
            .unwrap();
        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.connect(handle.local_addrs()[0]).await.unwrap();

        for id in 0..40u16 {
            socket.send(&write_register_frame(id, id, id)).await.unwrap();
        }

        let mut answered = Vec::new();
        let mut buffer = [0u8; 64];
        while answered.len() < 40 {
            let size = tokio::time::timeout(
                std::time::Duration::from_secs(2),
                socket.recv(&mut buffer),
            )
            .await
            .unwrap()
            .unwrap();
            assert_eq!(size, 12);
            answered.push(u16::from_be_bytes([buffer[0], buffer[1]]));
        }
        answered.sort_unstable();
        assert_eq!(answered, (0..40u16).collect::<Vec<u16>>());

        handle.stop().await;
    }

    #[tokio::test]
    async fn stop_closes_listener() {
        let server = Server::new(ServerConfig::default());
        let handle = server
            .start(&[Settings::new(TransportAddress::Tcp("127.0.0.1:0".to_owned()))])
            .await
            .unwrap();
        let address = handle.local_addrs()[0];
        assert!(tokio::net::TcpStream::connect(address).await.is_ok());

        handle.stop().await;
        assert!(tokio::net::TcpStream::connect(address).await.is_err());
    }

    #[tokio::test]
    async fn bad_frame_keeps_connection() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let server = Server::new(ServerConfig::default());
        let handle = server
            .start(&[Settings::new(TransportAddress::Tcp("127.0.0.1:0".to_owned()))])
            .await
            .unwrap();
        let mut stream = tokio::net::TcpStream::connect(handle.local_addrs()[0])
            .await
            .unwrap();

        // protocol id 1 is rejected by the codec
        stream
            .write_all(&[0x00, 0x01, 0x00, 0x01, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x01])
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        stream
            .write_all(&[0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06, 0x00, 0x00, 0x00, 0x2A])
            .await
            .unwrap();
        let mut response = [0u8; 12];
        stream.read_exact(&mut response).await.unwrap();
        assert_eq!(
            response,
            [0x00, 0x02, 0x00, 0x00, 0x00, 0x06, 0x01, 0x06, 0x00, 0x00, 0x00, 0x2A]
        );
        assert_eq!(server.store().get(crate::store::BankKind::HoldingRegisters, 1), 42);

        handle.stop().await;
    }
}
