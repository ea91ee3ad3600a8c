use crate::codec::slave::SlaveCodec;
use crate::frame::prelude::*;
use crate::server::events::ServerEvent;
use crate::transport::{event::EventLog, prelude::*};
use std::io::Error;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::{self, Uuid};

const READ_TIMEOUT: Duration = Duration::from_secs(4);

pub struct TcpServer {
    listener: TcpListener,
    settings: Settings,
    shared: Shared,
    request_tx: mpsc::UnboundedSender<Request>,
}

struct Client {
    stream: TcpStream,
    shared: Shared,
    request_tx: mpsc::UnboundedSender<Request>,
    response_tx: mpsc::UnboundedSender<Response>,
    response_rx: mpsc::UnboundedReceiver<Response>,
    address: SocketAddr,
    context: IoContext,
}

impl Client {
    fn spawn(mut self) {
        EventLog::connection(&self.address, "connected");
        let token = self.shared.token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    result = self.run() => {
                        if result.is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    async fn run(&mut self) -> Result<(), Error> {
        let read = tokio::time::timeout(READ_TIMEOUT, self.stream.read_buf(&mut self.context.input));

        tokio::select! {
            result = read => {
                match result {
                    // nothing within the timeout, keep waiting
                    Err(_) => Ok(()),
                    Ok(Err(e)) => {
                        EventLog::error(&self.address, &e);
                        Err(e)
                    },
                    Ok(Ok(0)) => {
                        Err(Error::new(std::io::ErrorKind::UnexpectedEof, "close"))
                    },
                    Ok(Ok(_nbytes)) => {
                        self.on_read();
                        self.on_input();
                        Ok(())
                    },
                }
            },
            response = self.response_rx.recv() => {
                self.on_response(response).await
            }
        }
    }

    fn on_read(&mut self) {
        let count = self.shared.registry.on_read(self.address, Instant::now());
        self.shared
            .notifier
            .notify(ServerEvent::NumberOfConnectedClientsChanged(count));
    }

    /// Decodes every complete frame in the input. Bad input is dropped and the
    /// connection stays open.
    fn on_input(&mut self) {
        EventLog::input(&self.address, &self.context.input);
        loop {
            match self.context.decode() {
                Ok(Some((frame, raw))) => self.on_request(frame, raw),
                Ok(None) => break,
                Err(e) => {
                    EventLog::dropped(&self.address, &e);
                    break;
                }
            }
        }
    }

    fn on_request(&mut self, frame: RequestFrame, raw: Vec<u8>) {
        let request = Request {
            uuid: Uuid::new_v4(),
            kind: self.context.kind(),
            frame,
            raw,
            peer: Some(self.address),
            response_tx: Some(self.response_tx.clone()),
        };

        EventLog::request(&self.address, &request);

        if self.request_tx.send(request).is_err() {
            EventLog::dropped(&self.address, &"request queue is closed");
        }
    }

    async fn on_response(&mut self, response: Option<Response>) -> Result<(), Error> {
        // the channel belongs to this connection, every response is ours
        let Some(response) = response else { return Ok(()); };
        EventLog::response(&self.address, &response);
        self.on_output(response.frame).await
    }

    async fn on_output(&mut self, frame: ResponseFrame) -> Result<(), Error> {
        self.context.encode(frame)?;
        EventLog::output(&self.address, &self.context.output);
        self.stream.write_all(&self.context.output[..]).await
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shared.registry.remove(&self.address);
        EventLog::connection(&self.address, "close");
    }
}

impl TcpServer {
    pub async fn build(settings: Settings, shared: Shared) -> Result<Handler, Error> {
        let listener = TcpListener::bind(settings.address.get()).await?;
        let local_addr = listener.local_addr()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let server = TcpServer {
            listener,
            settings,
            shared,
            request_tx: tx,
        };
        Ok(Handler {
            request_rx: rx,
            local_addr: Some(local_addr),
            task: server.spawn(),
        })
    }

    /// The listener is closed when the returned task finishes.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = self.shared.token.cancelled() => break,
                    accepted = self.listener.accept() => match accepted {
                        Ok((stream, address)) => self.spawn_client(stream, address),
                        // a failed accept does not stop the listener
                        Err(e) => EventLog::error(&self.settings.address, &e),
                    }
                }
            }
        })
    }

    fn is_allowed(&self, address: &SocketAddr) -> bool {
        self.settings
            .allowed_peer
            .map_or(true, |ip| ip == address.ip())
    }

    fn spawn_client(&mut self, stream: TcpStream, address: SocketAddr) {
        if !self.is_allowed(&address) {
            EventLog::dropped(&address, &"peer is not allowed");
            return;
        }

        self.shared.registry.touch(address, Instant::now());
        let (tx, rx) = mpsc::unbounded_channel();
        let context = IoContext::new(SlaveCodec::new_tcp());
        let client = Client {
            stream,
            shared: self.shared.clone(),
            request_tx: self.request_tx.clone(),
            response_tx: tx,
            response_rx: rx,
            address,
            context,
        };
        client.spawn();
    }
}
