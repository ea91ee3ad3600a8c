use crate::codec::slave::SlaveCodec;
use crate::frame::prelude::*;
use crate::transport::{event::EventLog, prelude::*};
use std::io::Error;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::{self, Uuid};

const MAX_BUFFER_SIZE: usize = 512;
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

pub struct UdpServer {
    socket: UdpSocket,
    context: IoContext,
    shared: Shared,
    request_tx: mpsc::UnboundedSender<Request>,
    response_tx: mpsc::UnboundedSender<Response>,
    response_rx: mpsc::UnboundedReceiver<Response>,
}

impl UdpServer {
    pub async fn build(settings: Settings, shared: Shared) -> Result<Handler, Error> {
        let socket = UdpSocket::bind(settings.address.get()).await?;
        let local_addr = socket.local_addr()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let server = UdpServer {
            socket,
            context: IoContext::new(SlaveCodec::new_udp()),
            shared,
            request_tx: tx,
            response_tx,
            response_rx,
        };

        Ok(Handler {
            request_rx: rx,
            local_addr: Some(local_addr),
            task: server.spawn(),
        })
    }

    pub fn spawn(mut self) -> JoinHandle<()> {
        let token = self.shared.token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = self.run() => {}
                }
            }
        })
    }

    async fn run(&mut self) -> Result<(), Error> {
        self.context.resize_input(MAX_BUFFER_SIZE);

        let read = tokio::time::timeout(
            RECV_TIMEOUT,
            self.socket.recv_from(&mut self.context.input[..MAX_BUFFER_SIZE]),
        );

        tokio::select! {
            result = read => {
                match result {
                    // receive timeout, try again
                    Err(_) => Ok(()),
                    Ok(Ok((0, _))) => Ok(()),
                    Ok(Ok((size, address))) => {
                        self.context.resize_input(size);
                        self.on_input(address);
                        Ok(())
                    }
                    Ok(Err(err)) => {
                        EventLog::error(&"UDP server", &err);
                        Err(err)
                    }
                }
            },

            response = self.response_rx.recv() => {
                self.on_response(response).await
            }
        }
    }

    fn on_input(&mut self, address: SocketAddr) {
        EventLog::input(&address, &self.context.input);
        match self.context.decode() {
            Ok(Some((frame, raw))) => self.on_request(address, frame, raw),
            Ok(None) => EventLog::dropped(&address, &"incomplete datagram"),
            Err(err) => EventLog::dropped(&address, &err),
        }
    }

    fn on_request(&mut self, address: SocketAddr, frame: RequestFrame, raw: Vec<u8>) {
        let request = Request {
            uuid: Uuid::new_v4(),
            kind: self.context.kind(),
            frame,
            raw,
            peer: Some(address),
            response_tx: Some(self.response_tx.clone()),
        };

        EventLog::request(&address, &request);

        if self.request_tx.send(request).is_err() {
            EventLog::dropped(&address, &"request queue is closed");
        }
    }

    async fn on_response(&mut self, response: Option<Response>) -> Result<(), Error> {
        let Some(response) = response else {
            return Ok(());
        };
        let Some(address) = response.peer else {
            EventLog::dropped(&response.uuid, &"response without a peer address");
            return Ok(());
        };

        EventLog::response(&address, &response);
        self.on_output(address, response.frame).await.map(|_| ())
    }

    async fn on_output(
        &mut self,
        address: SocketAddr,
        frame: ResponseFrame,
    ) -> Result<usize, Error> {
        self.context.encode(frame)?;
        EventLog::output(&address, &self.context.output);
        self.socket.send_to(&self.context.output, address).await
    }
}
