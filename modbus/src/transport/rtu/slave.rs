use super::port::{self, PortSettings};
use super::silence::FrameAccumulator;
use crate::codec::slave::SlaveCodec;
use crate::frame::prelude::*;
use crate::transport::{event::EventLog, prelude::*};
use bytes::BytesMut;
use std::io::{Error, ErrorKind};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::SerialStream;
use uuid::{self, Uuid};

const READ_CHUNK_SIZE: usize = 256;
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

pub struct RtuSlaveChannel<S> {
    stream: S,
    context: IoContext,
    accumulator: FrameAccumulator,
    chunk: BytesMut,
    shared: Shared,
    request_tx: mpsc::UnboundedSender<Request>,
    response_tx: mpsc::UnboundedSender<Response>,
    response_rx: mpsc::UnboundedReceiver<Response>,

    name: String,
}

impl RtuSlaveChannel<SerialStream> {
    pub async fn build(settings: Settings, shared: Shared) -> Result<Handler, Error> {
        let address = settings.address.get();
        let parameters = PortSettings::from_str(address)
            .map_err(|e| Error::new(ErrorKind::InvalidInput, format!("invalid port settings: {e}")))?;

        let port = port::build(&parameters)?;
        let (channel, request_rx) =
            RtuSlaveChannel::new(port, parameters.name, parameters.speed, shared);
        Ok(Handler {
            request_rx,
            local_addr: None,
            task: channel.spawn(),
        })
    }
}

impl<S> RtuSlaveChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an open port. `baud` sets the silence that separates frames.
    pub fn new(
        stream: S,
        name: String,
        baud: u32,
        shared: Shared,
    ) -> (Self, mpsc::UnboundedReceiver<Request>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let channel = RtuSlaveChannel {
            stream,
            context: IoContext::new(SlaveCodec::new_rtu()),
            accumulator: FrameAccumulator::new(baud),
            chunk: BytesMut::with_capacity(READ_CHUNK_SIZE),
            shared,
            request_tx: tx,
            response_tx,
            response_rx,
            name,
        };

        (channel, rx)
    }

    /// Runs until the token is cancelled or the port reports end of file.
    /// Other I/O errors are retried after a pause.
    pub fn spawn(mut self) -> JoinHandle<()> {
        let token = self.shared.token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    result = self.run() => match result {
                        Ok(()) => {}
                        Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                            EventLog::error(&self.name, &err);
                            break;
                        }
                        Err(err) => {
                            self.accumulator.reset();
                            self.context.reset();
                            EventLog::error(&self.name, &err);
                            tokio::select! {
                                _ = token.cancelled() => break,
                                _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                            }
                        }
                    }
                }
            }
            EventLog::connection(&self.name, "close");
        })
    }

    async fn run(&mut self) -> Result<(), Error> {
        self.chunk.clear();
        let read = self.stream.read_buf(&mut self.chunk);

        tokio::select! {
            input = read => {
                match input {
                    Ok(0) => Err(Error::new(ErrorKind::UnexpectedEof, "port closed")),
                    Ok(_nbytes) => {
                        self.on_input(Instant::now());
                        Ok(())
                    },
                    Err(e) => Err(e),
                }
            },
            response = self.response_rx.recv() => {
                self.on_response(response).await
            }
        }
    }

    fn on_input(&mut self, now: Instant) {
        EventLog::input(&self.name, &self.chunk);
        let Some(frame) = self.accumulator.push(now, &self.chunk) else {
            return;
        };

        self.context.input.clear();
        self.context.input.extend_from_slice(&frame);
        match self.context.decode() {
            Ok(Some((frame, raw))) => self.on_request(frame, raw),
            Ok(None) => {}
            Err(err) => EventLog::dropped(&self.name, &err),
        }
    }

    fn on_request(&mut self, frame: RequestFrame, raw: Vec<u8>) {
        let request = Request {
            uuid: Uuid::new_v4(),
            kind: self.context.kind(),
            frame,
            raw,
            peer: None,
            response_tx: Some(self.response_tx.clone()),
        };

        EventLog::request(&self.name, &request);
        if self.request_tx.send(request).is_err() {
            EventLog::dropped(&self.name, &"request queue is closed");
        }
    }

    async fn on_response(&mut self, response: Option<Response>) -> Result<(), Error> {
        if let Some(response) = response {
            EventLog::response(&self.name, &response);
            self.context.encode(response.frame)?;
            self.on_output().await?;
        }
        Ok(())
    }

    async fn on_output(&mut self) -> Result<(), Error> {
        EventLog::output(&self.name, &self.context.output);
        self.stream.write_all(&self.context.output).await
    }
}
