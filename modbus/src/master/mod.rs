//! Modbus TCP/UDP master that reads holding registers as floats.

pub mod decode;
pub mod error;

use crate::transport::settings::DEFAULT_PORT;
use decode::{
    check_exception, check_transaction_id, decode_floats, demo_values, read_request, REQUEST_SIZE,
};
pub use decode::FLOATS_PER_READ;
pub use error::Error;
use log::{debug, info};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::sync::watch;

const RESPONSE_BUFFER_SIZE: usize = 256;
const UDP_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_START_ADDRESS: u32 = 65535;
const MAX_QUANTITY: u16 = 125;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    /// Connect and read timeout
    pub timeout: Duration,
    /// Pause between sending a TCP request and reading the response
    pub settle: Duration,
    pub udp: bool,
    /// Return random values without any I/O
    pub demo: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_owned(),
            port: DEFAULT_PORT,
            unit_id: 1,
            timeout: Duration::from_millis(1000),
            settle: Duration::from_millis(100),
            udp: false,
            demo: false,
        }
    }
}

pub struct Client {
    config: ClientConfig,
    transaction_id: u16,
    stream: Option<TcpStream>,
    connected: watch::Sender<bool>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Client {
        let (connected, _) = watch::channel(false);
        Client {
            config,
            transaction_id: 0,
            stream: None,
            connected,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Id used by the last request.
    pub fn transaction_id(&self) -> u16 {
        self.transaction_id
    }

    /// Connection state, updated on every connect and disconnect.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Opens the TCP connection. In UDP mode there is nothing to open.
    pub async fn connect(&mut self) -> Result<(), Error> {
        if !self.config.udp {
            let address = (self.config.host.as_str(), self.config.port);
            let stream = tokio::time::timeout(self.config.timeout, TcpStream::connect(address))
                .await
                .map_err(|_| Error::Connection("connect timeout".to_owned()))??;
            info!("connected to {}:{}", self.config.host, self.config.port);
            self.stream = Some(stream);
        }
        self.connected.send_replace(true);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.stream.take().is_some() {
            info!("disconnected from {}:{}", self.config.host, self.config.port);
        }
        self.connected.send_replace(false);
    }

    /// Reads `quantity` registers from `start` and decodes them as floats.
    /// Always returns `FLOATS_PER_READ` values.
    pub async fn read_holding_registers(&mut self, start: u32, quantity: u16) -> Result<Vec<f32>, Error> {
        if self.config.demo {
            return Ok(demo_values());
        }

        self.transaction_id = self.transaction_id.wrapping_add(1);

        if !self.config.udp && self.stream.is_none() {
            return Err(Error::Connection("not connected".to_owned()));
        }
        if start > MAX_START_ADDRESS || quantity > MAX_QUANTITY {
            return Err(Error::Argument(
                "start address must be in 0-65535 and quantity in 0-125".to_owned(),
            ));
        }

        let frame = read_request(self.transaction_id, self.config.unit_id, start as u16, quantity);
        let request = &frame[..REQUEST_SIZE];
        debug!("request {:?}", request);

        let response = if self.config.udp {
            self.exchange_udp(request).await?
        } else {
            self.exchange_tcp(request).await?
        };
        debug!("response {:?}", response);

        check_transaction_id(&response, self.transaction_id)?;
        check_exception(&response)?;
        Ok(decode_floats(&response))
    }

    async fn exchange_tcp(&mut self, request: &[u8]) -> Result<Vec<u8>, Error> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::Connection("not connected".to_owned()))?;
        stream.write_all(request).await?;
        tokio::time::sleep(self.config.settle).await;

        let mut buffer = vec![0u8; RESPONSE_BUFFER_SIZE];
        let read = tokio::time::timeout(self.config.timeout, stream.read(&mut buffer)).await;
        match read {
            Err(_) => Err(Error::Connection("read timeout".to_owned())),
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(0)) => {
                self.disconnect();
                Err(Error::Connection("connection closed".to_owned()))
            }
            Ok(Ok(_)) => Ok(buffer),
        }
    }

    async fn exchange_udp(&self, request: &[u8]) -> Result<Vec<u8>, Error> {
        let target = lookup_host((self.config.host.as_str(), self.config.port))
            .await?
            .next()
            .ok_or_else(|| Error::Connection(format!("unknown host {}", self.config.host)))?;
        let local = match target {
            SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        socket.send(request).await?;

        let mut buffer = vec![0u8; RESPONSE_BUFFER_SIZE];
        let size = tokio::time::timeout(UDP_TIMEOUT, socket.recv(&mut buffer))
            .await
            .map_err(|_| Error::Connection("receive timeout".to_owned()))??;
        buffer.truncate(size);
        Ok(buffer)
    }
}
