use crate::transport::{
    rtu::slave::RtuSlaveChannel,
    settings::{Settings, TransportAddress},
    tcp::server::TcpServer,
    udp::server::UdpServer,
    Handler, Shared,
};

use log::info;
use std::io::Error;

/// Starts the transport described by `settings`. It stops once `shared.token`
/// is cancelled.
pub async fn build(settings: Settings, shared: Shared) -> Result<Handler, Error> {
    match &settings.address {
        TransportAddress::Tcp(address) => {
            info!("start tcp server {}", address);
            TcpServer::build(settings, shared).await
        }
        TransportAddress::Udp(address) => {
            info!("start udp server {}", address);
            UdpServer::build(settings, shared).await
        }
        TransportAddress::Serial(address) => {
            info!("start rtu slave {}", address);
            RtuSlaveChannel::build(settings, shared).await
        }
    }
}
