use std::net::IpAddr;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 505;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAddress {
    Tcp(String),
    Udp(String),
    /// Port name with line settings, see `PortSettings`
    Serial(String),
}

impl TransportAddress {
    pub fn get(&self) -> &str {
        match self {
            TransportAddress::Tcp(address) => address,
            TransportAddress::Udp(address) => address,
            TransportAddress::Serial(address) => address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub address: TransportAddress,
    /// TCP only. Connections from other hosts are closed on accept.
    pub allowed_peer: Option<IpAddr>,
}

impl Settings {
    pub fn new(address: TransportAddress) -> Settings {
        Settings {
            address,
            allowed_peer: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new(TransportAddress::Tcp(format!("0.0.0.0:{DEFAULT_PORT}")))
    }
}

impl FromStr for TransportAddress {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tp, remain) = s.split_once(':').ok_or("missing transport type")?;
        if remain.is_empty() {
            return Err("missing address");
        }

        match tp {
            "tcp" => Ok(TransportAddress::Tcp(remain.to_owned())),
            "udp" => Ok(TransportAddress::Udp(remain.to_owned())),
            "serial" => Ok(TransportAddress::Serial(remain.to_owned())),
            _ => Err("unknown transport type"),
        }
    }
}

impl FromStr for Settings {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransportAddress::from_str(s).map(Settings::new)
    }
}
