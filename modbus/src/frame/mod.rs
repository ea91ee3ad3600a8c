pub mod exception;
pub mod pdu;

use pdu::{RequestPdu, ResponsePdu};

/// Framing the ADU travelled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    Udp,
    Rtu,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestFrame {
    /// transaction id (only MBAP)
    pub id: u16,
    pub slave: u8,
    pub pdu: RequestPdu,
}

impl RequestFrame {
    pub fn new(slave: u8, pdu: RequestPdu) -> RequestFrame {
        RequestFrame { id: 0, slave, pdu }
    }

    pub fn from_parts(id: u16, slave: u8, pdu: RequestPdu) -> RequestFrame {
        RequestFrame { id, slave, pdu }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFrame {
    pub id: u16,
    pub slave: u8,
    pub pdu: ResponsePdu,
}

impl ResponseFrame {
    pub fn new(slave: u8, pdu: ResponsePdu) -> ResponseFrame {
        ResponseFrame { id: 0, slave, pdu }
    }

    pub fn from_parts(id: u16, slave: u8, pdu: ResponsePdu) -> ResponseFrame {
        ResponseFrame { id, slave, pdu }
    }
}

pub mod prelude {
    pub use super::exception::Code;
    pub use super::pdu::{RequestPdu, ResponsePdu, SUPPORTED_FUNCTIONS};
    pub use super::{RequestFrame, ResponseFrame, TransportKind};
}
