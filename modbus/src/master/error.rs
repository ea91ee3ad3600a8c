use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("function code is not supported by the slave")]
    FunctionCodeNotSupported,

    #[error("starting address is invalid")]
    StartingAddressInvalid,

    #[error("quantity is invalid")]
    QuantityInvalid,

    #[error("modbus error: {0}")]
    Modbus(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Connection(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_io() {
        let err = Error::from(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(matches!(err, Error::Connection(ref msg) if msg == "reset"));
        assert_eq!(err.to_string(), "connection error: reset");
    }
}
