use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid data")]
    InvalidData,
    #[error("invalid protocol id")]
    InvalidVersion,
    #[error("bad CRC")]
    InvalidCrc,
    #[error("slave id out of range")]
    InvalidSlave,
    #[error("buffer is too small")]
    BufferToSmall,
    #[error("io: {0}")]
    Io(io::Error),
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::InvalidData => Error::InvalidData,
            io::ErrorKind::UnexpectedEof => Error::BufferToSmall,
            _ => Error::Io(error),
        }
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn from_io_error() {
        let err = io::Error::new(io::ErrorKind::InvalidData, "");
        assert!(matches!(Error::from(err), Error::InvalidData));

        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "");
        assert!(matches!(Error::from(err), Error::BufferToSmall));

        let err = io::Error::new(io::ErrorKind::Other, "");
        assert!(matches!(Error::from(err), Error::Io(_)));
    }

    #[test]
    fn to_io_error() {
        let err = io::Error::from(Error::InvalidCrc);
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(err.to_string(), "bad CRC");
    }
}
