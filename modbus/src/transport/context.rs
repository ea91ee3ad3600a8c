use crate::codec::error::Error as MbError;
use crate::codec::slave::SlaveCodec;
use crate::frame::prelude::*;
use bytes::BytesMut;
use std::io::{Error, ErrorKind};
use tokio_util::codec::Encoder;

pub struct IoContext {
    pub codec: SlaveCodec,
    pub input: BytesMut,
    pub output: BytesMut,
}

impl IoContext {
    pub fn new(codec: SlaveCodec) -> IoContext {
        IoContext {
            codec,
            input: BytesMut::new(),
            output: BytesMut::new(),
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.codec.kind()
    }

    /// Decodes the next frame and returns it with the bytes it was read from.
    /// Undecodable input is discarded by the codec.
    pub fn decode(&mut self) -> Result<Option<(RequestFrame, Vec<u8>)>, Error> {
        let frame = self.codec.decode_raw(&mut self.input).map_err(|err| match err {
            MbError::InvalidCrc => Error::new(ErrorKind::InvalidData, "bad CRC"),
            MbError::Io(err) => err,
            other => Error::new(ErrorKind::InvalidData, other.to_string()),
        })?;

        Ok(frame.map(|(frame, raw)| (frame, raw.to_vec())))
    }

    /// Replaces the output buffer with the encoded frame.
    pub fn encode(&mut self, response: ResponseFrame) -> Result<(), Error> {
        self.output.clear();
        self.codec
            .encode(response, &mut self.output)
            .map_err(|_| Error::new(ErrorKind::InvalidData, "codec error"))
    }

    pub fn reset(&mut self) {
        self.input.clear();
        self.output.clear();
    }

    pub fn resize_input(&mut self, size: usize) {
        self.input.resize(size, 0);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_stream_keeps_tail() {
        let mut context = IoContext::new(SlaveCodec::new_tcp());
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02];
        context.input.extend_from_slice(&frame);
        context.input.extend_from_slice(&frame[..4]);

        let (request, raw) = context.decode().unwrap().unwrap();
        assert_eq!(request.id, 1);
        assert_eq!(request.pdu, RequestPdu::read_holding_registers(0, 2));
        assert_eq!(raw, frame.to_vec());
        assert_eq!(&context.input[..], &frame[..4]);
        assert!(context.decode().unwrap().is_none());
    }

    #[test]
    fn decode_error_clears_input() {
        let mut context = IoContext::new(SlaveCodec::new_rtu());
        context
            .input
            .extend_from_slice(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00]);
        assert!(context.decode().is_err());
        assert!(context.input.is_empty());
    }

    #[test]
    fn encode_replaces_output() {
        let mut context = IoContext::new(SlaveCodec::new_rtu());
        let frame = ResponseFrame::new(1, ResponsePdu::exception(0x3, Code::IllegalDataAddress));
        context.encode(frame.clone()).unwrap();
        context.encode(frame).unwrap();
        assert_eq!(&context.output[..], &[0x01, 0x83, 0x02, 0xC0, 0xF1]);
    }
}
