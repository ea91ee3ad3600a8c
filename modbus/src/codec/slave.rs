use crate::codec::context::{ReadCtx, WriteCtx};
use crate::codec::crc::{crc_trailer, detect_valid_frame, MAX_RTU_SLAVE, MIN_RTU_FRAME};
use crate::codec::error::Error;
use crate::codec::mbap::{read_mbap, write_mbap, MBAP_SIZE};
use crate::codec::pdu::{read_pdu_exact, write_pdu};
use crate::codec::wait;

use crate::frame::prelude::*;
use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

fn read_rtu_frame(ctx: &mut ReadCtx) -> Result<Option<RequestFrame>, Error> {
    let len = ctx.remaining();
    if len < MIN_RTU_FRAME {
        return Ok(None);
    }

    let frame = wait!(ctx.read_bytes(len));
    if !(1..=MAX_RTU_SLAVE).contains(&frame[0]) {
        return Err(Error::InvalidSlave);
    }
    if !detect_valid_frame(frame) {
        return Err(Error::InvalidCrc);
    }

    let pdu = read_pdu_exact(&frame[1..len - 2])?;
    Ok(Some(RequestFrame::new(frame[0], pdu)))
}

fn write_rtu_frame(ctx: &mut WriteCtx, frame: &ResponseFrame) -> Result<(), Error> {
    ctx.write_u8(frame.slave).ok_or(Error::BufferToSmall)?;
    write_pdu(ctx, &frame.pdu)?;
    let end = ctx.processed();
    let crc = crc_trailer(&ctx.buffer()[..end]);
    ctx.write_bytes(&crc).ok_or(Error::BufferToSmall)
}

fn read_net_frame(ctx: &mut ReadCtx) -> Result<Option<RequestFrame>, Error> {
    let header = wait!(read_mbap(ctx)?);
    let body = wait!(ctx.read_bytes(header.len as usize - 1));
    let pdu = read_pdu_exact(body)?;
    Ok(Some(RequestFrame {
        id: header.id,
        slave: header.slave,
        pdu,
    }))
}

fn write_net_frame(ctx: &mut WriteCtx, frame: &ResponseFrame) -> Result<(), Error> {
    write_mbap(ctx, frame.id, frame.pdu.len(), frame.slave).ok_or(Error::BufferToSmall)?;
    write_pdu(ctx, &frame.pdu)
}

#[derive(Debug, PartialEq, Eq)]
pub enum CodecMode {
    Rtu,
    Net,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CodecFlowType {
    Packet,
    Stream,
}

impl CodecFlowType {
    fn is_packet(&self) -> bool {
        matches!(self, CodecFlowType::Packet)
    }
}

/// Slave side codec. Decodes requests and encodes responses.
///
/// RTU input is always handled as a packet: the caller hands over one
/// complete frame (see `transport::rtu::silence`). MBAP input can be a
/// stream (TCP) or a datagram (UDP).
pub struct SlaveCodec {
    mode: CodecMode,
    data: CodecFlowType,
}

impl SlaveCodec {
    pub fn new_rtu() -> SlaveCodec {
        SlaveCodec {
            mode: CodecMode::Rtu,
            data: CodecFlowType::Packet,
        }
    }

    pub fn new_tcp() -> SlaveCodec {
        SlaveCodec {
            mode: CodecMode::Net,
            data: CodecFlowType::Stream,
        }
    }

    pub fn new_udp() -> SlaveCodec {
        SlaveCodec {
            mode: CodecMode::Net,
            data: CodecFlowType::Packet,
        }
    }

    pub fn for_kind(kind: TransportKind) -> SlaveCodec {
        match kind {
            TransportKind::Tcp => SlaveCodec::new_tcp(),
            TransportKind::Udp => SlaveCodec::new_udp(),
            TransportKind::Rtu => SlaveCodec::new_rtu(),
        }
    }

    pub fn kind(&self) -> TransportKind {
        match (&self.mode, &self.data) {
            (CodecMode::Rtu, _) => TransportKind::Rtu,
            (CodecMode::Net, CodecFlowType::Stream) => TransportKind::Tcp,
            (CodecMode::Net, CodecFlowType::Packet) => TransportKind::Udp,
        }
    }

    /// Same as `Decoder::decode`, but also hands back the bytes the frame
    /// was read from.
    pub fn decode_raw(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<(RequestFrame, BytesMut)>, Error> {
        let mut ctx = ReadCtx::new(src);
        let res = match self.mode {
            CodecMode::Rtu => read_rtu_frame(&mut ctx),
            CodecMode::Net => read_net_frame(&mut ctx),
        };
        let processed = ctx.processed();

        match res {
            Ok(Some(frame)) => {
                let raw = src.split_to(processed);
                if self.data.is_packet() {
                    src.clear();
                }
                Ok(Some((frame, raw)))
            }
            // an error or an incomplete datagram discards the input
            res => {
                if res.is_err() || self.data.is_packet() {
                    src.clear();
                }
                res.map(|_| None)
            }
        }
    }
}

impl Decoder for SlaveCodec {
    type Item = RequestFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decode_raw(src)
            .map(|frame| frame.map(|(frame, _)| frame))
    }
}

impl Encoder<ResponseFrame> for SlaveCodec {
    type Error = Error;

    fn encode(&mut self, frame: ResponseFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let start = dst.len();
        match self.mode {
            CodecMode::Rtu => {
                dst.resize(start + frame.pdu.len() + 3, 0);
                write_rtu_frame(&mut WriteCtx::new(&mut dst[start..]), &frame)
            }
            CodecMode::Net => {
                dst.resize(start + frame.pdu.len() + MBAP_SIZE, 0);
                write_net_frame(&mut WriteCtx::new(&mut dst[start..]), &frame)
            }
        }
    }
}
