use crate::codec::context::{ReadCtx, WriteCtx};
use crate::codec::error::Error;
use crate::codec::wait;
use crate::data::prelude::*;
use crate::frame::prelude::*;

fn registers_from_be(raw: &[u8]) -> Data {
    let words: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    Data::registers(&words)
}

/// Reads a request PDU. `Ok(None)` means the input ended before the PDU did.
pub(crate) fn read_pdu(ctx: &mut ReadCtx) -> Result<Option<RequestPdu>, Error> {
    let func = wait!(ctx.read_u8());
    match func {
        0x1..=0x4 => {
            let address = wait!(ctx.read_u16_be());
            let nobjs = wait!(ctx.read_u16_be());
            let pdu = match func {
                0x1 => RequestPdu::ReadCoils { address, nobjs },
                0x2 => RequestPdu::ReadDiscreteInputs { address, nobjs },
                0x3 => RequestPdu::ReadHoldingRegisters { address, nobjs },
                _ => RequestPdu::ReadInputRegisters { address, nobjs },
            };
            Ok(Some(pdu))
        }
        0x5 => {
            let address = wait!(ctx.read_u16_be());
            let value = wait!(ctx.read_u16_be());
            Ok(Some(RequestPdu::WriteSingleCoil { address, value }))
        }
        0x6 => {
            let address = wait!(ctx.read_u16_be());
            let value = wait!(ctx.read_u16_be());
            Ok(Some(RequestPdu::WriteSingleRegister { address, value }))
        }
        0xF => {
            let address = wait!(ctx.read_u16_be());
            let nobjs = wait!(ctx.read_u16_be());
            let nbytes = wait!(ctx.read_u8());
            let raw = wait!(ctx.read_bytes(nbytes as usize));
            Ok(Some(RequestPdu::WriteMultipleCoils {
                address,
                nobjs,
                nbytes,
                data: Data::raw(raw),
            }))
        }
        0x10 => {
            let address = wait!(ctx.read_u16_be());
            let nobjs = wait!(ctx.read_u16_be());
            let nbytes = wait!(ctx.read_u8());
            let raw = wait!(ctx.read_bytes(nbytes as usize));
            Ok(Some(RequestPdu::WriteMultipleRegisters {
                address,
                nobjs,
                nbytes,
                data: registers_from_be(raw),
            }))
        }
        0x17 => {
            let read_address = wait!(ctx.read_u16_be());
            let read_nobjs = wait!(ctx.read_u16_be());
            let write_address = wait!(ctx.read_u16_be());
            let write_nobjs = wait!(ctx.read_u16_be());
            let nbytes = wait!(ctx.read_u8());
            let raw = wait!(ctx.read_bytes(nbytes as usize));
            Ok(Some(RequestPdu::ReadWriteMultipleRegisters {
                read_address,
                read_nobjs,
                write_address,
                write_nobjs,
                nbytes,
                data: registers_from_be(raw),
            }))
        }
        _ => {
            let remain = ctx.remaining();
            let raw = wait!(ctx.read_bytes(remain));
            Ok(Some(RequestPdu::raw(func, Data::raw(raw))))
        }
    }
}

/// Reads a PDU that has to fill `body` completely.
pub(crate) fn read_pdu_exact(body: &[u8]) -> Result<RequestPdu, Error> {
    let mut ctx = ReadCtx::new(body);
    let pdu = read_pdu(&mut ctx)?.ok_or(Error::InvalidData)?;
    if ctx.remaining() > 0 {
        return Err(Error::InvalidData);
    }
    Ok(pdu)
}

fn write_objects(ctx: &mut WriteCtx, func: u8, data: &Data, registers: bool) -> Option<()> {
    ctx.is_enough(data.len() + 2)?;
    ctx.write_u8(func)?;
    ctx.write_u8(data.len() as u8)?;
    if registers {
        ctx.write_data_u16_be(data.get())
    } else {
        ctx.write_bytes(data.get())
    }
}

fn write_echo(ctx: &mut WriteCtx, func: u8, address: u16, value: u16) -> Option<()> {
    ctx.is_enough(5)?;
    ctx.write_u8(func)?;
    ctx.write_u16_be(address)?;
    ctx.write_u16_be(value)
}

pub(crate) fn write_pdu(ctx: &mut WriteCtx, src: &ResponsePdu) -> Result<(), Error> {
    let res = match src {
        ResponsePdu::ReadCoils { data, .. } => write_objects(ctx, 0x1, data, false),
        ResponsePdu::ReadDiscreteInputs { data, .. } => write_objects(ctx, 0x2, data, false),
        ResponsePdu::ReadHoldingRegisters { data, .. } => write_objects(ctx, 0x3, data, true),
        ResponsePdu::ReadInputRegisters { data, .. } => write_objects(ctx, 0x4, data, true),
        ResponsePdu::WriteSingleCoil { address, value } => write_echo(ctx, 0x5, *address, *value),
        ResponsePdu::WriteSingleRegister { address, value } => {
            write_echo(ctx, 0x6, *address, *value)
        }
        ResponsePdu::WriteMultipleCoils { address, nobjs } => {
            write_echo(ctx, 0xF, *address, *nobjs)
        }
        ResponsePdu::WriteMultipleRegisters { address, nobjs } => {
            write_echo(ctx, 0x10, *address, *nobjs)
        }
        ResponsePdu::ReadWriteMultipleRegisters { data, .. } => {
            write_objects(ctx, 0x17, data, true)
        }
        ResponsePdu::Exception { function, code } => ctx
            .is_enough(2)
            .and_then(|_| ctx.write_u8(*function | 0x80))
            .and_then(|_| ctx.write_u8(u8::from(*code))),
    };
    res.ok_or(Error::BufferToSmall)
}
