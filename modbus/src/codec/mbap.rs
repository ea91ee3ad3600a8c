use crate::codec::context::{ReadCtx, WriteCtx};
use crate::codec::error::Error;
use crate::codec::wait;
use crate::data::MAX_PDU_SIZE;

pub(crate) const MBAP_SIZE: usize = 7;

pub(crate) struct Mbap {
    pub id: u16,
    pub proto: u16,
    /// unit id + PDU
    pub len: u16,
    pub slave: u8,
}

pub(crate) fn read_mbap(ctx: &mut ReadCtx) -> Result<Option<Mbap>, Error> {
    let id = wait!(ctx.read_u16_be());
    let proto = wait!(ctx.read_u16_be());
    let len = wait!(ctx.read_u16_be());
    let slave = wait!(ctx.read_u8());
    let mbap = Mbap {
        id,
        proto,
        len,
        slave,
    };

    validate_mbap(&mbap)?;
    Ok(Some(mbap))
}

pub(crate) fn write_mbap(ctx: &mut WriteCtx, id: u16, pdu_len: usize, slave: u8) -> Option<()> {
    ctx.write_u16_be(id)?;
    ctx.write_u16_be(0)?;
    ctx.write_u16_be(pdu_len as u16 + 1)?;
    ctx.write_u8(slave)
}

fn validate_mbap(mbap: &Mbap) -> Result<(), Error> {
    if mbap.proto != 0 {
        Err(Error::InvalidVersion)
    } else if mbap.len < 2 || mbap.len as usize > MAX_PDU_SIZE + 1 {
        Err(Error::InvalidData)
    } else {
        Ok(())
    }
}
