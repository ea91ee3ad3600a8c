use std::convert::{From, TryFrom};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Code {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    SlaveDeviceFailure = 0x04,
}

impl From<Code> for u8 {
    fn from(value: Code) -> u8 {
        value as u8
    }
}

impl TryFrom<u8> for Code {
    type Error = u8;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Code::IllegalFunction),
            0x02 => Ok(Code::IllegalDataAddress),
            0x03 => Ok(Code::IllegalDataValue),
            0x04 => Ok(Code::SlaveDeviceFailure),
            other => Err(other),
        }
    }
}
